pub mod error_decoder;
pub mod extraction_decoder;
pub mod qmetrics_decoder;
pub mod run_info_parser;
pub mod tile_decoder;

pub mod config;
pub mod error;
pub mod platform;
pub mod run_folders;

pub mod interop_run;
pub mod metrics_source;

pub mod completion;
pub mod histogram;
pub mod number_format;
pub mod run_parameters;
pub mod run_status;

pub mod aggregator;
pub mod report;
