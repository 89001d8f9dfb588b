//! The seam between the status logic and the metrics on disk. The state machine
//! only ever talks to a `MetricsSource`; `InteropSource` implements it over the
//! InterOp binaries an Illumina instrument writes into its run folder.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::StatusError;
use crate::extraction_decoder::{extraction_decoder, max_cycle};
use crate::histogram::Histogram;
use crate::interop_run::{qscore_histogram, read_interop, InteropRun, EXTRACTION_FILE, QMETRICS_FILE, RUN_INFO_FILE};
use crate::qmetrics_decoder::qmetrics_decoder;
use crate::run_info_parser::{parse_run_info, RunInfo};

/// Run metadata needed for the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    pub paired_end: bool,
    pub total_cycles: u32,
    pub inst_name: String,
    pub run_name: String,
    pub date: String,
    pub flowcell_id: String,
}

impl From<&RunInfo> for RunMetadata {
    fn from(run_info: &RunInfo) -> RunMetadata {
        RunMetadata {
            paired_end: run_info.is_paired_end(),
            total_cycles: run_info.total_cycles(),
            inst_name: run_info.instrument.clone(),
            run_name: run_info.id.clone(),
            date: run_info.display_date(),
            flowcell_id: run_info.flowcell.clone(),
        }
    }
}

/// Statistics of one read. Values that cannot be computed yet are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSummary {
    pub number: u32,
    pub first_cycle: u32,
    pub last_cycle: u32,
    pub total_cycles: u32,
    pub is_index: bool,
    pub yield_g: f64,
    pub percent_gt_q30: f64,
    pub percent_aligned: f64,
    pub error_rate: f64,
}

/// Means over the tiles of one lane
#[derive(Debug, Clone, PartialEq)]
pub struct LaneSummary {
    pub lane: u16,
    pub density: f64,
    pub cluster_count: f64,
    pub cluster_count_pf: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalSummary {
    pub yield_g: f64,
    pub percent_gt_q30: f64,
    pub percent_aligned: f64,
    pub error_rate: f64,
}

impl Default for TotalSummary {
    fn default() -> Self {
        TotalSummary {
            yield_g: 0.0,
            percent_gt_q30: f64::NAN,
            percent_aligned: f64::NAN,
            error_rate: f64::NAN,
        }
    }
}

/// What the instrument's viewer would show in its summary tab. Empty (no reads)
/// while the run initializes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reads: Vec<ReadSummary>,
    pub lanes: Vec<LaneSummary>,
    pub total: TotalSummary,
}

impl RunSummary {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    fn lane_mean<F: Fn(&LaneSummary) -> f64>(&self, value: F) -> f64 {
        if self.lanes.is_empty() {
            return f64::NAN;
        }
        self.lanes.iter().map(value).sum::<f64>() / self.lanes.len() as f64
    }

    /// Mean cluster density over lanes, clusters per mm²
    pub fn cluster_density(&self) -> f64 {
        self.lane_mean(|l| l.density)
    }

    /// Share of clusters passing filter, in %
    pub fn cluster_pf_percent(&self) -> f64 {
        self.lane_mean(|l| l.cluster_count_pf) / self.lane_mean(|l| l.cluster_count) * 100.0
    }
}

/// Queries against one run folder. Every call reads the disk again.
pub trait MetricsSource {
    /// Fails with `MetadataUnavailable` when the run descriptor is absent or malformed
    fn read_run_info(&self, run_path: &Path) -> Result<RunMetadata, StatusError>;

    /// 0 until the first cycle has been extracted
    fn read_last_completed_cycle(&self, run_path: &Path) -> Result<u32, StatusError>;

    /// May legitimately have zero reads
    fn read_run_summary(&self, run_path: &Path) -> Result<RunSummary, StatusError>;

    fn read_quality_histogram(&self, run_path: &Path) -> Result<Histogram, StatusError>;
}

/// Reads the InterOp directory of a run folder
#[derive(Debug, Clone, Copy, Default)]
pub struct InteropSource;

impl MetricsSource for InteropSource {
    fn read_run_info(&self, run_path: &Path) -> Result<RunMetadata, StatusError> {
        let run_info = parse_run_info(&run_path.join(RUN_INFO_FILE))?;
        Ok(RunMetadata::from(&run_info))
    }

    fn read_last_completed_cycle(&self, run_path: &Path) -> Result<u32, StatusError> {
        let records = read_interop(run_path, EXTRACTION_FILE, extraction_decoder)?.unwrap_or_default();
        let last_cycle = max_cycle(&records);
        debug!("{}: last extracted cycle {}", run_path.display(), last_cycle);
        Ok(last_cycle)
    }

    fn read_run_summary(&self, run_path: &Path) -> Result<RunSummary, StatusError> {
        Ok(InteropRun::read_path(run_path)?.summary())
    }

    fn read_quality_histogram(&self, run_path: &Path) -> Result<Histogram, StatusError> {
        let qmetrics = read_interop(run_path, QMETRICS_FILE, qmetrics_decoder)?;
        Ok(qscore_histogram(qmetrics.as_ref()))
    }
}
