//! run_status polls a sequencing store once and prints the status and Q-score
//! chart of the latest run of every instrument as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use clap::{Arg, App, value_t};

use common::aggregator::get_latest_run_status;
use common::config::StatusConfig;
use common::metrics_source::InteropSource;
use common::platform::PlatformFamily;


/// Parses command line arguments and runs one status poll
fn main() {
     env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

     let matches = App::new("run_status")
          .version(clap::crate_version!())
          .arg(Arg::with_name("store-root")
               .long("store-root")
               .help("main storage path, with one directory per sequencer")
               .takes_value(true)
               .required_unless("config"))
          .arg(Arg::with_name("config")
               .long("config")
               .help("JSON configuration file")
               .takes_value(true))
          .arg(Arg::with_name("platforms")
               .long("platforms")
               .help("comma-separated platforms to report on (MiSeq,NextSeq,NovaSeq)")
               .takes_value(true))
          .arg(Arg::with_name("max-instruments")
               .long("max-instruments")
               .help("maximum number of sequencers to scan")
               .takes_value(true))
          .arg(Arg::with_name("output")
               .long("output")
               .help("write the JSON report to this file instead of stdout")
               .takes_value(true))
          .arg(Arg::with_name("pretty")
               .long("pretty")
               .help("pretty-print the JSON report"))
          .get_matches();

     let mut config = match matches.value_of("config") {
          Some(config_path) => StatusConfig::from_path(Path::new(config_path))
               .unwrap_or_else(|e| panic!("Error reading config {}: {}", config_path, e)),
          None => StatusConfig::new(PathBuf::new()),
     };

     if let Some(store_root) = matches.value_of("store-root") {
          config.store_root = PathBuf::from(store_root);
     }
     if !config.store_root.exists() {
          panic!("Could not find store root {}", config.store_root.display());
     }

     if let Some(platforms) = matches.value_of("platforms") {
          config.platforms = platforms
               .split(',')
               .map(|p| p.trim().parse::<PlatformFamily>())
               .collect::<Result<Vec<_>, _>>()
               .unwrap_or_else(|e| panic!("Error parsing platforms: {}", e));
     }

     if matches.is_present("max-instruments") {
          let max_instruments = value_t!(matches, "max-instruments", usize).unwrap_or_else(|e| e.exit());
          config.max_instruments = Some(max_instruments);
     }

     let result = match get_latest_run_status(&config, &InteropSource) {
          Ok(result) => result,
          Err(e) => panic!("Error reading store root: {}", e),
     };

     let json = if matches.is_present("pretty") {
          serde_json::to_string_pretty(&result)
     } else {
          serde_json::to_string(&result)
     }.unwrap_or_else(|e| panic!("Error serializing report: {}", e));

     match matches.value_of("output") {
          Some(output) => fs::write(output, json)
               .unwrap_or_else(|e| panic!("Error writing {}: {}", output, e)),
          None => println!("{}", json),
     }
}
