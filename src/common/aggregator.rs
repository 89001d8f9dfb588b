//! One status poll: resolve every instrument's current run, evaluate it and
//! collect the reports. A failing instrument only affects its own entry.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::config::StatusConfig;
use crate::error::StatusError;
use crate::metrics_source::MetricsSource;
use crate::report::InstrumentReport;
use crate::run_folders::{resolve_instruments, Instrument, RunFolder};
use crate::run_parameters::run_parameters;
use crate::run_status::{evaluate_run, RunStatusResult};

/// Report for the current run of one instrument
pub fn instrument_report<S>(instrument: &Instrument, run: &RunFolder, source: &S) -> InstrumentReport
where
    S: MetricsSource + ?Sized,
{
    match evaluate_run(source, instrument.family, &instrument.id, &run.path) {
        Ok(RunStatusResult::Initializing) => {
            info!("{}: {} is initializing", instrument.id, run.name);
            InstrumentReport::initializing()
        }
        Ok(result) => {
            let parameters = match run_parameters(instrument.family, &run.path) {
                Ok(parameters) => parameters,
                Err(e) => {
                    warn!("{}: skipping run parameters: {}", instrument.id, e);
                    None
                }
            };
            let report = InstrumentReport::from_result(result, parameters);
            info!("{}: {} is {}", instrument.id, run.name, report.status());
            report
        }
        Err(e) => {
            warn!("{}: {}", instrument.id, e);
            InstrumentReport::failed(&e)
        }
    }
}

/// Status of the latest run of every instrument under the store root, keyed by
/// instrument id. Only a store root that cannot be read fails the whole poll.
pub fn get_latest_run_status<S>(
    config: &StatusConfig,
    source: &S,
) -> Result<BTreeMap<String, InstrumentReport>, StatusError>
where
    S: MetricsSource + ?Sized,
{
    let latest_runs = resolve_instruments(config)?;

    Ok(latest_runs
        .iter()
        .map(|(instrument, run)| (instrument.id.clone(), instrument_report(instrument, run, source)))
        .collect())
}
