//! Infers where a run is in its lifecycle from the evidence available in its
//! folder. Signals are checked from the most to the least reliable: run
//! metadata, then metrics, then completion markers, then cycle arithmetic.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::completion::{check_completion_files, CompletionMarker};
use crate::error::StatusError;
use crate::histogram::{reshape, Q30Plot};
use crate::metrics_source::{MetricsSource, RunMetadata, RunSummary};
use crate::platform::PlatformFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Initializing,
    /// caught up with the planned cycles, no marker yet
    Idle,
    Running,
    Finalizing,
    Completed,
}

/// Everything computed for a run that is past initialization
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvaluation {
    pub status: RunStatus,
    /// empty unless a completion marker was found
    pub completion_dt: String,
    /// instrument reported failure, empty otherwise
    pub error: String,
    pub metadata: RunMetadata,
    pub last_cycle: u32,
    pub summary: RunSummary,
    pub q30_plot: Q30Plot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatusResult {
    /// Metadata or metrics are not there yet; nothing quantitative is reported
    Initializing,
    Ready(Box<RunEvaluation>),
}

/// Status from cycle progress alone, when no marker decided it
pub fn progress_status(last_cycle: u32, total_cycles: u32) -> RunStatus {
    if last_cycle == 0 {
        RunStatus::Initializing
    } else if last_cycle != total_cycles {
        RunStatus::Running
    } else {
        RunStatus::Idle
    }
}

/// Map the "not ready yet" signals to `None`, keep real failures
fn ready<T>(result: Result<T, StatusError>) -> Result<Option<T>, StatusError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_initializing() => {
            debug!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Evaluate the run in `run_path` of an instrument of `family`. `series_id`
/// names the chart series of the instrument.
pub fn evaluate_run<S>(
    source: &S,
    family: PlatformFamily,
    series_id: &str,
    run_path: &Path,
) -> Result<RunStatusResult, StatusError>
where
    S: MetricsSource + ?Sized,
{
    let metadata = match ready(source.read_run_info(run_path))? {
        Some(metadata) => metadata,
        None => return Ok(RunStatusResult::Initializing),
    };

    let last_cycle = source.read_last_completed_cycle(run_path)?;
    let summary = source.read_run_summary(run_path)?;
    if summary.is_empty() {
        debug!("{}: summary has no reads yet", run_path.display());
        return Ok(RunStatusResult::Initializing);
    }

    let histogram = source.read_quality_histogram(run_path)?;
    let q30_plot = match ready(reshape(&histogram, family.histogram_policy(), series_id))? {
        Some(plot) => plot,
        None => return Ok(RunStatusResult::Initializing),
    };

    let (status, completion_dt, error) = match check_completion_files(family, run_path) {
        Some(CompletionMarker::Completed { completion_dt, error }) => {
            (RunStatus::Completed, completion_dt, error.unwrap_or_default())
        }
        Some(CompletionMarker::Finalizing) => (RunStatus::Finalizing, String::new(), String::new()),
        None => (
            progress_status(last_cycle, metadata.total_cycles),
            String::new(),
            String::new(),
        ),
    };

    debug!(
        "{}: cycle {}/{} -> {:?}",
        run_path.display(),
        last_cycle,
        metadata.total_cycles,
        status
    );

    Ok(RunStatusResult::Ready(Box::new(RunEvaluation {
        status,
        completion_dt,
        error,
        metadata,
        last_cycle,
        summary,
        q30_plot,
    })))
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{io, path::Path, path::PathBuf};

    use crate::error::StatusError;
    use crate::histogram::{Histogram, HistogramBin};
    use crate::metrics_source::{
        LaneSummary, MetricsSource, ReadSummary, RunMetadata, RunSummary, TotalSummary,
    };

    /// Canned answers for the state machine
    pub struct FakeSource {
        pub metadata: Option<RunMetadata>,
        pub last_cycle: u32,
        pub summary: RunSummary,
        pub histogram: Histogram,
        /// make every metrics query fail
        pub broken: bool,
    }

    pub fn metadata(total_cycles: u32) -> RunMetadata {
        RunMetadata {
            paired_end: true,
            total_cycles,
            inst_name: "A00111".to_owned(),
            run_name: "220101_A00111_0001_AHXXXXXXX".to_owned(),
            date: "01/01/2022".to_owned(),
            flowcell_id: "HXXXXXXX".to_owned(),
        }
    }

    pub fn summary() -> RunSummary {
        let read = |number, first_cycle, last_cycle, is_index| ReadSummary {
            number,
            first_cycle,
            last_cycle,
            total_cycles: last_cycle - first_cycle + 1,
            is_index,
            yield_g: 1.5,
            percent_gt_q30: 91.34,
            percent_aligned: 0.5,
            error_rate: 0.25,
        };

        RunSummary {
            reads: vec![read(1, 1, 151, false), read(2, 152, 159, true), read(3, 160, 310, false)],
            lanes: vec![LaneSummary {
                lane: 1,
                density: 2_500_000.0,
                cluster_count: 1_000.0,
                cluster_count_pf: 800.0,
            }],
            total: TotalSummary {
                yield_g: 4.5,
                percent_gt_q30: 91.34,
                percent_aligned: 0.5,
                error_rate: 0.25,
            },
        }
    }

    pub fn histogram() -> Histogram {
        Histogram::new(vec![
            HistogramBin { bin: 1, count: 0.5, width: 14 },
            HistogramBin { bin: 15, count: 1.0, width: 7 },
            HistogramBin { bin: 28, count: 10.0, width: 5 },
        ])
    }

    impl FakeSource {
        /// A run at `last_cycle` of 310
        pub fn running(last_cycle: u32) -> FakeSource {
            FakeSource {
                metadata: Some(metadata(310)),
                last_cycle,
                summary: summary(),
                histogram: histogram(),
                broken: false,
            }
        }

        fn check(&self, run_path: &Path) -> Result<(), StatusError> {
            if self.broken {
                Err(StatusError::AdapterFailure {
                    path: run_path.join("InterOp"),
                    source: io::Error::new(io::ErrorKind::InvalidData, "bad record"),
                })
            } else {
                Ok(())
            }
        }
    }

    impl MetricsSource for FakeSource {
        fn read_run_info(&self, run_path: &Path) -> Result<RunMetadata, StatusError> {
            self.metadata.clone().ok_or_else(|| StatusError::MetadataUnavailable {
                path: PathBuf::from(run_path).join("RunInfo.xml"),
                reason: "No such file or directory".to_owned(),
            })
        }

        fn read_last_completed_cycle(&self, run_path: &Path) -> Result<u32, StatusError> {
            self.check(run_path)?;
            Ok(self.last_cycle)
        }

        fn read_run_summary(&self, run_path: &Path) -> Result<RunSummary, StatusError> {
            self.check(run_path)?;
            Ok(self.summary.clone())
        }

        fn read_quality_histogram(&self, run_path: &Path) -> Result<Histogram, StatusError> {
            self.check(run_path)?;
            Ok(self.histogram.clone())
        }
    }
}
