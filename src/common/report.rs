//! The per-instrument entry of the status map, as served to the dashboard.

use serde::Serialize;

use crate::error::StatusError;
use crate::histogram::Q30Plot;
use crate::metrics_source::ReadSummary;
use crate::number_format::convert_number_format;
use crate::run_parameters::{Reagents, RunParameters};
use crate::run_status::{RunEvaluation, RunStatus, RunStatusResult};

const INITIALIZING_MSG: &str = "Run is initializing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadReport {
    pub read_id: u32,
    pub first_cycle: u32,
    pub last_cycle: u32,
    pub total_cycles: u32,
    pub is_index: bool,
}

impl From<&ReadSummary> for ReadReport {
    fn from(read: &ReadSummary) -> ReadReport {
        ReadReport {
            read_id: read.number,
            first_cycle: read.first_cycle,
            last_cycle: read.last_cycle,
            total_cycles: read.total_cycles,
            is_index: read.is_index,
        }
    }
}

/// Fixed entry for a run that has not written enough to report on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializingReport {
    pub paired_end: &'static str,
    pub total_cycles: u32,
    pub last_cycle: u32,
    pub run_name: &'static str,
    pub flowcell_id: &'static str,
    pub inst_name: &'static str,
    pub date: &'static str,
    pub p_gt_q30: &'static str,
    pub total_yield: &'static str,
    pub percent_aligned: &'static str,
    pub cluster_density: &'static str,
    pub cluster_pf_percent: &'static str,
    pub reads: Vec<ReadReport>,
    pub status: RunStatus,
    pub error: &'static str,
    pub q30_plot: Q30Plot,
}

impl Default for InitializingReport {
    fn default() -> Self {
        InitializingReport {
            paired_end: INITIALIZING_MSG,
            total_cycles: 0,
            last_cycle: 0,
            run_name: INITIALIZING_MSG,
            flowcell_id: INITIALIZING_MSG,
            inst_name: "",
            date: "",
            p_gt_q30: "",
            total_yield: "",
            percent_aligned: "",
            cluster_density: "",
            cluster_pf_percent: "",
            reads: Vec::new(),
            status: RunStatus::Initializing,
            error: "",
            q30_plot: Q30Plot::placeholder(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub completion_dt: String,
    pub error: String,
    pub paired_end: bool,
    pub total_cycles: u32,
    pub last_cycle: u32,
    pub inst_name: String,
    pub run_name: String,
    pub date: String,
    pub flowcell_id: String,
    pub p_gt_q30: String,
    pub total_yield: String,
    pub percent_aligned: String,
    pub cluster_density: String,
    pub cluster_pf_percent: String,
    pub reads: Vec<ReadReport>,
    pub q30_plot: Q30Plot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reagents: Option<Reagents>,
}

impl RunReport {
    pub fn new(evaluation: RunEvaluation, parameters: Option<RunParameters>) -> RunReport {
        let RunEvaluation {
            status,
            completion_dt,
            error,
            metadata,
            last_cycle,
            summary,
            q30_plot,
        } = evaluation;
        let (exp_name, reagents) = match parameters {
            Some(p) => (Some(p.exp_name), Some(p.reagents)),
            None => (None, None),
        };

        RunReport {
            status,
            completion_dt,
            error,
            paired_end: metadata.paired_end,
            total_cycles: metadata.total_cycles,
            last_cycle,
            inst_name: metadata.inst_name,
            run_name: metadata.run_name,
            date: metadata.date,
            flowcell_id: metadata.flowcell_id,
            p_gt_q30: convert_number_format(summary.total.percent_gt_q30) + "%",
            total_yield: convert_number_format(summary.total.yield_g) + "Gb",
            percent_aligned: convert_number_format(summary.total.percent_aligned) + "%",
            cluster_density: convert_number_format(summary.cluster_density()) + "/mm²",
            cluster_pf_percent: convert_number_format(summary.cluster_pf_percent()) + "%",
            reads: summary.reads.iter().map(ReadReport::from).collect(),
            q30_plot,
            exp_name,
            reagents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedReport {
    pub status: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InstrumentReport {
    Initializing(InitializingReport),
    Ready(Box<RunReport>),
    Failed(FailedReport),
}

impl InstrumentReport {
    pub fn initializing() -> InstrumentReport {
        InstrumentReport::Initializing(InitializingReport::default())
    }

    pub fn from_result(result: RunStatusResult, parameters: Option<RunParameters>) -> InstrumentReport {
        match result {
            RunStatusResult::Initializing => InstrumentReport::initializing(),
            RunStatusResult::Ready(evaluation) => {
                InstrumentReport::Ready(Box::new(RunReport::new(*evaluation, parameters)))
            }
        }
    }

    pub fn failed(error: &StatusError) -> InstrumentReport {
        InstrumentReport::Failed(FailedReport {
            status: "Error",
            error: error.to_string(),
        })
    }

    /// The status as shown on the dashboard
    pub fn status(&self) -> &str {
        match self {
            InstrumentReport::Initializing(_) => "Initializing",
            InstrumentReport::Ready(report) => match report.status {
                RunStatus::Initializing => "Initializing",
                RunStatus::Idle => "Idle",
                RunStatus::Running => "Running",
                RunStatus::Finalizing => "Finalizing",
                RunStatus::Completed => "Completed",
            },
            InstrumentReport::Failed(report) => report.status,
        }
    }
}
