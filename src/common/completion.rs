//! Looks for the files an instrument drops into its run folder once acquisition
//! or the copy to the storage server is over.

use std::{
    fs::{self, File},
    path::Path,
};

use chrono::{DateTime, Local};
use log::{debug, warn};
use serde::Deserialize;
use serde_xml_rs::from_reader;

use crate::error::StatusError;
use crate::platform::PlatformFamily;

/// Written once the whole run folder has been copied
pub const COPY_COMPLETE: &str = "CopyComplete.txt";
/// Written by the real-time analysis once the last cycle is processed
pub const RTA_COMPLETE: &str = "RTAComplete.txt";
/// MiSeq job summary with the completion timestamp
pub const COMPLETED_JOB_INFO: &str = "CompletedJobInfo.xml";
/// NextSeq completion record with the final run status
pub const RUN_COMPLETION_STATUS: &str = "RunCompletionStatus.xml";

/// Final status a NextSeq reports for a successful run
pub const COMPLETED_AS_PLANNED: &str = "CompletedAsPlanned";

pub const COMPLETION_DT_FORMAT: &str = "%Y-%m-%d   %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionMarker {
    /// The run is over. `error` carries the instrument's message when it did
    /// not complete as planned.
    Completed {
        completion_dt: String,
        error: Option<String>,
    },
    /// Acquisition is over but the run folder is still being copied
    Finalizing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompletedJobInfo {
    completion_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunCompletionStatus {
    completion_status: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Modification time of `path` as `YYYY-MM-DD   HH:MM` in local time
fn modified_dt(path: &Path) -> Result<String, StatusError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified)
        .format(COMPLETION_DT_FORMAT)
        .to_string())
}

fn marker_parse_failure(path: &Path, reason: String) -> StatusError {
    StatusError::MarkerParseFailure {
        path: path.to_path_buf(),
        reason,
    }
}

/// `2022-01-03T14:25:36.8230486-08:00` becomes `2022-01-03   14:25`
fn format_completion_time(completion_time: &str) -> Option<String> {
    let (date, time) = completion_time.trim().split_once('T')?;
    let time = time.split('.').next()?;
    let mut hm = time.splitn(3, ':');
    let (hours, minutes) = (hm.next()?, hm.next()?);

    if date.is_empty() || hours.is_empty() || minutes.is_empty() {
        return None;
    }
    Some(format!("{}   {}:{}", date, hours, minutes))
}

fn read_completed_job_info(path: &Path) -> Result<CompletionMarker, StatusError> {
    let job: CompletedJobInfo = from_reader(File::open(path)?)
        .map_err(|e| marker_parse_failure(path, e.to_string()))?;

    let completion_dt = format_completion_time(&job.completion_time).ok_or_else(|| {
        marker_parse_failure(path, format!("bad CompletionTime '{}'", job.completion_time))
    })?;

    Ok(CompletionMarker::Completed { completion_dt, error: None })
}

fn read_run_completion_status(path: &Path) -> Result<CompletionMarker, StatusError> {
    let record: RunCompletionStatus = from_reader(File::open(path)?)
        .map_err(|e| marker_parse_failure(path, e.to_string()))?;

    let error = if record.completion_status.trim() == COMPLETED_AS_PLANNED {
        None
    } else {
        Some(match record.error_description {
            Some(description) if !description.trim().is_empty() => {
                format!("{}: {}", record.completion_status.trim(), description.trim())
            }
            _ => record.completion_status.trim().to_owned(),
        })
    };

    Ok(CompletionMarker::Completed {
        completion_dt: modified_dt(path)?,
        error,
    })
}

fn completed_from_mtime(path: &Path) -> Result<CompletionMarker, StatusError> {
    Ok(CompletionMarker::Completed {
        completion_dt: modified_dt(path)?,
        error: None,
    })
}

/// Read one marker if it exists. A marker that cannot be read is logged and
/// treated as absent.
fn read_marker<F>(run_path: &Path, file_name: &str, read: F) -> Option<CompletionMarker>
where
    F: Fn(&Path) -> Result<CompletionMarker, StatusError>,
{
    let path = run_path.join(file_name);
    if !path.is_file() {
        return None;
    }

    match read(&path) {
        Ok(marker) => {
            debug!("{}: {:?}", path.display(), marker);
            Some(marker)
        }
        Err(e) => {
            warn!("ignoring completion marker: {}", e);
            None
        }
    }
}

/// Acquisition over on an instrument that still has to copy the run
fn partial_marker(family: PlatformFamily, run_path: &Path) -> Option<CompletionMarker> {
    if family.is_multi_stage() && run_path.join(RTA_COMPLETE).is_file() {
        Some(CompletionMarker::Finalizing)
    } else {
        None
    }
}

/// Completion evidence in `run_path`, in the order each platform writes it.
/// `None` when the run is not over yet.
pub fn check_completion_files(family: PlatformFamily, run_path: &Path) -> Option<CompletionMarker> {
    match family {
        PlatformFamily::MiSeq => read_marker(run_path, COMPLETED_JOB_INFO, read_completed_job_info)
            .or_else(|| read_marker(run_path, RTA_COMPLETE, completed_from_mtime)),
        PlatformFamily::NextSeq => read_marker(run_path, COPY_COMPLETE, completed_from_mtime)
            .or_else(|| read_marker(run_path, RUN_COMPLETION_STATUS, read_run_completion_status))
            .or_else(|| partial_marker(family, run_path)),
        PlatformFamily::NovaSeq => read_marker(run_path, COPY_COMPLETE, completed_from_mtime)
            .or_else(|| partial_marker(family, run_path)),
    }
}
