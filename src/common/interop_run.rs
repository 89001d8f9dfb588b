//! Represents the InterOp metrics of one sequencing run folder, loaded fresh
//! on every poll, and summarizes them the way the instrument's viewer does.

use std::{
    io,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, warn};

use crate::error::StatusError;
use crate::error_decoder::{error_decoder, ErrorRecord};
use crate::extraction_decoder::{extraction_decoder, ExtractionRecord};
use crate::histogram::{Histogram, HistogramBin};
use crate::metrics_source::{LaneSummary, ReadSummary, RunSummary, TotalSummary};
use crate::qmetrics_decoder::{qmetrics_decoder, QMetrics};
use crate::run_info_parser::{parse_run_info, Read, RunInfo};
use crate::tile_decoder::{tile_decoder, TileMetrics};

pub const RUN_INFO_FILE: &str = "RunInfo.xml";
pub const INTEROP_DIR: &str = "InterOp";
pub const EXTRACTION_FILE: &str = "ExtractionMetricsOut.bin";
pub const TILE_FILE: &str = "TileMetricsOut.bin";
pub const QMETRICS_FILE: &str = "QMetricsOut.bin";
pub const ERROR_FILE: &str = "ErrorMetricsOut.bin";

/// Q value from which a base call counts as ≥Q30
pub const Q30: u8 = 30;

/// Decode one InterOp file of a run, `None` when the instrument has not
/// written it yet
pub fn read_interop<T>(
    run_path: &Path,
    file_name: &str,
    decoder: fn(&Path) -> io::Result<T>,
) -> Result<Option<T>, StatusError> {
    let path = run_path.join(INTEROP_DIR).join(file_name);
    if !path.is_file() {
        debug!("{} not written yet", path.display());
        return Ok(None);
    }

    decoder(&path)
        .map(Some)
        .map_err(|source| StatusError::AdapterFailure { path, source })
}

/// Everything the status poll needs from a run folder
#[derive(Debug, Clone)]
pub struct InteropRun {
    /// the root path of the sequencing run
    pub run_path: PathBuf,
    /// RunInfo object, stores the contents of RunInfo.xml
    pub run_info: RunInfo,
    pub extraction: Vec<ExtractionRecord>,
    pub tiles: TileMetrics,
    pub qmetrics: Option<QMetrics>,
    /// empty when the file is missing or in a version we do not read
    pub errors: Vec<ErrorRecord>,
}

impl InteropRun {
    /// Loads the run located in `run_path`. Metric files that do not exist yet
    /// are treated as empty.
    pub fn read_path(run_path: &Path) -> Result<InteropRun, StatusError> {
        let run_info = parse_run_info(&run_path.join(RUN_INFO_FILE))?;

        let extraction = read_interop(run_path, EXTRACTION_FILE, extraction_decoder)?
            .unwrap_or_default();
        let tiles = read_interop(run_path, TILE_FILE, tile_decoder)?.unwrap_or_default();
        let qmetrics = read_interop(run_path, QMETRICS_FILE, qmetrics_decoder)?;

        // newer instruments write error metrics in versions we do not decode
        let errors = match read_interop(run_path, ERROR_FILE, error_decoder) {
            Ok(errors) => errors.unwrap_or_default(),
            Err(StatusError::AdapterFailure { ref source, .. })
                if source.kind() == io::ErrorKind::Unsupported =>
            {
                warn!("ignoring error metrics: {}", source);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(InteropRun {
            run_path: run_path.to_path_buf(),
            run_info,
            extraction,
            tiles,
            qmetrics,
            errors,
        })
    }

    /// Total and ≥Q30 base calls for the cycles selected by `in_cycles`
    fn q_counts<F>(&self, in_cycles: F) -> (u64, u64)
    where
        F: Fn(u32) -> bool,
    {
        let q = match &self.qmetrics {
            Some(q) => q,
            None => return (0, 0),
        };

        let mut total = 0u64;
        let mut gt_q30 = 0u64;
        for record in q.records.iter().filter(|r| in_cycles(r.cycle as u32)) {
            for (bin, &count) in q.bins.iter().zip(record.counts.iter()) {
                total += count as u64;
                if bin.value >= Q30 {
                    gt_q30 += count as u64;
                }
            }
        }

        (total, gt_q30)
    }

    fn read_summary(&self, read: &Read) -> ReadSummary {
        let (total, gt_q30) = self.q_counts(|cycle| read.contains_cycle(cycle));

        ReadSummary {
            number: read.number,
            first_cycle: read.first_cycle(),
            last_cycle: read.last_cycle(),
            total_cycles: read.num_cycles,
            is_index: read.is_indexed_read,
            yield_g: total as f64 / 1e9,
            percent_gt_q30: percent(gt_q30, total),
            percent_aligned: mean(
                self.tiles
                    .values()
                    .filter_map(|t| t.percent_aligned.get(&read.number))
                    .map(|&v| v as f64),
            ),
            error_rate: mean(
                self.errors
                    .iter()
                    .filter(|e| read.contains_cycle(e.cycle as u32))
                    .map(|e| e.error_rate as f64),
            ),
        }
    }

    /// Per-read, per-lane and overall statistics. Before the first tile or
    /// Q-score record is written the summary has no reads.
    pub fn summary(&self) -> RunSummary {
        let has_q = self.qmetrics.as_ref().map_or(false, |q| !q.records.is_empty());
        if self.tiles.is_empty() && !has_q {
            return RunSummary::default();
        }

        let reads: Vec<ReadSummary> = self
            .run_info
            .reads
            .iter()
            .map(|read| self.read_summary(read))
            .collect();

        let lanes = self
            .tiles
            .iter()
            .map(|(&(lane, _), tile)| (lane, tile))
            .into_group_map()
            .into_iter()
            .sorted_by_key(|(lane, _)| *lane)
            .map(|(lane, tiles)| LaneSummary {
                lane,
                density: mean(tiles.iter().filter_map(|t| t.density).map(f64::from)),
                cluster_count: mean(tiles.iter().filter_map(|t| t.cluster_count).map(f64::from)),
                cluster_count_pf: mean(
                    tiles.iter().filter_map(|t| t.cluster_count_pf).map(f64::from),
                ),
            })
            .collect();

        let (total, gt_q30) = self.q_counts(|_| true);
        let non_index = || reads.iter().filter(|r| !r.is_index);

        let total = TotalSummary {
            yield_g: total as f64 / 1e9,
            percent_gt_q30: percent(gt_q30, total),
            percent_aligned: mean(non_index().map(|r| r.percent_aligned).filter(|v| !v.is_nan())),
            error_rate: mean(non_index().map(|r| r.error_rate).filter(|v| !v.is_nan())),
        };

        RunSummary { reads, lanes, total }
    }
}

/// Sum the Q-score histogram over every tile and cycle. Unbinned instruments
/// only report the Q values that occur; binned instruments report every bin.
pub fn qscore_histogram(qmetrics: Option<&QMetrics>) -> Histogram {
    let q = match qmetrics {
        Some(q) => q,
        None => return Histogram::new(Vec::new()),
    };

    let mut totals = vec![0u64; q.bins.len()];
    for record in q.records.iter() {
        for (total, &count) in totals.iter_mut().zip(record.counts.iter()) {
            *total += count as u64;
        }
    }

    if totals.iter().all(|&t| t == 0) {
        return Histogram::new(Vec::new());
    }

    let bins = q
        .bins
        .iter()
        .zip(totals)
        .filter(|(_, total)| q.binned || *total > 0)
        .map(|(bin, total)| HistogramBin {
            bin: bin.lower as u32,
            count: total as f64 / 1e6,
            width: bin.width(),
        })
        .collect();

    Histogram::new(bins)
}

/// Arithmetic mean, NaN when there is nothing to average
fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        part as f64 / total as f64 * 100.0
    }
}
