//! Finds the run-storage root of every sequencer under the main storage path
//! and picks the most recently modified run folder inside each of them.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::config::StatusConfig;
use crate::error::StatusError;
use crate::platform::{PlatformFamily, Side};

/// Illumina run folder names: `<date>_<instrument>_<run number>_<flowcell>`
pub const RUN_FOLDER_PATTERN: &str = r"^\d{6}_[\w\d]+_\d{4}_[\w\d]+";

/// Compiled run folder naming grammar
pub struct RunFolderGrammar(Regex);

impl RunFolderGrammar {
    pub fn new() -> Result<Self, StatusError> {
        Regex::new(RUN_FOLDER_PATTERN)
            .map(RunFolderGrammar)
            .map_err(|e| StatusError::Config(e.to_string()))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

/// The directory that actually holds the run folders of one sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRoot {
    /// name of the sequencer directory directly below the store root
    pub dir_name: String,
    pub family: PlatformFamily,
    pub root: PathBuf,
}

/// A logical instrument, i.e. one side of a dual-bay sequencer or a whole one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: String,
    pub family: PlatformFamily,
    pub side: Option<Side>,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFolder {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Directory check that follows symlinks. Dangling links are not directories.
fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Get the run-storage root of each configured sequencer.
///
/// Sequencer directories may nest their runs below the top level, so each one is
/// walked in name order and the parent of the first run folder found is its root.
/// Sequencers without any run folder are skipped.
pub fn sequencer_rootdirs(
    config: &StatusConfig,
    grammar: &RunFolderGrammar,
) -> Result<Vec<PlatformRoot>, StatusError> {
    let mut seq_dirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(&config.store_root)? {
        let entry = entry?;
        // follows symlinks, e.g. a mounted instrument share
        if !is_dir(&entry.path()) {
            continue;
        }
        seq_dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    seq_dirs.sort();

    let mut rootdirs: Vec<PlatformRoot> = Vec::new();
    for (dir_name, seq_dir) in seq_dirs {
        if let Some(max) = config.max_instruments {
            if rootdirs.len() >= max {
                debug!("reached the maximum of {} sequencers", max);
                break;
            }
        }

        let family = match PlatformFamily::from_dir_name(&dir_name) {
            Some(family) if config.platforms.contains(&family) => family,
            _ => {
                debug!("ignoring {}", seq_dir.display());
                continue;
            }
        };

        let first_run = WalkDir::new(&seq_dir)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("skipping unreadable entry below {}: {}", seq_dir.display(), e);
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
            .find(|e| grammar.matches(&e.file_name().to_string_lossy()));

        let root = match first_run.as_ref().and_then(|e| e.path().parent()) {
            Some(root) => root.to_path_buf(),
            None => {
                debug!("no run folder below {}", seq_dir.display());
                continue;
            }
        };

        if rootdirs.iter().any(|r| r.root == root) {
            continue;
        }

        debug!("{} ({}) stores its runs in {}", dir_name, family, root.display());
        rootdirs.push(PlatformRoot { dir_name, family, root });
    }

    Ok(rootdirs)
}

/// List the run folders directly inside `root`, ignoring anything that does not
/// follow the naming grammar
pub fn list_run_folders(root: &Path, grammar: &RunFolderGrammar) -> std::io::Result<Vec<RunFolder>> {
    let mut run_folders = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !grammar.matches(&name) {
            continue;
        }

        let metadata = match fs::metadata(entry.path()) {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => continue,
            Err(e) => {
                warn!("skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        run_folders.push(RunFolder {
            name,
            path: entry.path(),
            modified: metadata.modified()?,
        });
    }

    Ok(run_folders)
}

/// The most recently modified run folder, ties broken by name
pub fn get_latest_runfolder<'a, I>(run_folders: I) -> Option<RunFolder>
where
    I: IntoIterator<Item = &'a RunFolder>,
{
    run_folders
        .into_iter()
        .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)))
        .cloned()
}

/// Get the latest run folder of each sequencer. Dual-bay sequencers are reported
/// as two instruments, `<name>_A` and `<name>_B`, and a bay without runs is left out.
pub fn get_sequencer_latest_run(
    rootdirs: &[PlatformRoot],
    grammar: &RunFolderGrammar,
) -> Vec<(Instrument, RunFolder)> {
    let mut latest_runs = Vec::new();

    for seq_root in rootdirs {
        let run_folders = match list_run_folders(&seq_root.root, grammar) {
            Ok(run_folders) => run_folders,
            Err(e) => {
                warn!("could not list runs of {}: {}", seq_root.dir_name, e);
                continue;
            }
        };

        if seq_root.family.is_dual_bay() {
            let by_side = run_folders
                .iter()
                .filter_map(|r| Side::from_run_name(&r.name).map(|side| (side, r)))
                .into_group_map();

            for side in [Side::A, Side::B].iter().cloned() {
                let latest = by_side
                    .get(&side)
                    .and_then(|runs| get_latest_runfolder(runs.iter().cloned()));

                if let Some(latest) = latest {
                    latest_runs.push((
                        Instrument {
                            id: format!("{}{}", seq_root.dir_name, side.suffix()),
                            family: seq_root.family,
                            side: Some(side),
                            root: seq_root.root.clone(),
                        },
                        latest,
                    ));
                }
            }
        } else if let Some(latest) = get_latest_runfolder(&run_folders) {
            latest_runs.push((
                Instrument {
                    id: seq_root.dir_name.clone(),
                    family: seq_root.family,
                    side: None,
                    root: seq_root.root.clone(),
                },
                latest,
            ));
        }
    }

    latest_runs
}

/// One filesystem snapshot: every instrument with its current run
pub fn resolve_instruments(config: &StatusConfig) -> Result<Vec<(Instrument, RunFolder)>, StatusError> {
    let grammar = RunFolderGrammar::new()?;
    let rootdirs = sequencer_rootdirs(config, &grammar)?;
    let latest_runs = get_sequencer_latest_run(&rootdirs, &grammar);

    info!(
        "found {} sequencer roots and {} current runs in {}",
        rootdirs.len(),
        latest_runs.len(),
        config.store_root.display()
    );

    Ok(latest_runs)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{
        fs::{self, File},
        path::{Path, PathBuf},
        time::{Duration, SystemTime},
    };

    /// Create a directory (and its parents) with a modification time
    /// `age_secs` seconds in the past
    pub fn make_dir(path: &Path, age_secs: u64) -> PathBuf {
        fs::create_dir_all(path).unwrap();
        set_age(path, age_secs);
        path.to_path_buf()
    }

    pub fn set_age(path: &Path, age_secs: u64) {
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        File::open(path).unwrap().set_modified(modified).unwrap();
    }
}
