//! Poll configuration: where the instruments write their runs and which
//! platforms to look for.

use std::{fs::File, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::error::StatusError;
use crate::platform::PlatformFamily;

fn default_platforms() -> Vec<PlatformFamily> {
    PlatformFamily::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusConfig {
    /// Main storage path, holding one directory per sequencer
    pub store_root: PathBuf,
    /// Platform families whose directories are scanned
    #[serde(default = "default_platforms")]
    pub platforms: Vec<PlatformFamily>,
    /// Stop after this many run-storage roots have been found
    #[serde(default)]
    pub max_instruments: Option<usize>,
}

impl StatusConfig {
    pub fn new(store_root: PathBuf) -> Self {
        StatusConfig {
            store_root,
            platforms: default_platforms(),
            max_instruments: None,
        }
    }

    /// Load a JSON config file, e.g. `{"store_root": "/storage/IN", "max_instruments": 4}`
    pub fn from_path(config_path: &Path) -> Result<Self, StatusError> {
        let rdr = File::open(config_path)?;
        let config: StatusConfig = serde_json::from_reader(rdr).map_err(|e| {
            StatusError::Config(format!("{}: {}", config_path.display(), e))
        })?;

        if config.platforms.is_empty() {
            return Err(StatusError::Config("no platforms configured".to_owned()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let config = StatusConfig::from_path(Path::new("test_data/config/status.json")).unwrap();
        assert_eq!(
            config,
            StatusConfig {
                store_root: PathBuf::from("/storage/IN"),
                platforms: vec![PlatformFamily::MiSeq, PlatformFamily::NovaSeq],
                max_instruments: Some(4),
            }
        );
    }

    #[test]
    fn defaults() {
        let config =
            StatusConfig::from_path(Path::new("test_data/config/minimal.json")).unwrap();
        assert_eq!(config, StatusConfig::new(PathBuf::from("/storage/IN")));
    }

    #[test]
    #[should_panic(expected = r#"unknown platform 'HiSeq'"#)]
    fn bad_platform() {
        StatusConfig::from_path(Path::new("test_data/config/bad_platform.json")).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"no platforms configured"#)]
    fn no_platforms() {
        StatusConfig::from_path(Path::new("test_data/config/no_platforms.json")).unwrap();
    }

    #[test]
    #[should_panic(expected = r#"No such file or directory"#)]
    fn no_file() {
        StatusConfig::from_path(Path::new("test_data/config/no_config.json")).unwrap();
    }
}
