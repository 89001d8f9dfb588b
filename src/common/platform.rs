//! The sequencer families this crate understands. Everything that differs between
//! instruments hangs off `PlatformFamily` instead of string matching.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformFamily {
    MiSeq,
    NextSeq,
    NovaSeq,
}

/// How the raw Q-score histogram is turned into a chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramPolicy {
    /// one addressable bar per Q value, gap-filled, rendered as columns
    DiscreteBin,
    /// variable-width bins drawn as linked area segments
    WindowedBin,
}

/// One of the two flow-cell bays of a dual-bay instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn suffix(self) -> &'static str {
        match self {
            Side::A => "_A",
            Side::B => "_B",
        }
    }

    /// Bay of a run folder, from the first character of its trailing token
    /// e.g. `220101_A00111_0001_AHXXXXXX` is on side A
    pub fn from_run_name(run_name: &str) -> Option<Side> {
        match run_name.rsplit('_').next()?.chars().next()? {
            'A' => Some(Side::A),
            'B' => Some(Side::B),
            _ => None,
        }
    }
}

impl PlatformFamily {
    pub const ALL: [PlatformFamily; 3] = [
        PlatformFamily::MiSeq,
        PlatformFamily::NextSeq,
        PlatformFamily::NovaSeq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlatformFamily::MiSeq => "MiSeq",
            PlatformFamily::NextSeq => "NextSeq",
            PlatformFamily::NovaSeq => "NovaSeq",
        }
    }

    /// Recognize the family from a directory name such as `NovaSeq2` or `miseq_01`
    pub fn from_dir_name(dir_name: &str) -> Option<PlatformFamily> {
        let lower = dir_name.to_lowercase();
        PlatformFamily::ALL
            .iter()
            .cloned()
            .find(|p| lower.contains(&p.name().to_lowercase()))
    }

    pub fn histogram_policy(self) -> HistogramPolicy {
        match self {
            PlatformFamily::MiSeq => HistogramPolicy::DiscreteBin,
            PlatformFamily::NextSeq | PlatformFamily::NovaSeq => HistogramPolicy::WindowedBin,
        }
    }

    /// NovaSeq runs two flow cells independently
    pub fn is_dual_bay(self) -> bool {
        self == PlatformFamily::NovaSeq
    }

    /// Whether the instrument writes `RTAComplete.txt` before the copy is done,
    /// so that marker alone means the run is finalizing
    pub fn is_multi_stage(self) -> bool {
        self != PlatformFamily::MiSeq
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlatformFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformFamily::ALL
            .iter()
            .cloned()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown platform '{}', expected MiSeq, NextSeq or NovaSeq", s))
    }
}

impl Serialize for PlatformFamily {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for PlatformFamily {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_names() {
        assert_eq!(PlatformFamily::from_dir_name("MiSeq1"), Some(PlatformFamily::MiSeq));
        assert_eq!(PlatformFamily::from_dir_name("nextseq_2"), Some(PlatformFamily::NextSeq));
        assert_eq!(PlatformFamily::from_dir_name("NOVASEQ"), Some(PlatformFamily::NovaSeq));
        assert_eq!(PlatformFamily::from_dir_name("Logs"), None);
    }

    #[test]
    fn parse() {
        assert_eq!("novaseq".parse::<PlatformFamily>(), Ok(PlatformFamily::NovaSeq));
        assert!("HiSeq".parse::<PlatformFamily>().is_err());
    }

    #[test]
    fn policies() {
        assert_eq!(PlatformFamily::MiSeq.histogram_policy(), HistogramPolicy::DiscreteBin);
        assert_eq!(PlatformFamily::NextSeq.histogram_policy(), HistogramPolicy::WindowedBin);
        assert!(PlatformFamily::NovaSeq.is_dual_bay());
        assert!(!PlatformFamily::NextSeq.is_dual_bay());
        assert!(!PlatformFamily::MiSeq.is_multi_stage());
    }

    #[test]
    fn sides() {
        assert_eq!(Side::from_run_name("220101_A00111_0001_AHXXXXXX"), Some(Side::A));
        assert_eq!(Side::from_run_name("220101_A00111_0002_B1"), Some(Side::B));
        assert_eq!(Side::from_run_name("220101_A00111_0003_HXXXXXX"), None);
        assert_eq!(Side::B.suffix(), "_B");
    }
}
