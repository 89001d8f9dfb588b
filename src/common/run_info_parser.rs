//! Deserializes the `RunInfo.xml` file of a sequencing run into a useful struct
//! of information about the run.

use std::{fs::File, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{de, Deserialize};
use serde_xml_rs::from_reader;

use crate::error::StatusError;

/// The top-level struct for the contents of RunInfo.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    /// Version number of this file (depends on the sequencer)
    pub version: u32,
    /// Full run id string (date, instrument, number, flowcell)
    pub id: String,
    /// Number representing how many runs this instrument has performed
    pub number: u64,
    /// Flowcell serial number
    pub flowcell: String,
    /// Instrument serial number/identifier
    pub instrument: String,
    /// The date (and sometimes time) of the run, as written by the instrument
    pub date: String,
    /// Format of the run: number of reads, read lengths, and which are indexes
    pub reads: Vec<Read>,
    /// Flowcell information, when the instrument writes it
    pub flowcell_layout: Option<FlowcellLayout>,
}

/// Deserialize RunInfo, including flattening the inner Run struct
/// into the top level
impl<'de> Deserialize<'de> for RunInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Outer {
            #[serde(rename = "Version")]
            version: u32,
            #[serde(rename = "Run")]
            run: Inner,
        }

        #[derive(Deserialize)]
        struct Inner {
            #[serde(rename = "Id")]
            id: String,
            #[serde(rename = "Number")]
            number: u64,
            #[serde(rename = "Flowcell")]
            flowcell: String,
            #[serde(rename = "Instrument")]
            instrument: String,
            #[serde(rename = "Date")]
            date: String,
            #[serde(rename = "Reads", deserialize_with = "reads_to_vec")]
            reads: Vec<Read>,
            #[serde(rename = "FlowcellLayout", default)]
            flowcell_layout: Option<FlowcellLayout>,
        }

        #[derive(Deserialize)]
        struct Reads {
            #[serde(rename = "Read")]
            pub read: Vec<Read>,
        }

        fn reads_to_vec<'de, D>(deserializer: D) -> Result<Vec<Read>, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            let mut reads = Reads::deserialize(deserializer)?.read;
            reads.sort_by_key(|r| r.number);

            let reads = reads
                .into_iter()
                .scan(0, |i, r| {
                    *i += r.num_cycles;
                    Some(Read { start: *i - r.num_cycles, end: *i, ..r })
                })
                .collect();

            Ok(reads)
        }

        let helper = Outer::deserialize(deserializer)?;

        Ok(RunInfo {
            version: helper.version,
            id: helper.run.id,
            number: helper.run.number,
            flowcell: helper.run.flowcell,
            instrument: helper.run.instrument,
            date: helper.run.date,
            reads: helper.run.reads,
            flowcell_layout: helper.run.flowcell_layout,
        })
    }
}

/// Information about one of the reads in a run
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Read {
    /// Which read this is
    #[serde(rename = "Number")]
    pub number: u32,
    /// How many cycles (e.g. bases) in the read
    #[serde(rename = "NumCycles")]
    pub num_cycles: u32,
    /// Whether or not it is an index read
    #[serde(rename = "IsIndexedRead", deserialize_with = "bool_from_string")]
    pub is_indexed_read: bool,
    /// The number of cycles before this read starts.
    /// This is not in the XML file but is calculated during deserialization
    #[serde(default)]
    pub start: u32,
    /// The last cycle of this read (1-based, inclusive).
    /// This is not in the XML file but is calculated during deserialization
    #[serde(default)]
    pub end: u32,
}

impl Read {
    pub fn first_cycle(&self) -> u32 {
        self.start + 1
    }

    pub fn last_cycle(&self) -> u32 {
        self.end
    }

    /// Whether a 1-based cycle number belongs to this read
    pub fn contains_cycle(&self, cycle: u32) -> bool {
        cycle > self.start && cycle <= self.end
    }
}

/// Convert from Y or N character to a boolean
fn bool_from_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: de::Deserializer<'de>,
{
    match String::deserialize(deserializer)?.as_ref() {
        "Y" | "y" | "true" => Ok(true),
        "N" | "n" | "false" => Ok(false),
        other => Err(de::Error::invalid_value(
            de::Unexpected::Str(other),
            &"Y or N",
        )),
    }
}

/// Information about the flowcell used in the run
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FlowcellLayout {
    /// Number of lanes
    #[serde(rename = "LaneCount")]
    pub lane_count: u32,
    /// Number of surfaces per lane
    #[serde(rename = "SurfaceCount", default)]
    pub surface_count: u32,
    /// Swathes per lane
    #[serde(rename = "SwathCount", default)]
    pub swath_count: u32,
    /// Number of tiles per swath
    #[serde(rename = "TileCount", default)]
    pub tile_count: u32,
}

impl RunInfo {
    /// Sum of the cycles of every read
    pub fn total_cycles(&self) -> u32 {
        self.reads.iter().map(|r| r.num_cycles).sum()
    }

    /// More than one non-index read
    pub fn is_paired_end(&self) -> bool {
        self.reads.iter().filter(|r| !r.is_indexed_read).count() > 1
    }

    /// Run date as `dd/mm/YYYY`. MiSeq/NextSeq write `yymmdd`, NovaSeq writes a
    /// US-style timestamp; anything else is passed through unchanged.
    pub fn display_date(&self) -> String {
        if let Ok(d) = NaiveDate::parse_from_str(&self.date, "%y%m%d") {
            return d.format("%d/%m/%Y").to_string();
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&self.date, "%m/%d/%Y %I:%M:%S %p") {
            return dt.format("%d/%m/%Y").to_string();
        }
        self.date.clone()
    }
}

/// Parse a `RunInfo.xml` file into a `RunInfo` struct. A missing or unreadable
/// file means the run has not written its metadata yet.
pub fn parse_run_info(run_info_path: &Path) -> Result<RunInfo, StatusError> {
    let unavailable = |reason: String| StatusError::MetadataUnavailable {
        path: run_info_path.to_path_buf(),
        reason,
    };

    let run_xml = File::open(run_info_path).map_err(|e| unavailable(e.to_string()))?;

    let runinfo: RunInfo = from_reader(run_xml)
        .map_err(|e| unavailable(format!("Error parsing RunInfo: {}", e)))?;

    if runinfo.reads.is_empty() {
        return Err(unavailable("Error parsing RunInfo: no reads".to_owned()));
    }

    Ok(runinfo)
}
