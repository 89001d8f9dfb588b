//! Pulls the experiment name and the reagent RFID tags out of a run's
//! `RunParameters.xml`. The schema is different on every platform.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_xml_rs::from_reader;

use crate::error::StatusError;
use crate::platform::PlatformFamily;

/// MiSeq writes `runParameters.xml`, NextSeq and NovaSeq `RunParameters.xml`
pub const PARAMETERS_SUFFIX: &str = "unParameters.xml";

pub const NOVASEQ_REAGENTS: [&str; 5] = ["flowcell", "library_tube", "sbs", "cluster", "buffer"];

/// Reagent name -> tag name -> value
pub type Reagents = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub exp_name: String,
    pub reagents: Reagents,
}

type Tags = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct RunParametersXml {
    #[serde(rename = "ExperimentName", default)]
    experiment_name: Option<String>,
    #[serde(rename = "FlowcellRFIDTag", alias = "FlowCellRfidTag", default)]
    flowcell: Option<Tags>,
    #[serde(rename = "PR2BottleRFIDTag", alias = "PR2BottleRfidTag", default)]
    pr2_bottle: Option<Tags>,
    #[serde(rename = "ReagentKitRFIDTag", alias = "ReagentKitRfidTag", default)]
    reagent_kit: Option<Tags>,
    #[serde(rename = "RfidsInfo", default)]
    rfids_info: Option<Tags>,
}

/// The parameters file of a run folder, if the instrument wrote one yet
pub fn find_parameters_file(run_path: &Path) -> Result<Option<PathBuf>, StatusError> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(run_path)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map_or(false, |n| n.to_string_lossy().ends_with(PARAMETERS_SUFFIX))
        })
        .collect();
    candidates.sort();

    Ok(candidates.into_iter().next())
}

fn lowercase_tags(tags: Tags) -> Tags {
    tags.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect()
}

/// NovaSeq lists every reagent's tags flat in `RfidsInfo`, prefixed with the
/// reagent name (`SbsSerialBarcode`, `SbsLotNumber`...)
fn novaseq_reagents(rfids: &Tags) -> Reagents {
    NOVASEQ_REAGENTS
        .iter()
        .map(|&reagent| {
            let prefix = reagent.replace('_', "");
            let mut tags: Tags = rfids
                .iter()
                .filter(|(k, _)| k.to_lowercase().starts_with(&prefix))
                .filter_map(|(k, v)| Some((k.get(prefix.len()..)?.to_lowercase(), v.clone())))
                .collect();

            if let Some(serial) = tags.remove("serialbarcode") {
                tags.insert("serialnumber".to_owned(), serial);
            }
            (reagent.to_owned(), tags)
        })
        .collect()
}

/// Read the experiment name and reagents of the run in `run_path`.
/// `Ok(None)` when there is no parameters file.
pub fn run_parameters(
    family: PlatformFamily,
    run_path: &Path,
) -> Result<Option<RunParameters>, StatusError> {
    let path = match find_parameters_file(run_path)? {
        Some(path) => path,
        None => return Ok(None),
    };

    let failure = |reason: String| StatusError::ParametersParseFailure {
        path: path.clone(),
        reason,
    };

    let params: RunParametersXml =
        from_reader(File::open(&path)?).map_err(|e| failure(e.to_string()))?;

    let reagents = match family {
        PlatformFamily::MiSeq | PlatformFamily::NextSeq => {
            let tags = vec![
                ("flowcell", params.flowcell),
                ("pr2_bottle", params.pr2_bottle),
                ("reagent_kit", params.reagent_kit),
            ];
            let mut reagents = Reagents::new();
            for (reagent, tags) in tags {
                let tags = tags.ok_or_else(|| failure(format!("no RFID tag for {}", reagent)))?;
                reagents.insert(reagent.to_owned(), lowercase_tags(tags));
            }
            reagents
        }
        PlatformFamily::NovaSeq => {
            let rfids = params
                .rfids_info
                .as_ref()
                .ok_or_else(|| failure("no RfidsInfo".to_owned()))?;
            novaseq_reagents(rfids)
        }
    };

    Ok(Some(RunParameters {
        exp_name: params.experiment_name.unwrap_or_default(),
        reagents,
    }))
}
