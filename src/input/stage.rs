//! Code for reading stages and load levels from CSV files.
use super::{input_err_msg, read_csv};
use crate::id::IDCollection;
use crate::universe::{LoadLevelID, StageID};
use crate::units::{Dimensionless, Hours, UnitType};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const STAGES_FILE_NAME: &str = "stages.csv";
const LOAD_LEVELS_FILE_NAME: &str = "load_levels.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct StageRaw {
    stage: String,
    weight: Dimensionless,
}

#[derive(Debug, PartialEq, Deserialize)]
struct LoadLevelRaw {
    load_level: String,
    stage: String,
    #[serde(default)]
    duration: Option<Hours>,
}

/// Stages, load levels and the relation between them
#[derive(Debug, PartialEq)]
pub struct StageData {
    /// Every stage with its weight
    pub stages: IndexMap<StageID, Dimensionless>,
    /// Every load level with its duration, if it has one
    pub load_levels: IndexMap<LoadLevelID, Option<Hours>>,
    /// The stage each load level belongs to
    pub stage_to_level: HashSet<(StageID, LoadLevelID)>,
}

/// Read stages and load levels from the specified model directory.
///
/// Unlike periods, stages with zero weight are kept: they are iterated over but never activated.
/// A blank or zero duration leaves the load level without a duration.
pub fn read_stages_and_load_levels(model_dir: &Path) -> Result<StageData> {
    let file_path = model_dir.join(STAGES_FILE_NAME);
    let stages_csv = read_csv(&file_path)?;
    let stages = read_stages_from_iter(stages_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(LOAD_LEVELS_FILE_NAME);
    let load_levels_csv = read_csv(&file_path)?;
    let (load_levels, stage_to_level) = read_load_levels_from_iter(load_levels_csv, &stages)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(StageData {
        stages,
        load_levels,
        stage_to_level,
    })
}

fn read_stages_from_iter<I>(iter: I) -> Result<IndexMap<StageID, Dimensionless>>
where
    I: Iterator<Item = StageRaw>,
{
    let mut stages = IndexMap::new();
    for stage in iter {
        ensure!(
            stage.weight.is_finite() && stage.weight >= Dimensionless(0.0),
            "Weight for stage {} must be a finite number greater than or equal to zero",
            stage.stage
        );
        let id: StageID = stage.stage.into();
        ensure!(
            stages.insert(id.clone(), stage.weight).is_none(),
            "Duplicate stage {id}"
        );
    }

    Ok(stages)
}

#[allow(clippy::type_complexity)]
fn read_load_levels_from_iter<I>(
    iter: I,
    stages: &IndexMap<StageID, Dimensionless>,
) -> Result<(
    IndexMap<LoadLevelID, Option<Hours>>,
    HashSet<(StageID, LoadLevelID)>,
)>
where
    I: Iterator<Item = LoadLevelRaw>,
{
    let stage_ids: IndexSet<StageID> = stages.keys().cloned().collect();
    let mut load_levels = IndexMap::new();
    let mut stage_to_level = HashSet::new();

    for load_level in iter {
        let stage = stage_ids.get_id(&load_level.stage)?;
        if let Some(duration) = load_level.duration {
            ensure!(
                duration.is_finite() && duration >= Hours(0.0),
                "Duration of load level {} must be a finite number greater than or equal to zero",
                load_level.load_level
            );
        }

        let id: LoadLevelID = load_level.load_level.into();
        let duration = load_level.duration.filter(|duration| *duration > Hours(0.0));
        ensure!(
            load_levels.insert(id.clone(), duration).is_none(),
            "Duplicate load level {id}. Each load level belongs to at most one stage"
        );
        stage_to_level.insert((stage.clone(), id));
    }

    Ok((load_levels, stage_to_level))
}
