//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use crate::system::PowerSystem;
use crate::universe::IndexUniverse;
use crate::weights::{WeightStore, discounted_weight};
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::fs;
use std::path::Path;

mod demand;
use demand::read_demand;
mod generation;
use generation::read_generation_units;
mod network;
use network::read_lines;
mod node;
use node::read_nodes;
mod period;
use period::read_periods_and_scenarios;
mod stage;
use stage::read_stages_and_load_levels;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// A missing file is treated the same as an empty one.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check whether a slice is sorted in strictly ascending order
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}

/// Format a list of items, showing at most `cap` of them
pub fn format_items_with_cap<I, T>(items: I, cap: usize) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let items = items.into_iter().collect_vec();
    let shown = items.iter().take(cap).join(", ");
    if items.len() > cap {
        format!("{shown} and {} more", items.len() - cap)
    } else {
        shown
    }
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data and the weights of its periods, scenarios, stages and load levels.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<(Model, WeightStore)> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;

    let periods = read_periods_and_scenarios(model_dir)?;
    let stages = read_stages_and_load_levels(model_dir)?;

    let nodes = read_nodes(model_dir)?;
    let units = read_generation_units(model_dir, &nodes)?;
    let lines = read_lines(model_dir, &nodes)?;
    let demand = read_demand(
        model_dir,
        &periods.period_scenarios,
        &stages.load_levels,
        &nodes,
    )?;

    let candidate_units = units
        .values()
        .filter(|unit| unit.is_candidate())
        .map(|unit| unit.id.clone())
        .collect();
    let retirement_units = units
        .values()
        .filter(|unit| unit.is_retirable())
        .map(|unit| unit.id.clone())
        .collect();
    let candidate_lines = lines
        .values()
        .filter(|line| line.is_candidate())
        .map(|line| line.id.clone())
        .collect();

    let universe = IndexUniverse::new(
        periods.periods.keys().copied().collect(),
        periods.period_scenarios.keys().cloned().collect(),
        stages.stages.keys().cloned().collect(),
        stages.load_levels.keys().cloned().collect(),
        stages.stage_to_level,
    )
    .with_candidates(candidate_units, retirement_units, candidate_lines);

    // Costs are discounted to the first period unless a base year is given
    let base_year = parameters
        .economic_base_year
        .or_else(|| universe.periods.first().copied())
        .unwrap_or_default();
    let discounted: IndexMap<_, _> = periods
        .periods
        .iter()
        .map(|(&period, &weight)| {
            (
                period,
                discounted_weight(period, weight, parameters.annual_discount_rate, base_year),
            )
        })
        .collect();
    let weights = WeightStore::new(
        periods.period_scenarios,
        discounted,
        stages.stages,
        stages
            .load_levels
            .into_iter()
            .filter_map(|(id, duration)| Some((id, duration?)))
            .collect(),
    );

    debug!(
        "Loaded {} periods, {} stages, {} load levels, {} units, {} lines",
        universe.periods.len(),
        universe.stages.len(),
        universe.load_levels.len(),
        units.len(),
        lines.len()
    );

    let model = Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        universe,
        system: PowerSystem {
            nodes,
            units,
            lines,
            demand,
        },
    };

    Ok((model, weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn read_csv_works() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello, 1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );
    }

    #[test]
    fn read_csv_empty() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn read_csv_optional_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.csv");
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn read_toml_bad_syntax() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "key = ").unwrap();
        }
        assert_error!(
            read_toml::<toml::Table>(&file_path),
            input_err_msg(&file_path)
        );
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[1], true)]
    #[case(&[1, 2, 3], true)]
    #[case(&[1, 1], false)]
    #[case(&[2, 1], false)]
    fn is_sorted_and_unique_works(#[case] values: &[u32], #[case] expected: bool) {
        assert_eq!(is_sorted_and_unique(values), expected);
    }

    #[rstest]
    #[case(&["a", "b"], "a, b")]
    #[case(&["a", "b", "c", "d"], "a, b, c and 1 more")]
    fn format_items_with_cap_works(#[case] items: &[&str], #[case] expected: &str) {
        assert_eq!(format_items_with_cap(items, 3), expected);
    }
}
