//! Code for reading generating units from a CSV file.
use super::{input_err_msg, read_csv};
use crate::system::{GenerationUnit, NodeMap, UnitID, UnitMap};
use crate::toggle::deserialise_toggle;
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, Power, UnitType};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const GENERATION_FILE_NAME: &str = "generation.csv";

fn default_efficiency() -> Dimensionless {
    Dimensionless(1.0)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct GenerationUnitRaw {
    unit: String,
    technology: String,
    node: String,
    max_power: Power,
    #[serde(default)]
    min_power: Power,
    #[serde(default)]
    variable_cost: MoneyPerEnergy,
    #[serde(default)]
    investment_cost: Money,
    #[serde(default)]
    retirement_cost: Money,
    #[serde(default)]
    ramp_up: Option<Power>,
    #[serde(default)]
    ramp_down: Option<Power>,
    #[serde(default)]
    min_up_time: u32,
    #[serde(default)]
    max_storage: Energy,
    #[serde(default = "default_efficiency")]
    efficiency: Dimensionless,
    #[serde(deserialize_with = "deserialise_toggle")]
    commitment: bool,
}

/// Read generating units from the specified model directory
pub fn read_generation_units(model_dir: &Path, nodes: &NodeMap) -> Result<UnitMap> {
    let file_path = model_dir.join(GENERATION_FILE_NAME);
    let units_csv = read_csv(&file_path)?;
    read_generation_units_from_iter(units_csv, nodes).with_context(|| input_err_msg(&file_path))
}

fn read_generation_units_from_iter<I>(iter: I, nodes: &NodeMap) -> Result<UnitMap>
where
    I: Iterator<Item = GenerationUnitRaw>,
{
    let mut units = UnitMap::new();
    for raw in iter {
        let unit = validate_unit(raw, nodes)?;
        let id = unit.id.clone();
        ensure!(units.insert(id.clone(), unit).is_none(), "Duplicate unit {id}");
    }

    Ok(units)
}

fn validate_unit(raw: GenerationUnitRaw, nodes: &NodeMap) -> Result<GenerationUnit> {
    let id: UnitID = raw.unit.into();
    let node = nodes
        .get_key_value(raw.node.as_str())
        .map(|(node, _)| node.clone())
        .with_context(|| format!("Unit {id} is connected to unknown node {}", raw.node))?;

    ensure!(
        raw.max_power.is_finite() && raw.max_power > Power(0.0),
        "Maximum power of unit {id} must be a finite number greater than zero"
    );
    ensure!(
        raw.min_power >= Power(0.0) && raw.min_power <= raw.max_power,
        "Minimum power of unit {id} must be between zero and its maximum power"
    );
    ensure!(
        raw.investment_cost >= Money(0.0) && raw.retirement_cost >= Money(0.0),
        "Investment and retirement costs of unit {id} cannot be negative"
    );
    ensure!(
        !(raw.investment_cost > Money(0.0) && raw.retirement_cost > Money(0.0)),
        "Unit {id} cannot be a candidate for both investment and retirement"
    );
    for ramp in [raw.ramp_up, raw.ramp_down].into_iter().flatten() {
        ensure!(
            ramp > Power(0.0),
            "Ramp limits of unit {id} must be greater than zero"
        );
    }
    ensure!(
        raw.max_storage >= Energy(0.0),
        "Storage capacity of unit {id} cannot be negative"
    );
    ensure!(
        raw.efficiency > Dimensionless(0.0) && raw.efficiency <= Dimensionless(1.0),
        "Efficiency of unit {id} must be greater than zero and at most one"
    );

    Ok(GenerationUnit {
        id,
        technology: raw.technology.into(),
        node,
        max_power: raw.max_power,
        min_power: raw.min_power,
        variable_cost: raw.variable_cost,
        investment_cost: raw.investment_cost,
        retirement_cost: raw.retirement_cost,
        ramp_up: raw.ramp_up,
        ramp_down: raw.ramp_down,
        min_up_time: raw.min_up_time,
        max_storage: raw.max_storage,
        efficiency: raw.efficiency,
        commitment: raw.commitment,
    })
}
