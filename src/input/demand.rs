//! Code for reading nodal demand from a CSV file.
use super::{format_items_with_cap, input_err_msg, read_csv};
use crate::system::{DemandMap, NodeID, NodeMap};
use crate::universe::{LoadLevelID, PeriodScenario, ScenarioID};
use crate::units::{Hours, Power, UnitType};
use crate::weights::WeightTriple;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const DEMAND_FILE_NAME: &str = "demand.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct DemandRaw {
    period: u32,
    scenario: String,
    load_level: String,
    node: String,
    demand: Power,
}

/// Read demand from the specified model directory.
///
/// Rows for periods or scenarios which were dropped for having no weight are ignored.
pub fn read_demand(
    model_dir: &Path,
    period_scenarios: &IndexMap<PeriodScenario, WeightTriple>,
    load_levels: &IndexMap<LoadLevelID, Option<Hours>>,
    nodes: &NodeMap,
) -> Result<DemandMap> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let demand_csv = read_csv(&file_path)?;
    read_demand_from_iter(demand_csv, period_scenarios, load_levels, nodes)
        .with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(
    iter: I,
    period_scenarios: &IndexMap<PeriodScenario, WeightTriple>,
    load_levels: &IndexMap<LoadLevelID, Option<Hours>>,
    nodes: &NodeMap,
) -> Result<DemandMap>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut demand = DemandMap::new();
    let mut ignored = Vec::new();
    for raw in iter {
        let scenario: ScenarioID = raw.scenario.as_str().into();
        if !period_scenarios.contains_key(&(raw.period, scenario.clone())) {
            ignored.push(format!("{}/{}", raw.period, raw.scenario));
            continue;
        }

        let (load_level, _) = load_levels
            .get_key_value(raw.load_level.as_str())
            .with_context(|| format!("Unknown load level {}", raw.load_level))?;
        let (node, _) = nodes
            .get_key_value(raw.node.as_str())
            .with_context(|| format!("Unknown node {}", raw.node))?;
        ensure!(
            raw.demand.is_finite() && raw.demand >= Power(0.0),
            "Demand at node {} in load level {} must be a finite number greater than or equal to zero",
            raw.node,
            raw.load_level
        );

        let key: (u32, ScenarioID, LoadLevelID, NodeID) =
            (raw.period, scenario, load_level.clone(), node.clone());
        ensure!(
            demand.insert(key, raw.demand).is_none(),
            "Duplicate demand entry for period {}, scenario {}, load level {}, node {}",
            raw.period,
            raw.scenario,
            raw.load_level,
            raw.node
        );
    }

    if !ignored.is_empty() {
        warn!(
            "Demand given for periods/scenarios without weight, which will be ignored: {}",
            format_items_with_cap(ignored, 5)
        );
    }

    Ok(demand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::nodes;
    use crate::units::Dimensionless;
    use rstest::{fixture, rstest};

    #[fixture]
    fn period_scenarios() -> IndexMap<PeriodScenario, WeightTriple> {
        IndexMap::from([(
            (2020, "sc1".into()),
            WeightTriple::from_input(Dimensionless(1.0), Dimensionless(1.0)),
        )])
    }

    #[fixture]
    fn load_levels() -> IndexMap<LoadLevelID, Option<Hours>> {
        IndexMap::from([("n1".into(), Some(Hours(1.0)))])
    }

    fn raw(period: u32, node: &str, demand: f64) -> DemandRaw {
        DemandRaw {
            period,
            scenario: "sc1".into(),
            load_level: "n1".into(),
            node: node.into(),
            demand: Power(demand),
        }
    }

    #[rstest]
    fn read_demand_from_iter_works(
        period_scenarios: IndexMap<PeriodScenario, WeightTriple>,
        load_levels: IndexMap<LoadLevelID, Option<Hours>>,
        nodes: NodeMap,
    ) {
        let rows = [raw(2020, "north", 80.0), raw(2030, "north", 90.0)];
        let demand =
            read_demand_from_iter(rows.into_iter(), &period_scenarios, &load_levels, &nodes)
                .unwrap();
        assert_eq!(demand.len(), 1);
        assert_eq!(
            demand[&(
                2020,
                ScenarioID::from("sc1"),
                LoadLevelID::from("n1"),
                NodeID::from("north")
            )],
            Power(80.0)
        );
    }

    #[rstest]
    #[case(vec![raw(2020, "east", 1.0)])]
    #[case(vec![raw(2020, "north", -1.0)])]
    #[case(vec![raw(2020, "north", 1.0), raw(2020, "north", 2.0)])]
    fn read_demand_invalid(
        #[case] rows: Vec<DemandRaw>,
        period_scenarios: IndexMap<PeriodScenario, WeightTriple>,
        load_levels: IndexMap<LoadLevelID, Option<Hours>>,
        nodes: NodeMap,
    ) {
        assert!(
            read_demand_from_iter(rows.into_iter(), &period_scenarios, &load_levels, &nodes)
                .is_err()
        );
    }
}
