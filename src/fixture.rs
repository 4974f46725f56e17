//! Fixtures for tests
use crate::model::{Model, ModelParameters};
use crate::system::{DemandMap, GenerationUnit, Line, Node, NodeMap, PowerSystem};
use crate::universe::{IndexUniverse, LoadLevelID, PeriodScenario, StageID};
use crate::units::{Dimensionless, Energy, Hours, Money, MoneyPerEnergy, Power};
use crate::weights::{WeightStore, WeightTriple};
use indexmap::{IndexMap, IndexSet};
use rstest::fixture;
use std::collections::HashSet;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Two periods with two scenarios each, and two stages of two load levels each
#[fixture]
pub fn universe() -> IndexUniverse {
    let periods: IndexSet<u32> = [2020, 2030].into_iter().collect();
    let period_scenarios: IndexSet<PeriodScenario> = [
        (2020, "sc1".into()),
        (2020, "sc2".into()),
        (2030, "sc1".into()),
        (2030, "sc2".into()),
    ]
    .into_iter()
    .collect();
    let stages: IndexSet<StageID> = ["st1".into(), "st2".into()].into_iter().collect();
    let load_levels: IndexSet<LoadLevelID> = ["n1", "n2", "n3", "n4"]
        .into_iter()
        .map(LoadLevelID::from)
        .collect();
    let stage_to_level: HashSet<(StageID, LoadLevelID)> = [
        ("st1", "n1"),
        ("st1", "n2"),
        ("st2", "n3"),
        ("st2", "n4"),
    ]
    .into_iter()
    .map(|(stage, level)| (stage.into(), level.into()))
    .collect();

    IndexUniverse::new(periods, period_scenarios, stages, load_levels, stage_to_level)
}

/// Weights matching [`universe`]
#[fixture]
pub fn weights() -> WeightStore {
    let triple = |w, p| WeightTriple::from_input(Dimensionless(w), Dimensionless(p));
    let stored = IndexMap::from([
        ((2020, "sc1".into()), triple(0.9, 0.6)),
        ((2020, "sc2".into()), triple(0.9, 0.4)),
        ((2030, "sc1".into()), triple(1.0, 0.5)),
        ((2030, "sc2".into()), triple(1.0, 0.5)),
    ]);
    let discounted = IndexMap::from([(2020, Dimensionless(0.9)), (2030, Dimensionless(1.0))]);
    let stage_weight = IndexMap::from([
        ("st1".into(), Dimensionless(1.0)),
        ("st2".into(), Dimensionless(1.0)),
    ]);
    let duration = ["n1", "n2", "n3", "n4"]
        .into_iter()
        .map(|level| (level.into(), Hours(1.0)))
        .collect();

    WeightStore::new(stored, discounted, stage_weight, duration)
}

#[fixture]
pub fn nodes() -> NodeMap {
    ["north", "south"]
        .into_iter()
        .map(|id| {
            let node = Node {
                id: id.into(),
                area: "A1".into(),
            };
            (node.id.clone(), node)
        })
        .collect()
}

/// An existing thermal unit without storage
#[fixture]
pub fn unit() -> GenerationUnit {
    GenerationUnit {
        id: "ccgt1".into(),
        technology: "CCGT".into(),
        node: "north".into(),
        max_power: Power(100.0),
        min_power: Power(20.0),
        variable_cost: MoneyPerEnergy(40.0),
        investment_cost: Money(0.0),
        retirement_cost: Money(0.0),
        ramp_up: None,
        ramp_down: None,
        min_up_time: 1,
        max_storage: Energy(0.0),
        efficiency: Dimensionless(1.0),
        commitment: false,
    }
}

/// A storage unit at the southern node
fn storage_unit() -> GenerationUnit {
    GenerationUnit {
        id: "ess1".into(),
        technology: "Battery".into(),
        node: "south".into(),
        max_power: Power(50.0),
        min_power: Power(0.0),
        variable_cost: MoneyPerEnergy(1.0),
        max_storage: Energy(200.0),
        efficiency: Dimensionless(0.8),
        ..unit()
    }
}

/// Two nodes joined by a single switchable line, with demand at the northern node
#[fixture]
pub fn power_system(nodes: NodeMap, unit: GenerationUnit) -> PowerSystem {
    let line = Line {
        id: Line::make_id(&"north".into(), &"south".into(), "c1"),
        from: "north".into(),
        to: "south".into(),
        circuit: "c1".into(),
        ttc: Power(50.0),
        fixed_cost: Money(0.0),
        switching: true,
    };
    let storage = storage_unit();
    let demand: DemandMap = [
        ((2020, "sc1".into(), "n1".into(), "north".into()), Power(100.0)),
        ((2020, "sc1".into(), "n2".into(), "north".into()), Power(80.0)),
        ((2030, "sc2".into(), "n3".into(), "south".into()), Power(30.0)),
    ]
    .into_iter()
    .collect();

    PowerSystem {
        nodes,
        units: [(unit.id.clone(), unit), (storage.id.clone(), storage)]
            .into_iter()
            .collect(),
        lines: [(line.id.clone(), line)].into_iter().collect(),
        demand,
    }
}

/// A model without any candidates for investment or retirement
#[fixture]
pub fn model(universe: IndexUniverse, power_system: PowerSystem) -> Model {
    Model {
        model_path: PathBuf::from("simple"),
        parameters: ModelParameters::default(),
        universe,
        system: power_system,
    }
}

/// A model in which the thermal unit is a candidate for investment
pub fn candidate_model() -> Model {
    let mut model = model(universe(), power_system(nodes(), unit()));
    let id = unit().id;
    model.system.units[&id].investment_cost = Money(1000.0);
    model.universe = model.universe.with_candidates(
        [id].into_iter().collect(),
        IndexSet::new(),
        IndexSet::new(),
    );

    model
}

/// A model in which the thermal unit has commitment, ramp and minimum up time constraints
pub fn committed_model() -> Model {
    let mut model = model(universe(), power_system(nodes(), unit()));
    let unit = &mut model.system.units[&unit().id];
    unit.commitment = true;
    unit.min_up_time = 2;
    unit.ramp_up = Some(Power(30.0));
    unit.ramp_down = Some(Power(30.0));

    model
}
