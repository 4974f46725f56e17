//! The physical power system: nodes, generating units and transmission lines.
use crate::id::define_id_type;
use crate::universe::{LoadLevelID, ScenarioID};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, Power};
use indexmap::IndexMap;
use std::collections::HashMap;

define_id_type! {NodeID}
define_id_type! {AreaID}
define_id_type! {UnitID}
define_id_type! {TechnologyID}
define_id_type! {LineID}

/// A map of nodes, keyed by ID
pub type NodeMap = IndexMap<NodeID, Node>;

/// A map of generating units, keyed by ID
pub type UnitMap = IndexMap<UnitID, GenerationUnit>;

/// A map of lines, keyed by ID
pub type LineMap = IndexMap<LineID, Line>;

/// Demand for each (period, scenario, load level, node)
pub type DemandMap = HashMap<(u32, ScenarioID, LoadLevelID, NodeID), Power>;

/// A node of the network
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier for the node
    pub id: NodeID,
    /// The area the node belongs to
    pub area: AreaID,
}

/// A generating unit, optionally with storage
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationUnit {
    /// Unique identifier for the unit
    pub id: UnitID,
    /// The technology of the unit (e.g. "CCGT", "Wind")
    pub technology: TechnologyID,
    /// The node the unit is connected to
    pub node: NodeID,
    /// Maximum power output
    pub max_power: Power,
    /// Minimum power output when committed
    pub min_power: Power,
    /// Variable operating cost
    pub variable_cost: MoneyPerEnergy,
    /// Annualised investment cost. Units with a non-zero cost are candidates for investment.
    pub investment_cost: Money,
    /// Annualised retirement cost. Units with a non-zero cost may be retired.
    pub retirement_cost: Money,
    /// Maximum increase of output per hour, if limited
    pub ramp_up: Option<Power>,
    /// Maximum decrease of output per hour, if limited
    pub ramp_down: Option<Power>,
    /// Minimum number of load levels a unit must stay on once started
    pub min_up_time: u32,
    /// Storage capacity (zero for units without storage)
    pub max_storage: Energy,
    /// Round-trip efficiency of charging
    pub efficiency: Dimensionless,
    /// Whether the unit has commitment decisions
    pub commitment: bool,
}

impl GenerationUnit {
    /// Whether the unit is a candidate for investment
    pub fn is_candidate(&self) -> bool {
        self.investment_cost > Money(0.0)
    }

    /// Whether the unit is a candidate for retirement
    pub fn is_retirable(&self) -> bool {
        self.retirement_cost > Money(0.0)
    }

    /// Whether the unit can store energy
    pub fn has_storage(&self) -> bool {
        self.max_storage > Energy(0.0)
    }
}

/// A transmission line (one circuit between two nodes)
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Unique identifier for the line, built from its end nodes and circuit
    pub id: LineID,
    /// Sending node
    pub from: NodeID,
    /// Receiving node
    pub to: NodeID,
    /// Circuit identifier
    pub circuit: String,
    /// Total transfer capacity
    pub ttc: Power,
    /// Annualised fixed cost. Lines with a non-zero cost are candidates for investment.
    pub fixed_cost: Money,
    /// Whether the line can be switched off
    pub switching: bool,
}

impl Line {
    /// Build the ID for a line from its end nodes and circuit
    pub fn make_id(from: &NodeID, to: &NodeID, circuit: &str) -> LineID {
        format!("{from}_{to}_{circuit}").into()
    }

    /// Whether the line is a candidate for investment
    pub fn is_candidate(&self) -> bool {
        self.fixed_cost > Money(0.0)
    }
}

/// Everything in the system which is not indexed by time
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PowerSystem {
    /// Network nodes
    pub nodes: NodeMap,
    /// Generating units
    pub units: UnitMap,
    /// Transmission lines
    pub lines: LineMap,
    /// Demand at each node
    pub demand: DemandMap,
}

impl PowerSystem {
    /// Demand at a node, or zero if none was given
    pub fn demand_at(
        &self,
        period: u32,
        scenario: &ScenarioID,
        load_level: &LoadLevelID,
        node: &NodeID,
    ) -> Power {
        self.demand
            .get(&(period, scenario.clone(), load_level.clone(), node.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Iterate over the units connected to a node
    pub fn iter_units_at<'a>(
        &'a self,
        node: &'a NodeID,
    ) -> impl Iterator<Item = &'a GenerationUnit> {
        self.units.values().filter(move |unit| unit.node == *node)
    }

    /// Iterate over units with storage
    pub fn iter_storage_units(&self) -> impl Iterator<Item = &GenerationUnit> {
        self.units.values().filter(|unit| unit.has_storage())
    }

    /// The area a unit is located in
    pub fn area_of_unit(&self, unit: &GenerationUnit) -> Option<&AreaID> {
        self.nodes.get(&unit.node).map(|node| &node.area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{power_system, unit};
    use rstest::rstest;

    #[rstest]
    fn unit_candidate_flags(unit: GenerationUnit) {
        assert!(!unit.is_candidate());
        assert!(!unit.is_retirable());

        let unit = GenerationUnit {
            investment_cost: Money(10.0),
            ..unit
        };
        assert!(unit.is_candidate());
    }

    #[test]
    fn line_make_id() {
        let id = Line::make_id(&"north".into(), &"south".into(), "c1");
        assert_eq!(id.to_string(), "north_south_c1");
    }

    #[rstest]
    fn demand_at_defaults_to_zero(power_system: PowerSystem) {
        assert_eq!(
            power_system.demand_at(2020, &"sc1".into(), &"n1".into(), &"north".into()),
            Power(100.0)
        );
        assert_eq!(
            power_system.demand_at(2020, &"sc1".into(), &"n1".into(), &"south".into()),
            Power(0.0)
        );
    }
}
