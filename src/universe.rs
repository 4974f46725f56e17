//! The index universe: every period, scenario, stage and load level in a case.
//!
//! The universe is built once when the case is loaded and never changes afterwards. Everything
//! that varies during a run (active subsets, weights) refers back into it by index.
use crate::id::define_id_type;
use crate::system::{LineID, UnitID};
use indexmap::IndexSet;
use itertools::iproduct;
use std::collections::HashSet;
use std::fmt;

define_id_type! {ScenarioID}
define_id_type! {StageID}
define_id_type! {LoadLevelID}

/// A (period, scenario) pair
pub type PeriodScenario = (u32, ScenarioID);

/// The combination of period, scenario and stage being formulated or solved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageKey {
    /// The period (year)
    pub period: u32,
    /// The scenario within the period
    pub scenario: ScenarioID,
    /// The stage within the period
    pub stage: StageID,
}

impl StageKey {
    /// Create a new [`StageKey`]
    pub fn new(period: u32, scenario: &ScenarioID, stage: &StageID) -> Self {
        Self {
            period,
            scenario: scenario.clone(),
            stage: stage.clone(),
        }
    }

    /// The (period, scenario) pair this stage belongs to
    pub fn period_scenario(&self) -> PeriodScenario {
        (self.period, self.scenario.clone())
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Period {}, Scenario {}, Stage {}",
            self.period, self.scenario, self.stage
        )
    }
}

/// All the index sets of a case.
///
/// Sets are ordered by their order in the input files, which is also the order in which stages
/// are formulated.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexUniverse {
    /// Periods with non-zero weight
    pub periods: IndexSet<u32>,
    /// (period, scenario) pairs with non-zero probability, periods outermost
    pub period_scenarios: IndexSet<PeriodScenario>,
    /// All stages, including those with zero weight
    pub stages: IndexSet<StageID>,
    /// All load levels
    pub load_levels: IndexSet<LoadLevelID>,
    /// Which load levels belong to which stage
    stage_to_level: HashSet<(StageID, LoadLevelID)>,
    /// Generating units which are candidates for investment (`gc`)
    pub candidate_units: IndexSet<UnitID>,
    /// Generating units which are candidates for retirement (`gd`)
    pub retirement_units: IndexSet<UnitID>,
    /// Lines which are candidates for investment (`lc`)
    pub candidate_lines: IndexSet<LineID>,
}

impl IndexUniverse {
    /// Create a new [`IndexUniverse`].
    ///
    /// The stage-to-load-level relation cannot be modified after this point.
    pub fn new(
        periods: IndexSet<u32>,
        period_scenarios: IndexSet<PeriodScenario>,
        stages: IndexSet<StageID>,
        load_levels: IndexSet<LoadLevelID>,
        stage_to_level: HashSet<(StageID, LoadLevelID)>,
    ) -> Self {
        Self {
            periods,
            period_scenarios,
            stages,
            load_levels,
            stage_to_level,
            ..Default::default()
        }
    }

    /// Add the candidate decision sets
    pub fn with_candidates(
        self,
        candidate_units: IndexSet<UnitID>,
        retirement_units: IndexSet<UnitID>,
        candidate_lines: IndexSet<LineID>,
    ) -> Self {
        Self {
            candidate_units,
            retirement_units,
            candidate_lines,
            ..self
        }
    }

    /// Whether the given (stage, load level) pair is in the stage-to-load-level relation
    pub fn contains_stage_level(&self, stage: &StageID, load_level: &LoadLevelID) -> bool {
        self.stage_to_level
            .contains(&(stage.clone(), load_level.clone()))
    }

    /// Whether any load level belongs to the given stage
    pub fn stage_has_load_levels(&self, stage: &StageID) -> bool {
        self.stage_to_level.iter().any(|(st, _)| st == stage)
    }

    /// Iterate over the scenarios of a given period
    pub fn iter_scenarios(&self, period: u32) -> impl Iterator<Item = &ScenarioID> {
        self.period_scenarios
            .iter()
            .filter(move |(p, _)| *p == period)
            .map(|(_, scenario)| scenario)
    }

    /// Iterate over every (period, scenario, stage) in formulation order.
    ///
    /// Periods and scenarios are outermost, stages innermost, each in input order.
    pub fn iter_stage_keys(&self) -> impl Iterator<Item = StageKey> + '_ {
        iproduct!(self.period_scenarios.iter(), self.stages.iter())
            .map(|((period, scenario), stage)| StageKey::new(*period, scenario, stage))
    }

    /// The final (period, scenario, stage) of the formulation order, if any
    pub fn last_stage_key(&self) -> Option<StageKey> {
        let (period, scenario) = self.period_scenarios.last()?;
        let stage = self.stages.last()?;

        Some(StageKey::new(*period, scenario, stage))
    }

    /// The index of the load level preceding `load_level` within the given list, wrapping round
    pub fn previous_in(load_levels: &[usize], position: usize) -> usize {
        if position == 0 {
            load_levels[load_levels.len() - 1]
        } else {
            load_levels[position - 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::universe;
    use itertools::assert_equal;
    use rstest::rstest;

    #[rstest]
    fn iter_stage_keys_order(universe: IndexUniverse) {
        let keys = universe.iter_stage_keys().map(|key| {
            (
                key.period,
                key.scenario.to_string(),
                key.stage.to_string(),
            )
        });
        assert_equal(
            keys,
            [
                (2020, "sc1".to_string(), "st1".to_string()),
                (2020, "sc1".to_string(), "st2".to_string()),
                (2020, "sc2".to_string(), "st1".to_string()),
                (2020, "sc2".to_string(), "st2".to_string()),
                (2030, "sc1".to_string(), "st1".to_string()),
                (2030, "sc1".to_string(), "st2".to_string()),
                (2030, "sc2".to_string(), "st1".to_string()),
                (2030, "sc2".to_string(), "st2".to_string()),
            ],
        );
    }

    #[rstest]
    fn last_stage_key_is_last_of_iteration(universe: IndexUniverse) {
        assert_eq!(
            universe.last_stage_key(),
            universe.iter_stage_keys().last()
        );
    }

    #[rstest]
    fn stage_membership(universe: IndexUniverse) {
        assert!(universe.contains_stage_level(&"st1".into(), &"n1".into()));
        assert!(!universe.contains_stage_level(&"st1".into(), &"n3".into()));
        assert!(universe.stage_has_load_levels(&"st2".into()));
        assert!(!universe.stage_has_load_levels(&"st3".into()));
    }

    #[test]
    fn previous_in_wraps() {
        let levels = [4, 5, 6];
        assert_eq!(IndexUniverse::previous_in(&levels, 0), 6);
        assert_eq!(IndexUniverse::previous_in(&levels, 2), 5);
    }

    #[rstest]
    fn iter_scenarios_for_period(universe: IndexUniverse) {
        assert_equal(
            universe.iter_scenarios(2030).map(ToString::to_string),
            ["sc1".to_string(), "sc2".to_string()],
        );
    }
}
