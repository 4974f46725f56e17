//! Selection of the active stages and load levels.
//!
//! The active subset is recomputed from scratch for every stage and once more after the staged
//! loop. It holds indices into the [`IndexUniverse`] rather than copies of the IDs.
use crate::universe::{IndexUniverse, LoadLevelID, StageID};
use crate::weights::WeightStore;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};

/// Which stages to activate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageFilter<'a> {
    /// Every stage with weight and load levels
    All,
    /// A single stage
    Only(&'a StageID),
}

/// The active stages and load levels, as indices into the universe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveSubset {
    stages: Vec<usize>,
    load_levels: Vec<usize>,
}

impl ActiveSubset {
    /// Select the active stages and load levels for the given filter.
    ///
    /// A stage is active if it has a non-zero weight, at least one load level and matches the
    /// filter. A load level is active if it has a duration and belongs to an active stage. Order
    /// follows the universe.
    pub fn select(
        universe: &IndexUniverse,
        weights: &WeightStore,
        filter: StageFilter,
    ) -> Result<Self> {
        let stages: Vec<usize> = universe
            .stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| {
                weights.stage_weight(stage) != Dimensionless(0.0)
                    && universe.stage_has_load_levels(stage)
                    && match filter {
                        StageFilter::All => true,
                        StageFilter::Only(target) => *stage == target,
                    }
            })
            .map(|(idx, _)| idx)
            .collect();

        let load_levels: Vec<usize> = universe
            .load_levels
            .iter()
            .enumerate()
            .filter(|(_, load_level)| {
                weights.duration(load_level).is_some()
                    && stages
                        .iter()
                        .any(|&st| universe.contains_stage_level(&universe.stages[st], load_level))
            })
            .map(|(idx, _)| idx)
            .collect();

        match filter {
            StageFilter::All => {
                ensure!(!stages.is_empty(), "No stage has both a weight and load levels");
            }
            StageFilter::Only(target) => {
                ensure!(
                    stages.is_empty() || !load_levels.is_empty(),
                    "Stage {target} has load levels but none of them has a duration"
                );
            }
        }

        Ok(Self {
            stages,
            load_levels,
        })
    }

    /// Whether no stage is active
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Indices of the active stages
    pub fn stage_indices(&self) -> &[usize] {
        &self.stages
    }

    /// Indices of the active load levels
    pub fn load_level_indices(&self) -> &[usize] {
        &self.load_levels
    }

    /// Iterate over the active stages
    pub fn iter_stages<'a>(
        &'a self,
        universe: &'a IndexUniverse,
    ) -> impl Iterator<Item = &'a StageID> {
        self.stages.iter().map(|&idx| &universe.stages[idx])
    }

    /// Iterate over the active load levels
    pub fn iter_load_levels<'a>(
        &'a self,
        universe: &'a IndexUniverse,
    ) -> impl Iterator<Item = &'a LoadLevelID> {
        self.load_levels.iter().map(|&idx| &universe.load_levels[idx])
    }

    /// Iterate over the active load levels belonging to one stage
    pub fn iter_load_levels_of<'a>(
        &'a self,
        universe: &'a IndexUniverse,
        stage: &'a StageID,
    ) -> impl Iterator<Item = (usize, &'a LoadLevelID)> {
        self.load_levels
            .iter()
            .map(|&idx| (idx, &universe.load_levels[idx]))
            .filter(move |(_, load_level)| universe.contains_stage_level(stage, load_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, universe, weights};
    use crate::universe::PeriodScenario;
    use crate::weights::WeightTriple;
    use indexmap::{IndexMap, IndexSet};
    use itertools::assert_equal;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn select_single_stage(universe: IndexUniverse, weights: WeightStore) {
        let stage: StageID = "st2".into();
        let subset =
            ActiveSubset::select(&universe, &weights, StageFilter::Only(&stage)).unwrap();
        assert_equal(subset.iter_stages(&universe), [&stage]);
        assert_equal(
            subset.iter_load_levels(&universe).map(ToString::to_string),
            ["n3".to_string(), "n4".to_string()],
        );
    }

    #[rstest]
    fn select_all(universe: IndexUniverse, weights: WeightStore) {
        let subset = ActiveSubset::select(&universe, &weights, StageFilter::All).unwrap();
        assert_eq!(subset.stage_indices(), [0, 1]);
        assert_eq!(subset.load_level_indices(), [0, 1, 2, 3]);
    }

    #[rstest]
    fn select_is_idempotent(universe: IndexUniverse, weights: WeightStore) {
        let stage: StageID = "st1".into();
        let first = ActiveSubset::select(&universe, &weights, StageFilter::Only(&stage)).unwrap();
        let second =
            ActiveSubset::select(&universe, &weights, StageFilter::Only(&stage)).unwrap();
        assert_eq!(first, second);

        // Selecting a different stage in between does not leak into the result
        let other: StageID = "st2".into();
        ActiveSubset::select(&universe, &weights, StageFilter::Only(&other)).unwrap();
        let third = ActiveSubset::select(&universe, &weights, StageFilter::Only(&stage)).unwrap();
        assert_eq!(first, third);
    }

    /// A universe with three stages: a weighted one, a zero-weight one and one without levels
    fn awkward_universe() -> (IndexUniverse, WeightStore) {
        let periods: IndexSet<u32> = [2020].into_iter().collect();
        let period_scenarios: IndexSet<PeriodScenario> =
            [(2020, "sc1".into())].into_iter().collect();
        let stages: IndexSet<StageID> = ["a".into(), "b".into(), "c".into()].into_iter().collect();
        let load_levels: IndexSet<LoadLevelID> =
            ["n1".into(), "n2".into(), "n3".into()].into_iter().collect();
        let s2n: HashSet<(StageID, LoadLevelID)> = [
            ("a".into(), "n1".into()),
            ("a".into(), "n2".into()),
            ("b".into(), "n3".into()),
        ]
        .into_iter()
        .collect();
        let universe = IndexUniverse::new(periods, period_scenarios, stages, load_levels, s2n);

        let weights = WeightStore::new(
            IndexMap::from([(
                (2020, "sc1".into()),
                WeightTriple::from_input(Dimensionless(1.0), Dimensionless(1.0)),
            )]),
            IndexMap::from([(2020, Dimensionless(1.0))]),
            IndexMap::from([
                ("a".into(), Dimensionless(1.0)),
                ("b".into(), Dimensionless(0.0)),
                ("c".into(), Dimensionless(1.0)),
            ]),
            IndexMap::from([("n1".into(), crate::units::Hours(1.0))]),
        );

        (universe, weights)
    }

    #[test]
    fn select_skips_unusable_stages() {
        let (universe, weights) = awkward_universe();

        // Zero weight
        let b: StageID = "b".into();
        assert!(
            ActiveSubset::select(&universe, &weights, StageFilter::Only(&b))
                .unwrap()
                .is_empty()
        );

        // No load levels
        let c: StageID = "c".into();
        assert!(
            ActiveSubset::select(&universe, &weights, StageFilter::Only(&c))
                .unwrap()
                .is_empty()
        );

        // Load level without duration is dropped
        let a: StageID = "a".into();
        let subset = ActiveSubset::select(&universe, &weights, StageFilter::Only(&a)).unwrap();
        assert_eq!(subset.load_level_indices(), [0]);
    }

    #[test]
    fn select_stage_without_durations() {
        let (universe, _) = awkward_universe();
        let weights = WeightStore::new(
            IndexMap::from([(
                (2020, "sc1".into()),
                WeightTriple::from_input(Dimensionless(1.0), Dimensionless(1.0)),
            )]),
            IndexMap::new(),
            IndexMap::from([("a".into(), Dimensionless(1.0))]),
            IndexMap::new(),
        );
        let a: StageID = "a".into();
        assert_error!(
            ActiveSubset::select(&universe, &weights, StageFilter::Only(&a)),
            "Stage a has load levels but none of them has a duration"
        );
    }

    #[test]
    fn select_all_without_stages() {
        let (universe, _) = awkward_universe();
        let weights = WeightStore::default();
        assert_error!(
            ActiveSubset::select(&universe, &weights, StageFilter::All),
            "No stage has both a weight and load levels"
        );
    }
}
