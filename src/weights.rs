//! The parameter store for time weights.
//!
//! Period weights, scenario probabilities and period probabilities are mutable: the stage
//! controller overrides them while solving a stage in isolation and restores the values read
//! from the input files once every stage has been processed. Stage weights, load-level
//! durations and discounted period weights never change after loading.
use crate::universe::{LoadLevelID, PeriodScenario, ScenarioID, StageID};
use crate::units::{Dimensionless, Hours};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::ops::Deref;

/// The three weights of a (period, scenario) pair which are overridden during isolated solves.
///
/// The period weight is held per pair rather than per period, so every scenario of a period
/// carries its own copy. Isolating one scenario therefore leaves the period weight of its sibling
/// scenarios at their current values. Objectives only read the period probability.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightTriple {
    /// The weight of the period (a per-pair copy)
    pub period_weight: Dimensionless,
    /// The conditional probability of the scenario within the period
    pub scenario_probability: Dimensionless,
    /// The joint probability (`period_weight * scenario_probability`)
    pub period_probability: Dimensionless,
}

impl WeightTriple {
    /// All three weights set to one, so that a single (period, scenario) dominates the objective
    pub const ISOLATED: Self = Self::uniform(1.0);

    /// All three weights set to zero, so that a (period, scenario) drops out of the objective
    pub const EXCLUDED: Self = Self::uniform(0.0);

    const fn uniform(value: f64) -> Self {
        Self {
            period_weight: Dimensionless(value),
            scenario_probability: Dimensionless(value),
            period_probability: Dimensionless(value),
        }
    }

    /// The weights as read from input, with the joint probability derived from the other two
    pub fn from_input(period_weight: Dimensionless, scenario_probability: Dimensionless) -> Self {
        Self {
            period_weight,
            scenario_probability,
            period_probability: period_weight * scenario_probability,
        }
    }
}

/// The weights of periods, scenarios, stages and load levels
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightStore {
    /// The current weights for each (period, scenario)
    current: IndexMap<PeriodScenario, WeightTriple>,
    /// The weights as read from the input files
    stored: IndexMap<PeriodScenario, WeightTriple>,
    /// Discounted period weights, used to scale investment costs
    discounted_period_weight: IndexMap<u32, Dimensionless>,
    /// Stage weights
    stage_weight: IndexMap<StageID, Dimensionless>,
    /// Load level durations. Load levels without a duration are absent.
    duration: IndexMap<LoadLevelID, Hours>,
}

impl WeightStore {
    /// Create a new [`WeightStore`] holding the true weights for every (period, scenario)
    pub fn new(
        stored: IndexMap<PeriodScenario, WeightTriple>,
        discounted_period_weight: IndexMap<u32, Dimensionless>,
        stage_weight: IndexMap<StageID, Dimensionless>,
        duration: IndexMap<LoadLevelID, Hours>,
    ) -> Self {
        Self {
            current: stored.clone(),
            stored,
            discounted_period_weight,
            stage_weight,
            duration,
        }
    }

    /// The current weights for a (period, scenario)
    pub fn triple(&self, period: u32, scenario: &ScenarioID) -> Result<WeightTriple> {
        self.current
            .get(&(period, scenario.clone()))
            .copied()
            .with_context(|| format!("No weights for period {period}, scenario {scenario}"))
    }

    /// The weights for a (period, scenario) as read from the input files
    pub fn stored_triple(&self, period: u32, scenario: &ScenarioID) -> Result<WeightTriple> {
        self.stored
            .get(&(period, scenario.clone()))
            .copied()
            .with_context(|| format!("No weights for period {period}, scenario {scenario}"))
    }

    /// The current joint probability of a (period, scenario), or zero if unknown
    pub fn period_probability(&self, period: u32, scenario: &ScenarioID) -> Dimensionless {
        self.current
            .get(&(period, scenario.clone()))
            .map(|triple| triple.period_probability)
            .unwrap_or_default()
    }

    /// The weight of a stage, or zero if unknown
    pub fn stage_weight(&self, stage: &StageID) -> Dimensionless {
        self.stage_weight.get(stage).copied().unwrap_or_default()
    }

    /// The duration of a load level, if defined
    pub fn duration(&self, load_level: &LoadLevelID) -> Option<Hours> {
        self.duration.get(load_level).copied()
    }

    /// The discounted weight of a period, used for investment costs
    pub fn discounted_period_weight(&self, period: u32) -> Dimensionless {
        self.discounted_period_weight
            .get(&period)
            .copied()
            .unwrap_or_default()
    }

    /// Iterate over the current weights of every (period, scenario)
    pub fn iter_triples(&self) -> impl Iterator<Item = (&PeriodScenario, &WeightTriple)> {
        self.current.iter()
    }

    fn set_triple(&mut self, period: u32, scenario: &ScenarioID, triple: WeightTriple) {
        if let Some(current) = self.current.get_mut(&(period, scenario.clone())) {
            *current = triple;
        }
    }

    /// Give a single (period, scenario) all of the weight until the returned guard is dropped.
    ///
    /// When the guard is dropped, on any exit path, the (period, scenario) weights are set to
    /// zero, so that stages which have already been solved drop out of later objectives.
    pub fn isolate(&mut self, period: u32, scenario: &ScenarioID) -> Result<IsolatedWeights<'_>> {
        // Fail before touching anything if the pair is unknown
        self.triple(period, scenario)?;
        self.set_triple(period, scenario, WeightTriple::ISOLATED);

        Ok(IsolatedWeights {
            store: self,
            period,
            scenario: scenario.clone(),
        })
    }

    /// Restore every (period, scenario) to the weights read from the input files
    pub fn restore_all(&mut self) {
        for (key, triple) in &self.stored {
            if let Some(current) = self.current.get_mut(key) {
                *current = *triple;
            }
        }
    }
}

/// A scoped override of the weights of one (period, scenario).
///
/// Dereferences to the underlying [`WeightStore`] so the weights in effect can be read while the
/// override is active.
#[derive(Debug)]
pub struct IsolatedWeights<'a> {
    store: &'a mut WeightStore,
    period: u32,
    scenario: ScenarioID,
}

impl Deref for IsolatedWeights<'_> {
    type Target = WeightStore;

    fn deref(&self) -> &WeightStore {
        self.store
    }
}

impl Drop for IsolatedWeights<'_> {
    fn drop(&mut self) {
        self.store
            .set_triple(self.period, &self.scenario, WeightTriple::EXCLUDED);
    }
}

/// Calculate the discounted weight of a period.
///
/// A period of weight `w` represents `w` years; the result is the present value, at
/// `base_year`, of one unit of cost incurred in each of those years.
pub fn discounted_weight(
    period: u32,
    weight: Dimensionless,
    annual_discount_rate: Dimensionless,
    base_year: u32,
) -> Dimensionless {
    let r = annual_discount_rate.0;
    if r <= 0.0 {
        return weight;
    }

    let w = weight.0;
    let offset = period as f64 - base_year as f64;
    let numerator = (1.0 + r).powf(w) - 1.0;
    let denominator = r * (1.0 + r).powf(w - 1.0 + offset);

    Dimensionless(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::weights;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[rstest]
    fn isolate_sets_and_resets(mut weights: WeightStore) {
        let scenario: ScenarioID = "sc1".into();
        {
            let guard = weights.isolate(2020, &scenario).unwrap();
            assert_eq!(
                guard.triple(2020, &scenario).unwrap(),
                WeightTriple::ISOLATED
            );
        }
        assert_eq!(
            weights.triple(2020, &scenario).unwrap(),
            WeightTriple::EXCLUDED
        );

        // Other pairs are untouched
        assert_eq!(
            weights.triple(2030, &scenario).unwrap(),
            weights.stored_triple(2030, &scenario).unwrap()
        );
    }

    #[rstest]
    fn isolate_leaves_sibling_scenarios(mut weights: WeightStore) {
        drop(weights.isolate(2020, &"sc1".into()).unwrap());

        let sibling = weights.triple(2020, &"sc2".into()).unwrap();
        assert_eq!(sibling, weights.stored_triple(2020, &"sc2".into()).unwrap());
        assert_eq!(sibling.period_weight, Dimensionless(0.9));
    }

    #[rstest]
    fn isolate_resets_on_panic(mut weights: WeightStore) {
        let scenario: ScenarioID = "sc2".into();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = weights.isolate(2030, &scenario).unwrap();
            panic!("solver crashed");
        }));
        assert!(result.is_err());
        assert_eq!(
            weights.triple(2030, &scenario).unwrap(),
            WeightTriple::EXCLUDED
        );
    }

    #[rstest]
    fn isolate_unknown_pair(mut weights: WeightStore) {
        assert!(weights.isolate(1999, &"sc1".into()).is_err());
    }

    #[rstest]
    fn restore_all_recovers_stored_values(mut weights: WeightStore) {
        for scenario in ["sc1", "sc2"] {
            drop(weights.isolate(2020, &scenario.into()).unwrap());
        }
        weights.restore_all();

        for ((period, scenario), triple) in weights.iter_triples() {
            assert_eq!(*triple, weights.stored_triple(*period, scenario).unwrap());
        }
        assert_eq!(
            weights.triple(2020, &"sc1".into()).unwrap().period_weight,
            Dimensionless(0.9)
        );
    }

    #[test]
    fn from_input_derives_joint_probability() {
        let triple = WeightTriple::from_input(Dimensionless(2.0), Dimensionless(0.25));
        assert_eq!(triple.period_probability, Dimensionless(0.5));
    }

    #[rstest]
    #[case(2020, 1.0, 0.0, 2020, 1.0)]
    #[case(2030, 5.0, 0.0, 2020, 5.0)]
    #[case(2020, 1.0, 0.05, 2020, 1.0)]
    #[case(2021, 1.0, 0.1, 2020, 1.0 / 1.1)]
    #[case(2020, 2.0, 0.1, 2020, 2.1 / 1.1)]
    fn discounted_weight_works(
        #[case] period: u32,
        #[case] weight: f64,
        #[case] rate: f64,
        #[case] base_year: u32,
        #[case] expected: f64,
    ) {
        let result = discounted_weight(
            period,
            Dimensionless(weight),
            Dimensionless(rate),
            base_year,
        );
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-12);
    }
}
