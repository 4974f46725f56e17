//! Code for reading periods and scenarios from CSV files.
use super::{input_err_msg, is_sorted_and_unique, read_csv};
use crate::universe::{PeriodScenario, ScenarioID};
use crate::units::{Dimensionless, UnitType};
use crate::weights::WeightTriple;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;

const PERIODS_FILE_NAME: &str = "periods.csv";
const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// Tolerance when checking that scenario probabilities sum to one
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, PartialEq, Deserialize)]
struct PeriodRaw {
    period: u32,
    weight: Dimensionless,
}

#[derive(Debug, PartialEq, Deserialize)]
struct ScenarioRaw {
    period: u32,
    scenario: String,
    probability: Dimensionless,
}

/// The periods and scenarios that take part in the run
#[derive(Debug, PartialEq)]
pub struct PeriodData {
    /// Weights of periods with non-zero weight
    pub periods: IndexMap<u32, Dimensionless>,
    /// Weights of (period, scenario) pairs with non-zero probability
    pub period_scenarios: IndexMap<PeriodScenario, WeightTriple>,
}

/// Read periods and scenarios from the specified model directory.
///
/// Periods with zero weight and scenarios with zero probability are dropped.
pub fn read_periods_and_scenarios(model_dir: &Path) -> Result<PeriodData> {
    let file_path = model_dir.join(PERIODS_FILE_NAME);
    let periods_csv = read_csv(&file_path)?;
    let periods = read_periods_from_iter(periods_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(SCENARIOS_FILE_NAME);
    let scenarios_csv = read_csv(&file_path)?;
    let period_scenarios = read_scenarios_from_iter(scenarios_csv, &periods)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(PeriodData {
        periods,
        period_scenarios,
    })
}

fn read_periods_from_iter<I>(iter: I) -> Result<IndexMap<u32, Dimensionless>>
where
    I: Iterator<Item = PeriodRaw>,
{
    let raw = iter.collect_vec();
    let years = raw.iter().map(|period| period.period).collect_vec();
    ensure!(
        is_sorted_and_unique(&years),
        "Periods must be composed of unique values in order"
    );

    for period in &raw {
        ensure!(
            period.weight.is_finite() && period.weight >= Dimensionless(0.0),
            "Weight for period {} must be a finite number greater than or equal to zero",
            period.period
        );
    }

    let (kept, dropped): (Vec<_>, Vec<_>) = raw
        .into_iter()
        .partition(|period| period.weight > Dimensionless(0.0));
    for period in &dropped {
        debug!("Period {} has zero weight and is ignored", period.period);
    }
    ensure!(!kept.is_empty(), "No period has a non-zero weight");

    Ok(kept
        .into_iter()
        .map(|period| (period.period, period.weight))
        .collect())
}

fn read_scenarios_from_iter<I>(
    iter: I,
    periods: &IndexMap<u32, Dimensionless>,
) -> Result<IndexMap<PeriodScenario, WeightTriple>>
where
    I: Iterator<Item = ScenarioRaw>,
{
    let mut by_period: IndexMap<u32, Vec<(ScenarioID, Dimensionless)>> =
        periods.keys().map(|&period| (period, Vec::new())).collect();

    for scenario in iter {
        ensure!(
            scenario.probability.is_finite()
                && scenario.probability >= Dimensionless(0.0)
                && scenario.probability <= Dimensionless(1.0),
            "Probability for scenario {} in period {} must be between zero and one",
            scenario.scenario,
            scenario.period
        );

        // Scenarios of periods without weight are dropped along with the period
        let Some(scenarios) = by_period.get_mut(&scenario.period) else {
            continue;
        };
        let id: ScenarioID = scenario.scenario.into();
        ensure!(
            !scenarios.iter().any(|(existing, _)| *existing == id),
            "Duplicate scenario {id} for period {}",
            scenario.period
        );
        scenarios.push((id, scenario.probability));
    }

    let mut out = IndexMap::new();
    for (period, scenarios) in by_period {
        let total: Dimensionless = scenarios.iter().map(|(_, prob)| *prob).sum();
        if (total.0 - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            warn!("Scenario probabilities for period {period} sum to {total} rather than 1");
        }

        let weight = periods[&period];
        let mut any = false;
        for (scenario, probability) in scenarios {
            if probability == Dimensionless(0.0) {
                debug!("Scenario {scenario} in period {period} has zero probability and is ignored");
                continue;
            }
            any = true;
            out.insert(
                (period, scenario),
                WeightTriple::from_input(weight, probability),
            );
        }
        ensure!(any, "Period {period} has no scenario with a non-zero probability");
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn period(period: u32, weight: f64) -> PeriodRaw {
        PeriodRaw {
            period,
            weight: Dimensionless(weight),
        }
    }

    fn scenario(period: u32, scenario: &str, probability: f64) -> ScenarioRaw {
        ScenarioRaw {
            period,
            scenario: scenario.into(),
            probability: Dimensionless(probability),
        }
    }

    #[test]
    fn read_periods_drops_zero_weight() {
        let raw = [period(2020, 1.0), period(2025, 0.0), period(2030, 5.0)];
        let periods = read_periods_from_iter(raw.into_iter()).unwrap();
        assert_eq!(
            periods,
            IndexMap::from([(2020, Dimensionless(1.0)), (2030, Dimensionless(5.0))])
        );
    }

    #[rstest]
    #[case(vec![period(2030, 1.0), period(2020, 1.0)])]
    #[case(vec![period(2020, 1.0), period(2020, 1.0)])]
    #[case(vec![period(2020, -1.0)])]
    #[case(vec![period(2020, 0.0)])]
    fn read_periods_invalid(#[case] raw: Vec<PeriodRaw>) {
        assert!(read_periods_from_iter(raw.into_iter()).is_err());
    }

    #[test]
    fn read_scenarios_works() {
        let periods = IndexMap::from([(2020, Dimensionless(0.5))]);
        let scenarios = read_scenarios_from_iter(
            [
                scenario(2020, "wet", 0.5),
                scenario(2020, "dry", 0.5),
                scenario(2020, "never", 0.0),
                scenario(2025, "wet", 1.0),
            ]
            .into_iter(),
            &periods,
        )
        .unwrap();

        assert_eq!(scenarios.len(), 2);
        assert_eq!(
            scenarios[&(2020, ScenarioID::from("dry"))],
            WeightTriple {
                period_weight: Dimensionless(0.5),
                scenario_probability: Dimensionless(0.5),
                period_probability: Dimensionless(0.25),
            }
        );
    }

    #[rstest]
    #[case(vec![scenario(2020, "wet", 1.5)])]
    #[case(vec![scenario(2020, "wet", 0.0)])]
    #[case(vec![scenario(2020, "wet", 0.5), scenario(2020, "wet", 0.5)])]
    #[case(vec![])]
    fn read_scenarios_invalid(#[case] raw: Vec<ScenarioRaw>) {
        let periods = IndexMap::from([(2020, Dimensionless(1.0))]);
        assert!(read_scenarios_from_iter(raw.into_iter(), &periods).is_err());
    }
}
