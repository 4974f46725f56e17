//! Unit commitment, ramping and minimum up time.
use super::problem::Problem;
use super::{StageContext, VariableMap};
use crate::units::UnitType;

/// Add commitment columns for committed units and bound their output by them
pub fn add_commitment_constraints(
    problem: &mut Problem,
    vars: &mut VariableMap,
    ctx: &StageContext,
) {
    let period = ctx.key.period;
    for unit in ctx.model.system.units.values().filter(|unit| unit.commitment) {
        let invest = vars.invest.get(&(period, unit.id.clone())).copied();
        let retire = vars.retire.get(&(period, unit.id.clone())).copied();

        for load_level in ctx.load_levels() {
            let scope = ctx.scope(load_level);
            let key = ctx.op_key(load_level, &unit.id);
            let commit = problem.add_integer_column(
                ctx.name("commitment", load_level, &unit.id),
                0.0..=1.0,
                0.0,
                scope.clone(),
            );
            vars.commitment.insert(key.clone(), commit);

            let output = vars.output[&key];
            problem.add_row(
                ctx.name("max_output", load_level, &unit.id),
                ..=0.0,
                [(output, 1.0), (commit, -unit.max_power.value())],
                scope.clone(),
            );
            problem.add_row(
                ctx.name("min_output", load_level, &unit.id),
                0.0..,
                [(output, 1.0), (commit, -unit.min_power.value())],
                scope.clone(),
            );

            // Units can only be committed once built and while not retired
            if let Some(invest) = invest {
                problem.add_row(
                    ctx.name("commit_built", load_level, &unit.id),
                    ..=0.0,
                    [(commit, 1.0), (invest, -1.0)],
                    scope.clone(),
                );
            }
            if let Some(retire) = retire {
                problem.add_row(
                    ctx.name("commit_retired", load_level, &unit.id),
                    ..=1.0,
                    [(commit, 1.0), (retire, 1.0)],
                    scope.clone(),
                );
            }
        }
    }
}

/// Add ramp limits between consecutive load levels and minimum up time for committed units
pub fn add_ramp_constraints(problem: &mut Problem, vars: &mut VariableMap, ctx: &StageContext) {
    let load_levels = ctx.load_levels();

    for unit in ctx.model.system.units.values() {
        for pair in load_levels.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let output_prev = vars.output[&ctx.op_key(previous, &unit.id)];
            let output = vars.output[&ctx.op_key(current, &unit.id)];
            let duration = ctx.duration(current);

            if let Some(ramp_up) = unit.ramp_up {
                problem.add_row(
                    ctx.name("ramp_up", current, &unit.id),
                    ..=ramp_up.value() * duration,
                    [(output, 1.0), (output_prev, -1.0)],
                    ctx.scope(current),
                );
            }
            if let Some(ramp_down) = unit.ramp_down {
                problem.add_row(
                    ctx.name("ramp_down", current, &unit.id),
                    ..=ramp_down.value() * duration,
                    [(output_prev, 1.0), (output, -1.0)],
                    ctx.scope(current),
                );
            }
        }

        if !unit.commitment || unit.min_up_time <= 1 {
            continue;
        }

        // A start-up happens whenever commitment goes from off to on
        let mut startups = Vec::new();
        for pair in load_levels.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let key = ctx.op_key(current, &unit.id);
            let startup = problem.add_column(
                ctx.name("startup", current, &unit.id),
                0.0..=1.0,
                0.0,
                ctx.scope(current),
            );
            vars.startup.insert(key.clone(), startup);
            problem.add_row(
                ctx.name("startup_def", current, &unit.id),
                ..=0.0,
                [
                    (vars.commitment[&key], 1.0),
                    (vars.commitment[&ctx.op_key(previous, &unit.id)], -1.0),
                    (startup, -1.0),
                ],
                ctx.scope(current),
            );
            startups.push(startup);
        }

        // A unit started in the last `min_up_time` load levels must still be on
        let window = unit.min_up_time as usize;
        for (position, load_level) in load_levels.iter().enumerate().skip(1) {
            let first = (position + 1).saturating_sub(window).max(1);
            let terms = startups[first - 1..position]
                .iter()
                .map(|var| (*var, 1.0))
                .chain([(vars.commitment[&ctx.op_key(load_level, &unit.id)], -1.0)]);
            problem.add_row(
                ctx.name("min_up_time", load_level, &unit.id),
                ..=0.0,
                terms,
                ctx.scope(load_level),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{committed_model, weights};
    use crate::formulation::{Formulation, FormulationBlock, StagedProblem};
    use crate::subset::{ActiveSubset, StageFilter};
    use crate::weights::WeightStore;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    fn min_up_time_rows(weights: WeightStore) {
        let model = committed_model();
        let key = model.universe.iter_stage_keys().next().unwrap();
        let subset =
            ActiveSubset::select(&model.universe, &weights, StageFilter::Only(&key.stage)).unwrap();
        let ctx = StageContext {
            model: &model,
            weights: &weights,
            subset: &subset,
            key: &key,
        };

        let mut formulation = Formulation::default();
        formulation.formulate_base(&model, &weights).unwrap();
        for block in FormulationBlock::iter() {
            formulation.formulate_block(block, &ctx).unwrap();
        }

        // Two load levels: one start-up column, for the second load level
        let vars = formulation.variables();
        assert_eq!(vars.commitment.len(), 2);
        assert_eq!(vars.startup.len(), 1);
        let rows = formulation.problem().rows();
        assert!(rows.iter().any(|row| row.name.starts_with("min_up_time(")));
        assert!(rows.iter().any(|row| row.name.starts_with("ramp_up(")));
    }
}
