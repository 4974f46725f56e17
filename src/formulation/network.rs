//! Line switching and flow limits.
use super::problem::Problem;
use super::{StageContext, VariableMap};
use crate::units::UnitType;

/// Add switching columns for switchable lines
pub fn add_switching_variables(problem: &mut Problem, vars: &mut VariableMap, ctx: &StageContext) {
    let period = ctx.key.period;
    for line in ctx.model.system.lines.values().filter(|line| line.switching) {
        let invest = vars.line_invest.get(&(period, line.id.clone())).copied();
        for load_level in ctx.load_levels() {
            let on = problem.add_integer_column(
                ctx.name("line_on", load_level, &line.id),
                0.0..=1.0,
                0.0,
                ctx.scope(load_level),
            );
            vars.line_on.insert(ctx.op_key(load_level, &line.id), on);

            // A candidate line can only be switched on once built
            if let Some(invest) = invest {
                problem.add_row(
                    ctx.name("line_on_built", load_level, &line.id),
                    ..=0.0,
                    [(on, 1.0), (invest, -1.0)],
                    ctx.scope(load_level),
                );
            }
        }
    }
}

/// Limit flows on lines which are switchable or candidates by their status.
///
/// Flows on other lines are limited by their column bounds alone.
pub fn add_flow_limits(problem: &mut Problem, vars: &VariableMap, ctx: &StageContext) {
    let period = ctx.key.period;
    for line in ctx.model.system.lines.values() {
        let ttc = line.ttc.value();
        for load_level in ctx.load_levels() {
            let key = ctx.op_key(load_level, &line.id);
            let status = vars
                .line_on
                .get(&key)
                .or_else(|| vars.line_invest.get(&(period, line.id.clone())))
                .copied();
            let Some(status) = status else {
                continue;
            };

            let flow = vars.flow[&key];
            problem.add_row(
                ctx.name("flow_max", load_level, &line.id),
                ..=0.0,
                [(flow, 1.0), (status, -ttc)],
                ctx.scope(load_level),
            );
            problem.add_row(
                ctx.name("flow_min", load_level, &line.id),
                0.0..,
                [(flow, 1.0), (status, ttc)],
                ctx.scope(load_level),
            );
        }
    }
}
