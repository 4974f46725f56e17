//! Operational variables and the nodal demand balance.
use super::problem::Problem;
use super::{OperationConstraintMap, StageContext, VariableMap};
use crate::units::UnitType;
use itertools::chain;

/// Add output, charge, energy-not-served and flow variables, with their costs
pub fn add_operation_variables(problem: &mut Problem, vars: &mut VariableMap, ctx: &StageContext) {
    let system = &ctx.model.system;
    let ens_cost = ctx.model.parameters.ens_cost.value();

    for load_level in ctx.load_levels() {
        let scope = ctx.scope(load_level);

        for unit in system.units.values() {
            let var = problem.add_column(
                ctx.name("output", load_level, &unit.id),
                0.0..=unit.max_power.value(),
                unit.variable_cost.value(),
                scope.clone(),
            );
            vars.output.insert(ctx.op_key(load_level, &unit.id), var);

            if unit.has_storage() {
                let var = problem.add_column(
                    ctx.name("charge", load_level, &unit.id),
                    0.0..=unit.max_power.value(),
                    0.0,
                    scope.clone(),
                );
                vars.charge.insert(ctx.op_key(load_level, &unit.id), var);
            }
        }

        for node in system.nodes.keys() {
            let demand = system
                .demand_at(ctx.key.period, &ctx.key.scenario, load_level, node)
                .value();
            let var = problem.add_column(
                ctx.name("ens", load_level, node),
                0.0..=demand,
                ens_cost,
                scope.clone(),
            );
            vars.ens.insert(ctx.op_key(load_level, node), var);
        }

        for line in system.lines.values() {
            let ttc = line.ttc.value();
            let var = problem.add_column(
                ctx.name("flow", load_level, &line.id),
                -ttc..=ttc,
                0.0,
                scope.clone(),
            );
            vars.flow.insert(ctx.op_key(load_level, &line.id), var);
        }
    }
}

/// Add a demand balance row for every node and load level.
///
/// Output minus charging, plus net imports, plus energy not served equals demand.
pub fn add_balance_constraints(
    problem: &mut Problem,
    vars: &VariableMap,
    balance_rows: &mut OperationConstraintMap,
    ctx: &StageContext,
) {
    let system = &ctx.model.system;

    for load_level in ctx.load_levels() {
        for node in system.nodes.keys() {
            let output = system
                .iter_units_at(node)
                .filter_map(|unit| vars.output.get(&ctx.op_key(load_level, &unit.id)))
                .map(|var| (*var, 1.0));
            let charge = system
                .iter_units_at(node)
                .filter_map(|unit| vars.charge.get(&ctx.op_key(load_level, &unit.id)))
                .map(|var| (*var, -1.0));
            let flows = system.lines.values().filter_map(|line| {
                let var = *vars.flow.get(&ctx.op_key(load_level, &line.id))?;
                if line.to == *node {
                    Some((var, 1.0))
                } else if line.from == *node {
                    Some((var, -1.0))
                } else {
                    None
                }
            });
            let ens = vars
                .ens
                .get(&ctx.op_key(load_level, node))
                .map(|var| (*var, 1.0));

            let demand = system
                .demand_at(ctx.key.period, &ctx.key.scenario, load_level, node)
                .value();
            let row = problem.add_row(
                ctx.name("balance", load_level, node),
                demand..=demand,
                chain!(output, charge, flows, ens),
                ctx.scope(load_level),
            );
            balance_rows.insert(ctx.op_key(load_level, node), row);
        }
    }
}
