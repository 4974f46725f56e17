//! Storage inventory.
use super::problem::Problem;
use super::{StageContext, VariableMap};
use crate::universe::IndexUniverse;
use crate::units::UnitType;

/// Add inventory columns and balance rows for units with storage.
///
/// Inventories are cyclic within a stage: the first load level follows on from the last.
pub fn add_storage_constraints(problem: &mut Problem, vars: &mut VariableMap, ctx: &StageContext) {
    let load_levels = ctx.load_levels();
    if load_levels.is_empty() {
        return;
    }
    let positions: Vec<usize> = (0..load_levels.len()).collect();

    for unit in ctx.model.system.iter_storage_units() {
        let max_storage = unit.max_storage.value();
        let inventory: Vec<_> = load_levels
            .iter()
            .map(|load_level| {
                let var = problem.add_column(
                    ctx.name("inventory", load_level, &unit.id),
                    0.0..=max_storage,
                    0.0,
                    ctx.scope(load_level),
                );
                vars.inventory.insert(ctx.op_key(load_level, &unit.id), var);
                var
            })
            .collect();

        let invest = vars.invest.get(&(ctx.key.period, unit.id.clone())).copied();
        for (position, load_level) in load_levels.iter().enumerate() {
            let duration = ctx.duration(load_level);
            let previous = IndexUniverse::previous_in(&positions, position);
            let key = ctx.op_key(load_level, &unit.id);
            let output = vars.output[&key];
            let charge = vars.charge[&key];

            problem.add_row(
                ctx.name("inventory_balance", load_level, &unit.id),
                0.0..=0.0,
                [
                    (inventory[position], 1.0),
                    (inventory[previous], -1.0),
                    (charge, -unit.efficiency.value() * duration),
                    (output, duration),
                ],
                ctx.scope(load_level),
            );

            if let Some(invest) = invest {
                problem.add_row(
                    ctx.name("inventory_built", load_level, &unit.id),
                    ..=0.0,
                    [(inventory[position], 1.0), (invest, -max_storage)],
                    ctx.scope(load_level),
                );
            }
        }
    }
}
