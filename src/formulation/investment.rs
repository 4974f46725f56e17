//! Investment and retirement decisions and their links to operation.
use super::problem::{Problem, Scope, Variable};
use super::{StageContext, VariableMap};
use crate::model::{InvestmentMode, Model};
use crate::units::UnitType;
use crate::weights::WeightStore;

/// Add a decision column for every period, with bounds and integrality following `mode`
fn add_decision(problem: &mut Problem, name: String, mode: InvestmentMode, cost: f64) -> Variable {
    match mode {
        InvestmentMode::NotAllowed => problem.add_column(name, 0.0..=0.0, cost, Scope::Global),
        InvestmentMode::Binary => problem.add_integer_column(name, 0.0..=1.0, cost, Scope::Global),
        InvestmentMode::Relaxed => problem.add_column(name, 0.0..=1.0, cost, Scope::Global),
    }
}

/// Decisions in one period must persist in later periods
fn add_persistence_row(problem: &mut Problem, name: String, earlier: Variable, later: Variable) {
    problem.add_row(
        name,
        ..=0.0,
        [(earlier, 1.0), (later, -1.0)],
        Scope::Global,
    );
}

/// Add investment, retirement and line investment columns for every period.
///
/// Costs are scaled by the discounted weight of the period.
pub fn add_investment_variables(
    problem: &mut Problem,
    vars: &mut VariableMap,
    model: &Model,
    weights: &WeightStore,
) {
    let universe = &model.universe;
    let params = &model.parameters;
    let system = &model.system;

    for &period in &universe.periods {
        let discount = weights.discounted_period_weight(period).value();

        for id in &universe.candidate_units {
            let cost = system.units[id].investment_cost.value() * discount;
            let var = add_decision(
                problem,
                format!("invest({period},{id})"),
                params.generation_investment,
                cost,
            );
            vars.invest.insert((period, id.clone()), var);
        }

        for id in &universe.retirement_units {
            let cost = system.units[id].retirement_cost.value() * discount;
            let var = add_decision(
                problem,
                format!("retire({period},{id})"),
                params.generation_retirement,
                cost,
            );
            vars.retire.insert((period, id.clone()), var);
        }

        for id in &universe.candidate_lines {
            let cost = system.lines[id].fixed_cost.value() * discount;
            let var = add_decision(
                problem,
                format!("line_invest({period},{id})"),
                params.network_investment,
                cost,
            );
            vars.line_invest.insert((period, id.clone()), var);
        }
    }

    for (earlier, later) in universe.periods.iter().zip(universe.periods.iter().skip(1)) {
        for id in &universe.candidate_units {
            add_persistence_row(
                problem,
                format!("invest_persist({later},{id})"),
                vars.invest[&(*earlier, id.clone())],
                vars.invest[&(*later, id.clone())],
            );
        }
        for id in &universe.retirement_units {
            add_persistence_row(
                problem,
                format!("retire_persist({later},{id})"),
                vars.retire[&(*earlier, id.clone())],
                vars.retire[&(*later, id.clone())],
            );
        }
        for id in &universe.candidate_lines {
            add_persistence_row(
                problem,
                format!("line_invest_persist({later},{id})"),
                vars.line_invest[&(*earlier, id.clone())],
                vars.line_invest[&(*later, id.clone())],
            );
        }
    }
}

/// Limit output and charging of candidate units to what has been built, and of retirable units
/// to what has not been retired
pub fn add_investment_limits(problem: &mut Problem, vars: &VariableMap, ctx: &StageContext) {
    let universe = &ctx.model.universe;
    let units = &ctx.model.system.units;
    let period = ctx.key.period;

    for load_level in ctx.load_levels() {
        for id in &universe.candidate_units {
            let max_power = units[id].max_power.value();
            let invest = vars.invest[&(period, id.clone())];
            for (prefix, operation) in [("output", &vars.output), ("charge", &vars.charge)] {
                if let Some(&var) = operation.get(&ctx.op_key(load_level, id)) {
                    problem.add_row(
                        ctx.name(&format!("{prefix}_built"), load_level, id),
                        ..=0.0,
                        [(var, 1.0), (invest, -max_power)],
                        ctx.scope(load_level),
                    );
                }
            }
        }

        for id in &universe.retirement_units {
            let max_power = units[id].max_power.value();
            let retire = vars.retire[&(period, id.clone())];
            for (prefix, operation) in [("output", &vars.output), ("charge", &vars.charge)] {
                if let Some(&var) = operation.get(&ctx.op_key(load_level, id)) {
                    problem.add_row(
                        ctx.name(&format!("{prefix}_retired"), load_level, id),
                        ..=max_power,
                        [(var, 1.0), (retire, max_power)],
                        ctx.scope(load_level),
                    );
                }
            }
        }
    }
}
