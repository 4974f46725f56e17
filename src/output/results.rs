//! Tables of results extracted from a solved problem.
//!
//! Each function reads the solved values (and duals) of a [`StagedModel`] and returns rows ready
//! to be written to file. Nothing here writes to disk.
use super::table::PivotTable;
use crate::formulation::problem::Variable;
use crate::formulation::{Formulation, InvestmentVariableMap, OperationVariableMap};
use crate::simulation::StagedModel;
use crate::system::{AreaID, GenerationUnit, LineID, NodeID, TechnologyID, UnitID};
use crate::universe::{LoadLevelID, ScenarioID};
use crate::units::UnitType;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::hash::Hash;

/// A staged model whose problem is the expansion planning formulation
pub type SolvedModel<'a> = StagedModel<'a, Formulation>;

/// An investment, retirement or line investment decision
#[derive(Debug, Serialize, PartialEq)]
pub struct InvestmentRow {
    period: u32,
    kind: &'static str,
    id: String,
    decision: f64,
    capacity: f64,
}

/// Output of a unit at one load level
#[derive(Debug, Serialize, PartialEq)]
pub struct GenerationRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    unit: UnitID,
    technology: TechnologyID,
    output: f64,
    energy: f64,
    commitment: Option<f64>,
}

/// Operation of a storage unit at one load level
#[derive(Debug, Serialize, PartialEq)]
pub struct StorageRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    unit: UnitID,
    discharge: f64,
    charge: f64,
    inventory: f64,
}

/// System demand at one load level relative to its mean, with energy not served
#[derive(Debug, Serialize, PartialEq)]
pub struct DemandFlexibilityRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    demand: f64,
    demand_flexibility: f64,
    ens: f64,
}

/// Peak demand against available capacity for a (period, scenario)
#[derive(Debug, Serialize, PartialEq)]
pub struct ReliabilityRow {
    period: u32,
    scenario: ScenarioID,
    peak_demand: f64,
    capacity: f64,
    reserve_margin: Option<f64>,
}

/// Flow on a line at one load level
#[derive(Debug, Serialize, PartialEq)]
pub struct FlowRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    line: LineID,
    flow: f64,
    utilisation: f64,
    switched_on: Option<f64>,
}

/// Energy not served at a node and load level
#[derive(Debug, Serialize, PartialEq)]
pub struct EnsRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    node: NodeID,
    ens: f64,
}

/// Energy totals for a (period, scenario)
#[derive(Debug, Serialize, PartialEq)]
pub struct OperationSummaryRow {
    period: u32,
    scenario: ScenarioID,
    demand: f64,
    generation: f64,
    consumption: f64,
    ens: f64,
}

/// A weighted cost. Investment costs have no scenario.
#[derive(Debug, Serialize, PartialEq)]
pub struct CostRow {
    period: u32,
    scenario: Option<ScenarioID>,
    cost_type: &'static str,
    cost: f64,
}

/// The marginal cost of demand at a node and load level
#[derive(Debug, Serialize, PartialEq)]
pub struct MarginalRow {
    period: u32,
    scenario: ScenarioID,
    load_level: LoadLevelID,
    node: NodeID,
    marginal_cost: f64,
}

/// Revenue and cost of generation in an area for a (period, scenario)
#[derive(Debug, Serialize, PartialEq)]
pub struct EconomicRow {
    period: u32,
    scenario: ScenarioID,
    area: String,
    revenue: f64,
    cost: f64,
    profit: f64,
}

type OperationKey<T> = (u32, ScenarioID, LoadLevelID, T);

impl SolvedModel<'_> {
    fn value(&self, var: Variable) -> f64 {
        self.problem.value(var)
    }

    fn value_of<T: Hash + Eq>(
        &self,
        map: &OperationVariableMap<T>,
        key: &OperationKey<T>,
    ) -> Option<f64> {
        map.get(key).map(|var| self.value(*var))
    }

    /// The cost a solved column contributes to the objective, under the restored weights
    fn weighted_cost(&self, var: Variable) -> f64 {
        self.problem
            .problem()
            .objective_coefficient(var, &self.weights)
            * self.value(var)
    }

    fn duration(&self, load_level: &LoadLevelID) -> f64 {
        self.weights
            .duration(load_level)
            .map(|hours| hours.value())
            .unwrap_or_default()
    }

    /// Every (period, scenario, load level) of the reporting subset
    fn points(&self) -> Vec<(u32, &ScenarioID, &LoadLevelID)> {
        let universe = &self.model.universe;
        let load_levels = self.subset.iter_load_levels(universe).collect_vec();
        universe
            .period_scenarios
            .iter()
            .flat_map(|(period, scenario)| {
                load_levels
                    .iter()
                    .map(move |load_level| (*period, scenario, *load_level))
            })
            .collect()
    }

    /// Total demand over all nodes
    fn system_demand(&self, period: u32, scenario: &ScenarioID, load_level: &LoadLevelID) -> f64 {
        let system = &self.model.system;
        system
            .nodes
            .keys()
            .map(|node| system.demand_at(period, scenario, load_level, node).value())
            .sum()
    }

    /// Capacity of a unit in a period, taking investment and retirement into account
    fn unit_capacity(&self, period: u32, unit: &GenerationUnit) -> f64 {
        let vars = self.problem.variables();
        let key = (period, unit.id.clone());
        let built = vars.invest.get(&key).map_or(1.0, |var| self.value(*var));
        let retired = vars.retire.get(&key).map_or(0.0, |var| self.value(*var));

        unit.max_power.value() * built * (1.0 - retired)
    }

    /// The label of the area a result is reported under
    fn area_label(&self, area: Option<&AreaID>) -> String {
        match area {
            Some(area) if self.model.parameters.area_output => area.to_string(),
            _ => "system".to_string(),
        }
    }

    /// The marginal cost at a node, from the dual of its balance row
    fn marginal_cost(&self, key: &OperationKey<NodeID>) -> Option<f64> {
        let row = self.problem.balance_rows().get(key)?;
        self.problem.problem().dual(*row)
    }
}

fn operation_index(period: u32, scenario: &ScenarioID, load_level: &LoadLevelID) -> Vec<String> {
    vec![
        period.to_string(),
        scenario.to_string(),
        load_level.to_string(),
    ]
}

/// Investment, retirement and line investment decisions
pub fn investment_rows(staged: &SolvedModel) -> Vec<InvestmentRow> {
    let vars = staged.problem.variables();
    let system = &staged.model.system;
    let unit_rows = |kind, map: &InvestmentVariableMap<UnitID>| {
        map.iter()
            .map(|((period, id), var)| {
                let decision = staged.value(*var);
                InvestmentRow {
                    period: *period,
                    kind,
                    id: id.to_string(),
                    decision,
                    capacity: decision * system.units[id].max_power.value(),
                }
            })
            .collect_vec()
    };

    let mut rows = unit_rows("generation", &vars.invest);
    rows.extend(unit_rows("retirement", &vars.retire));
    rows.extend(vars.line_invest.iter().map(|((period, id), var)| {
        let decision = staged.value(*var);
        InvestmentRow {
            period: *period,
            kind: "network",
            id: id.to_string(),
            decision,
            capacity: decision * system.lines[id].ttc.value(),
        }
    }));

    rows
}

/// Invested generation capacity per period and technology
pub fn technology_investment(staged: &SolvedModel) -> PivotTable {
    let system = &staged.model.system;
    let mut table = PivotTable::new(&["period"]);
    for ((period, id), var) in &staged.problem.variables().invest {
        let unit = &system.units[id];
        table.add(
            vec![period.to_string()],
            &unit.technology.0,
            staged.value(*var) * unit.max_power.value(),
        );
    }

    table
}

/// Investment decisions per period and unit, for plotting
pub fn investment_plot(staged: &SolvedModel) -> PivotTable {
    let mut table = PivotTable::new(&["period"]);
    for ((period, id), var) in &staged.problem.variables().invest {
        table.add(vec![period.to_string()], &id.0, staged.value(*var));
    }

    table
}

/// Output of every unit at every load level
pub fn generation_rows(staged: &SolvedModel) -> Vec<GenerationRow> {
    let vars = staged.problem.variables();
    let units = &staged.model.system.units;
    vars.output
        .iter()
        .map(|(key, var)| {
            let (period, scenario, load_level, unit) = key;
            let output = staged.value(*var);
            GenerationRow {
                period: *period,
                scenario: scenario.clone(),
                load_level: load_level.clone(),
                unit: unit.clone(),
                technology: units[unit].technology.clone(),
                output,
                energy: output * staged.duration(load_level),
                commitment: staged.value_of(&vars.commitment, key),
            }
        })
        .collect()
}

/// Output per technology at every load level
pub fn technology_generation(staged: &SolvedModel) -> PivotTable {
    let units = &staged.model.system.units;
    let mut table = PivotTable::new(&["period", "scenario", "load_level"]);
    for ((period, scenario, load_level, unit), var) in &staged.problem.variables().output {
        table.add(
            operation_index(*period, scenario, load_level),
            &units[unit].technology.0,
            staged.value(*var),
        );
    }

    table
}

/// Energy generated per area and technology for each (period, scenario)
pub fn area_generation(staged: &SolvedModel) -> PivotTable {
    let system = &staged.model.system;
    let mut table = PivotTable::new(&["period", "scenario", "area"]);
    for ((period, scenario, load_level, id), var) in &staged.problem.variables().output {
        let unit = &system.units[id];
        let index = vec![
            period.to_string(),
            scenario.to_string(),
            staged.area_label(system.area_of_unit(unit)),
        ];
        table.add(
            index,
            &unit.technology.0,
            staged.value(*var) * staged.duration(load_level),
        );
    }

    table
}

/// Output per unit at every load level, for plotting
pub fn generation_plot(staged: &SolvedModel) -> PivotTable {
    let mut table = PivotTable::new(&["period", "scenario", "load_level"]);
    for ((period, scenario, load_level, unit), var) in &staged.problem.variables().output {
        table.add(
            operation_index(*period, scenario, load_level),
            &unit.0,
            staged.value(*var),
        );
    }

    table
}

/// Discharge, charge and inventory of every storage unit at every load level
pub fn storage_rows(staged: &SolvedModel) -> Vec<StorageRow> {
    let vars = staged.problem.variables();
    vars.inventory
        .iter()
        .map(|(key, var)| {
            let (period, scenario, load_level, unit) = key;
            StorageRow {
                period: *period,
                scenario: scenario.clone(),
                load_level: load_level.clone(),
                unit: unit.clone(),
                discharge: staged.value_of(&vars.output, key).unwrap_or_default(),
                charge: staged.value_of(&vars.charge, key).unwrap_or_default(),
                inventory: staged.value(*var),
            }
        })
        .collect()
}

/// Stored energy per technology at every load level
pub fn technology_inventory(staged: &SolvedModel) -> PivotTable {
    let units = &staged.model.system.units;
    let mut table = PivotTable::new(&["period", "scenario", "load_level"]);
    for ((period, scenario, load_level, unit), var) in &staged.problem.variables().inventory {
        table.add(
            operation_index(*period, scenario, load_level),
            &units[unit].technology.0,
            staged.value(*var),
        );
    }

    table
}

/// Net output (output less charge) per technology, relative to its mean over the load levels of
/// each (period, scenario)
pub fn technology_flexibility(staged: &SolvedModel) -> PivotTable {
    let vars = staged.problem.variables();
    let units = &staged.model.system.units;

    let mut net_output: IndexMap<OperationKey<TechnologyID>, f64> = IndexMap::new();
    for (key, var) in &vars.output {
        let (period, scenario, load_level, unit) = key;
        let charge = staged.value_of(&vars.charge, key).unwrap_or_default();
        let key = (
            *period,
            scenario.clone(),
            load_level.clone(),
            units[unit].technology.clone(),
        );
        *net_output.entry(key).or_default() += staged.value(*var) - charge;
    }

    let mut totals: IndexMap<(u32, &ScenarioID, &TechnologyID), (f64, f64)> = IndexMap::new();
    for ((period, scenario, _, technology), value) in &net_output {
        let (sum, count) = totals.entry((*period, scenario, technology)).or_default();
        *sum += value;
        *count += 1.0;
    }

    let mut table = PivotTable::new(&["period", "scenario", "load_level"]);
    for ((period, scenario, load_level, technology), value) in &net_output {
        let (sum, count) = totals[&(*period, scenario, technology)];
        table.add(
            operation_index(*period, scenario, load_level),
            &technology.0,
            value - sum / count,
        );
    }

    table
}

/// System demand relative to its mean over each (period, scenario), with energy not served
pub fn demand_flexibility_rows(staged: &SolvedModel) -> Vec<DemandFlexibilityRow> {
    let vars = staged.problem.variables();
    let nodes = &staged.model.system.nodes;
    let mut rows = Vec::new();

    for ((period, scenario), group) in &staged
        .points()
        .into_iter()
        .chunk_by(|(period, scenario, _)| (*period, *scenario))
    {
        let demands = group
            .map(|(_, _, load_level)| {
                (load_level, staged.system_demand(period, scenario, load_level))
            })
            .collect_vec();
        let mean = demands.iter().map(|(_, demand)| demand).sum::<f64>() / demands.len() as f64;

        for (load_level, demand) in demands {
            let ens = nodes
                .keys()
                .filter_map(|node| {
                    let key = (period, scenario.clone(), load_level.clone(), node.clone());
                    staged.value_of(&vars.ens, &key)
                })
                .sum();
            rows.push(DemandFlexibilityRow {
                period,
                scenario: scenario.clone(),
                load_level: load_level.clone(),
                demand,
                demand_flexibility: demand - mean,
                ens,
            });
        }
    }

    rows
}

/// Peak demand, available capacity and reserve margin for every (period, scenario)
pub fn reliability_rows(staged: &SolvedModel) -> Vec<ReliabilityRow> {
    let universe = &staged.model.universe;
    let load_levels = staged.subset.iter_load_levels(universe).collect_vec();

    universe
        .period_scenarios
        .iter()
        .map(|(period, scenario)| {
            let peak_demand = load_levels
                .iter()
                .map(|load_level| staged.system_demand(*period, scenario, load_level))
                .fold(0.0, f64::max);
            let capacity = staged
                .model
                .system
                .units
                .values()
                .map(|unit| staged.unit_capacity(*period, unit))
                .sum();

            ReliabilityRow {
                period: *period,
                scenario: scenario.clone(),
                peak_demand,
                capacity,
                reserve_margin: (peak_demand > 0.0).then(|| capacity / peak_demand),
            }
        })
        .collect()
}

/// Flows on every line at every load level
pub fn flow_rows(staged: &SolvedModel) -> Vec<FlowRow> {
    let vars = staged.problem.variables();
    let lines = &staged.model.system.lines;
    vars.flow
        .iter()
        .map(|(key, var)| {
            let (period, scenario, load_level, line) = key;
            let flow = staged.value(*var);
            let ttc = lines[line].ttc.value();
            FlowRow {
                period: *period,
                scenario: scenario.clone(),
                load_level: load_level.clone(),
                line: line.clone(),
                flow,
                utilisation: if ttc > 0.0 { flow.abs() / ttc } else { 0.0 },
                switched_on: staged.value_of(&vars.line_on, key),
            }
        })
        .collect()
}

/// Energy not served at every node and load level
pub fn ens_rows(staged: &SolvedModel) -> Vec<EnsRow> {
    staged
        .problem
        .variables()
        .ens
        .iter()
        .map(|((period, scenario, load_level, node), var)| EnsRow {
            period: *period,
            scenario: scenario.clone(),
            load_level: load_level.clone(),
            node: node.clone(),
            ens: staged.value(*var) * staged.duration(load_level),
        })
        .collect()
}

/// The highest utilisation of each line over all load levels
pub fn max_utilisation(staged: &SolvedModel) -> IndexMap<LineID, f64> {
    let mut utilisation: IndexMap<LineID, f64> = staged
        .model
        .system
        .lines
        .keys()
        .map(|line| (line.clone(), 0.0))
        .collect();
    for row in flow_rows(staged) {
        let max = utilisation.entry(row.line).or_default();
        *max = max.max(row.utilisation);
    }

    utilisation
}

/// Demand, generation, storage consumption and energy not served for every (period, scenario)
pub fn operation_summary_rows(staged: &SolvedModel) -> Vec<OperationSummaryRow> {
    let vars = staged.problem.variables();
    let mut rows: IndexMap<(u32, ScenarioID), OperationSummaryRow> = IndexMap::new();
    for (period, scenario, load_level) in staged.points() {
        let row = rows
            .entry((period, scenario.clone()))
            .or_insert_with(|| OperationSummaryRow {
                period,
                scenario: scenario.clone(),
                demand: 0.0,
                generation: 0.0,
                consumption: 0.0,
                ens: 0.0,
            });
        row.demand +=
            staged.system_demand(period, scenario, load_level) * staged.duration(load_level);
    }

    // Energy per (period, scenario) of each operation variable
    fn energy<'a, T>(
        staged: &'a SolvedModel,
        map: &'a OperationVariableMap<T>,
    ) -> impl Iterator<Item = ((u32, ScenarioID), f64)> + 'a {
        map.iter().map(|((period, scenario, load_level, _), var)| {
            (
                (*period, scenario.clone()),
                staged.value(*var) * staged.duration(load_level),
            )
        })
    }

    for (key, energy) in energy(staged, &vars.output) {
        if let Some(row) = rows.get_mut(&key) {
            row.generation += energy;
        }
    }
    for (key, energy) in energy(staged, &vars.charge) {
        if let Some(row) = rows.get_mut(&key) {
            row.consumption += energy;
        }
    }
    for (key, energy) in energy(staged, &vars.ens) {
        if let Some(row) = rows.get_mut(&key) {
            row.ens += energy;
        }
    }

    rows.into_values().collect()
}

/// Weighted operation costs per (period, scenario) and investment costs per period
pub fn cost_rows(staged: &SolvedModel) -> Vec<CostRow> {
    let vars = staged.problem.variables();

    let mut operation: IndexMap<(u32, ScenarioID, &'static str), f64> = IndexMap::new();
    let unit_costs = [("generation", &vars.output), ("startup", &vars.startup)];
    for (cost_type, map) in unit_costs {
        for ((period, scenario, _, _), var) in map {
            *operation
                .entry((*period, scenario.clone(), cost_type))
                .or_default() += staged.weighted_cost(*var);
        }
    }
    for ((period, scenario, _, _), var) in &vars.ens {
        *operation
            .entry((*period, scenario.clone(), "ens"))
            .or_default() += staged.weighted_cost(*var);
    }

    let mut investment: IndexMap<(u32, &'static str), f64> = IndexMap::new();
    let decisions = vars
        .invest
        .iter()
        .map(|((period, _), var)| (*period, "generation_investment", var))
        .chain(
            vars.retire
                .iter()
                .map(|((period, _), var)| (*period, "retirement", var)),
        )
        .chain(
            vars.line_invest
                .iter()
                .map(|((period, _), var)| (*period, "network_investment", var)),
        );
    for (period, cost_type, var) in decisions {
        *investment.entry((period, cost_type)).or_default() += staged.weighted_cost(*var);
    }

    let operation = operation
        .into_iter()
        .map(|((period, scenario, cost_type), cost)| CostRow {
            period,
            scenario: Some(scenario),
            cost_type,
            cost,
        });
    let investment = investment
        .into_iter()
        .map(|((period, cost_type), cost)| CostRow {
            period,
            scenario: None,
            cost_type,
            cost,
        });

    operation.chain(investment).collect()
}

/// The marginal cost at every node and load level
pub fn marginal_rows(staged: &SolvedModel) -> Vec<MarginalRow> {
    staged
        .problem
        .balance_rows()
        .keys()
        .filter_map(|key| {
            let marginal_cost = staged.marginal_cost(key)?;
            let (period, scenario, load_level, node) = key.clone();
            Some(MarginalRow {
                period,
                scenario,
                load_level,
                node,
                marginal_cost,
            })
        })
        .collect()
}

/// Marginal cost per node at every load level, for plotting
pub fn marginal_plot(staged: &SolvedModel) -> PivotTable {
    let mut table = PivotTable::new(&["period", "scenario", "load_level"]);
    for row in marginal_rows(staged) {
        table.add(
            operation_index(row.period, &row.scenario, &row.load_level),
            &row.node.0,
            row.marginal_cost,
        );
    }

    table
}

/// Revenue (output valued at the marginal cost of its node), variable cost and profit of
/// generation per area for every (period, scenario)
pub fn economic_rows(staged: &SolvedModel) -> Vec<EconomicRow> {
    let system = &staged.model.system;
    let mut rows: IndexMap<(u32, ScenarioID, String), EconomicRow> = IndexMap::new();
    for ((period, scenario, load_level, id), var) in &staged.problem.variables().output {
        let unit = &system.units[id];
        let area = staged.area_label(system.area_of_unit(unit));
        let energy = staged.value(*var) * staged.duration(load_level);
        let node_key = (
            *period,
            scenario.clone(),
            load_level.clone(),
            unit.node.clone(),
        );
        let price = staged.marginal_cost(&node_key).unwrap_or_default();

        let row = rows
            .entry((*period, scenario.clone(), area.clone()))
            .or_insert_with(|| EconomicRow {
                period: *period,
                scenario: scenario.clone(),
                area,
                revenue: 0.0,
                cost: 0.0,
                profit: 0.0,
            });
        row.revenue += energy * price;
        row.cost += energy * unit.variable_cost.value();
        row.profit = row.revenue - row.cost;
    }

    rows.into_values().collect()
}

/// Share of the energy generated in each area by technology (%) for every (period, scenario),
/// for plotting
pub fn economic_plot(staged: &SolvedModel) -> PivotTable {
    let system = &staged.model.system;
    let mut energy: IndexMap<Vec<String>, IndexMap<String, f64>> = IndexMap::new();
    for ((period, scenario, load_level, id), var) in &staged.problem.variables().output {
        let unit = &system.units[id];
        let index = vec![
            period.to_string(),
            scenario.to_string(),
            staged.area_label(system.area_of_unit(unit)),
        ];
        *energy
            .entry(index)
            .or_default()
            .entry(unit.technology.to_string())
            .or_default() += staged.value(*var) * staged.duration(load_level);
    }

    let mut table = PivotTable::new(&["period", "scenario", "area"]);
    for (index, by_technology) in energy {
        let total: f64 = by_technology.values().sum();
        for (technology, value) in by_technology {
            let share = if total > 0.0 { 100.0 * value / total } else { 0.0 };
            table.add(index.clone(), &technology, share);
        }
    }

    table
}
