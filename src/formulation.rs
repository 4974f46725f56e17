//! Construction of the expansion planning problem, one stage at a time.
//!
//! Investment decisions are added once, before any stage. Each stage then adds its operational
//! blocks, always in the order given by [`FormulationBlock`]. Building a block twice for the same
//! stage is a no-op.
use crate::model::Model;
use crate::subset::ActiveSubset;
use crate::system::{LineID, NodeID, UnitID};
use crate::universe::{LoadLevelID, ScenarioID, StageKey};
use crate::units::UnitType;
use crate::weights::WeightStore;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use strum::{Display, EnumIter};

mod commitment;
mod investment;
mod network;
mod operation;
pub mod problem;
mod storage;
use problem::{Constraint, Problem, Scope, Variable};

/// Operational variables, keyed by period, scenario, load level and entity
pub type OperationVariableMap<T> = IndexMap<(u32, ScenarioID, LoadLevelID, T), Variable>;

/// Investment variables, keyed by period and entity
pub type InvestmentVariableMap<T> = IndexMap<(u32, T), Variable>;

/// The blocks of constraints making up each stage, in the order they are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum FormulationBlock {
    /// Operational columns and their costs
    #[strum(to_string = "objective function")]
    ObjectiveFunction,
    /// Links between operation and investment decisions
    #[strum(to_string = "investment")]
    Investment,
    /// Nodal demand balance
    #[strum(to_string = "demand")]
    Demand,
    /// Storage inventory
    #[strum(to_string = "storage")]
    Storage,
    /// Unit commitment
    #[strum(to_string = "commitment")]
    Commitment,
    /// Ramping and minimum up time
    #[strum(to_string = "ramp and minimum time")]
    RampMinTime,
    /// Line switching
    #[strum(to_string = "network switching")]
    NetworkSwitching,
    /// Line flow limits
    #[strum(to_string = "network operation")]
    NetworkOperation,
}

/// Everything a block needs to know about the stage being built
pub struct StageContext<'a> {
    /// The static model data
    pub model: &'a Model,
    /// The current weights
    pub weights: &'a WeightStore,
    /// The active subset for this stage
    pub subset: &'a ActiveSubset,
    /// The stage being built
    pub key: &'a StageKey,
}

impl<'a> StageContext<'a> {
    /// The active load levels of the stage, in order
    pub fn load_levels(&self) -> Vec<&'a LoadLevelID> {
        self.subset
            .iter_load_levels_of(&self.model.universe, &self.key.stage)
            .map(|(_, load_level)| load_level)
            .collect()
    }

    /// Duration of a load level in hours
    pub fn duration(&self, load_level: &LoadLevelID) -> f64 {
        self.weights
            .duration(load_level)
            .map(|hours| hours.value())
            .unwrap_or_default()
    }

    /// The scope of operational columns and rows for a load level
    pub fn scope(&self, load_level: &LoadLevelID) -> Scope {
        Scope::Operation {
            period: self.key.period,
            scenario: self.key.scenario.clone(),
            factor: self.weights.stage_weight(&self.key.stage).value() * self.duration(load_level),
        }
    }

    /// The key for an operational variable
    pub fn op_key<T: Clone>(&self, load_level: &LoadLevelID, id: &T) -> (u32, ScenarioID, LoadLevelID, T) {
        (
            self.key.period,
            self.key.scenario.clone(),
            load_level.clone(),
            id.clone(),
        )
    }

    /// A name for a column or row
    pub fn name(&self, prefix: &str, load_level: &LoadLevelID, id: &impl std::fmt::Display) -> String {
        format!(
            "{prefix}({},{},{load_level},{id})",
            self.key.period, self.key.scenario
        )
    }
}

/// A problem which is built up stage by stage.
///
/// This is the seam between the stage controller and the concrete problem.
pub trait StagedProblem {
    /// Build the parts of the problem which do not depend on any stage
    fn formulate_base(&mut self, model: &Model, weights: &WeightStore) -> Result<()>;

    /// Build one block of one stage. Must be idempotent.
    fn formulate_block(&mut self, block: FormulationBlock, ctx: &StageContext) -> Result<()>;

    /// Write the problem built so far to an LP file
    fn write_lp(&self, path: &Path, title: &str, weights: &WeightStore) -> Result<()>;
}

/// The variables of the problem
#[derive(Debug, Default, Clone)]
pub struct VariableMap {
    /// Power output of units
    pub output: OperationVariableMap<UnitID>,
    /// Charging power of storage units
    pub charge: OperationVariableMap<UnitID>,
    /// Stored energy of storage units
    pub inventory: OperationVariableMap<UnitID>,
    /// Energy not served at nodes
    pub ens: OperationVariableMap<NodeID>,
    /// Power flow on lines
    pub flow: OperationVariableMap<LineID>,
    /// Commitment status of units
    pub commitment: OperationVariableMap<UnitID>,
    /// Start-up of units
    pub startup: OperationVariableMap<UnitID>,
    /// Switching status of lines
    pub line_on: OperationVariableMap<LineID>,
    /// Investment in candidate units
    pub invest: InvestmentVariableMap<UnitID>,
    /// Retirement of units
    pub retire: InvestmentVariableMap<UnitID>,
    /// Investment in candidate lines
    pub line_invest: InvestmentVariableMap<LineID>,
}

/// The expansion planning problem
#[derive(Debug, Default)]
pub struct Formulation {
    problem: Problem,
    variables: VariableMap,
    balance_rows: OperationConstraintMap,
    built: HashSet<(StageKey, FormulationBlock)>,
    base_built: bool,
}

/// Rows keyed by period, scenario, load level and node
pub type OperationConstraintMap = IndexMap<(u32, ScenarioID, LoadLevelID, NodeID), Constraint>;

impl Formulation {
    /// The problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// The problem, for recording solutions
    pub fn problem_mut(&mut self) -> &mut Problem {
        &mut self.problem
    }

    /// The variables of the problem
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// The demand balance rows, whose duals are marginal costs
    pub fn balance_rows(&self) -> &OperationConstraintMap {
        &self.balance_rows
    }

    /// The solved value of a variable, or zero if it was never solved
    pub fn value(&self, var: Variable) -> f64 {
        self.problem.value(var).unwrap_or_default()
    }
}

impl StagedProblem for Formulation {
    fn formulate_base(&mut self, model: &Model, weights: &WeightStore) -> Result<()> {
        if self.base_built {
            return Ok(());
        }
        investment::add_investment_variables(&mut self.problem, &mut self.variables, model, weights);
        self.base_built = true;

        Ok(())
    }

    fn formulate_block(&mut self, block: FormulationBlock, ctx: &StageContext) -> Result<()> {
        if !self.built.insert((ctx.key.clone(), block)) {
            debug!("Block {block} already built for {}", ctx.key);
            return Ok(());
        }

        let problem = &mut self.problem;
        let vars = &mut self.variables;
        match block {
            FormulationBlock::ObjectiveFunction => operation::add_operation_variables(problem, vars, ctx),
            FormulationBlock::Investment => investment::add_investment_limits(problem, vars, ctx),
            FormulationBlock::Demand => {
                operation::add_balance_constraints(problem, vars, &mut self.balance_rows, ctx)
            }
            FormulationBlock::Storage => storage::add_storage_constraints(problem, vars, ctx),
            FormulationBlock::Commitment => commitment::add_commitment_constraints(problem, vars, ctx),
            FormulationBlock::RampMinTime => commitment::add_ramp_constraints(problem, vars, ctx),
            FormulationBlock::NetworkSwitching => network::add_switching_variables(problem, vars, ctx),
            FormulationBlock::NetworkOperation => network::add_flow_limits(problem, vars, ctx),
        }

        Ok(())
    }

    fn write_lp(&self, path: &Path, title: &str, weights: &WeightStore) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Could not create LP file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.problem
            .write_lp(&mut writer, title, weights)
            .with_context(|| format!("Could not write LP file {}", path.display()))
    }
}
