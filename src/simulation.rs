//! The stage decomposition controller.
//!
//! Stages are formulated one at a time, periods outermost and stages innermost. After each stage
//! the controller decides whether to solve:
//!
//! * when every class of candidates is absent or relaxed, the (period, scenario) of the stage is
//!   solved on its own, with its weights temporarily set to one;
//! * otherwise only the final stage triggers a solve, over the whole horizon.
//!
//! Once every stage has been processed the weights read from input are restored, so results are
//! reported against the true weights.
use crate::formulation::problem::SolveScope;
use crate::formulation::{FormulationBlock, StageContext, StagedProblem};
use crate::model::Model;
use crate::solver::SolveInvoker;
use crate::subset::{ActiveSubset, StageFilter};
use crate::universe::StageKey;
use crate::weights::WeightStore;
use anyhow::{Context, Result};
use log::{Level, debug, info, log};
use std::path::PathBuf;
use strum::IntoEnumIterator;

/// Options controlling progress reporting and LP file export
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Report progress for every stage at info level and export each stage's LP file
    pub log_console: bool,
    /// The folder LP files are written to
    pub lp_dir: Option<PathBuf>,
}

/// What the controller does once a stage has been formulated
#[derive(Debug, Clone, PartialEq)]
pub enum SolveDecision {
    /// Solve the stage's (period, scenario) on its own
    Isolated,
    /// Solve every (period, scenario) at once
    Horizon,
    /// Do not solve yet
    Skip,
}

/// A model whose stages have all been formulated (and solved), with weights restored
#[derive(Debug)]
pub struct StagedModel<'m, P> {
    /// The static model data
    pub model: &'m Model,
    /// The weights, holding the values read from input
    pub weights: WeightStore,
    /// The formulated and solved problem
    pub problem: P,
    /// The subset of every usable stage and load level
    pub subset: ActiveSubset,
}

/// Drives formulation and solving stage by stage
pub struct StageController<'m, P, S> {
    model: &'m Model,
    weights: WeightStore,
    problem: P,
    solver: S,
    diagnostics: Diagnostics,
}

impl<'m, P, S> StageController<'m, P, S>
where
    P: StagedProblem,
    S: SolveInvoker<P>,
{
    /// Create a new [`StageController`]
    pub fn new(model: &'m Model, weights: WeightStore, problem: P, solver: S) -> Self {
        Self {
            model,
            weights,
            problem,
            solver,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Set the diagnostics options
    pub fn with_diagnostics(self, diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            ..self
        }
    }

    /// The weights currently in effect
    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    /// The problem built so far
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Decide what to do after formulating the given stage
    pub fn decide(&self, key: &StageKey) -> SolveDecision {
        if self.model.stages_solved_in_isolation() {
            SolveDecision::Isolated
        } else if self.model.universe.last_stage_key().as_ref() == Some(key) {
            SolveDecision::Horizon
        } else {
            SolveDecision::Skip
        }
    }

    /// Formulate and solve every stage.
    ///
    /// On error, the weights are left as they were when the error occurred.
    pub fn run_stages(&mut self) -> Result<()> {
        let model = self.model;
        self.problem
            .formulate_base(model, &self.weights)
            .context("Failed to formulate investment decisions")?;

        for key in model.universe.iter_stage_keys() {
            self.formulate_stage(&key)?;
            self.report_progress(&key)?;

            match self.decide(&key) {
                SolveDecision::Isolated => self.solve_isolated(&key)?,
                SolveDecision::Horizon => self.solve_horizon(&key)?,
                SolveDecision::Skip => debug!("No solve needed for {key}"),
            }
        }

        Ok(())
    }

    /// Restore the weights read from input and select every usable stage
    pub fn final_restore(&mut self) -> Result<ActiveSubset> {
        self.weights.restore_all();
        ActiveSubset::select(&self.model.universe, &self.weights, StageFilter::All)
            .context("Failed to select stages for reporting")
    }

    /// Run every stage, then restore the weights.
    ///
    /// The weights are restored whether or not the stages ran successfully.
    pub fn run(mut self) -> Result<StagedModel<'m, P>> {
        let outcome = self.run_stages();
        let subset = self.final_restore();
        outcome?;

        Ok(StagedModel {
            model: self.model,
            weights: self.weights,
            problem: self.problem,
            subset: subset?,
        })
    }

    fn formulate_stage(&mut self, key: &StageKey) -> Result<()> {
        let subset = ActiveSubset::select(
            &self.model.universe,
            &self.weights,
            StageFilter::Only(&key.stage),
        )
        .with_context(|| format!("Failed to select active subset for {key}"))?;
        if subset.is_empty() {
            debug!("{key} has no active load levels");
        }

        let ctx = StageContext {
            model: self.model,
            weights: &self.weights,
            subset: &subset,
            key,
        };
        for block in FormulationBlock::iter() {
            self.problem
                .formulate_block(block, &ctx)
                .with_context(|| format!("Failed to formulate {block} block for {key}"))?;
        }

        Ok(())
    }

    fn report_progress(&self, key: &StageKey) -> Result<()> {
        let level = if self.diagnostics.log_console {
            Level::Info
        } else {
            Level::Debug
        };
        log!(level, "Formulated {key}");

        if !self.diagnostics.log_console {
            return Ok(());
        }
        let Some(lp_dir) = &self.diagnostics.lp_dir else {
            return Ok(());
        };

        let file_name = format!(
            "{}_{}_{}_{}.lp",
            self.model.case_name(),
            key.period,
            key.scenario,
            key.stage
        );
        self.problem
            .write_lp(&lp_dir.join(file_name), &key.to_string(), &self.weights)
    }

    fn solve_isolated(&mut self, key: &StageKey) -> Result<()> {
        let solver_name = &self.model.parameters.solver;
        let scope = SolveScope::Isolated(key.period_scenario());

        // Weights of this (period, scenario) drop to zero once the guard is dropped
        let guard = self.weights.isolate(key.period, &key.scenario)?;
        let result = self
            .solver
            .solve(&mut self.problem, &guard, solver_name, &scope);
        drop(guard);
        result.with_context(|| format!("Failed to solve {key}"))?;
        info!("Solved {key}");

        Ok(())
    }

    fn solve_horizon(&mut self, key: &StageKey) -> Result<()> {
        info!("Solving investment and operation over the whole horizon");
        self.solver
            .solve(
                &mut self.problem,
                &self.weights,
                &self.model.parameters.solver,
                &SolveScope::Horizon,
            )
            .with_context(|| format!("Failed to solve {key}"))?;
        info!("Solved horizon");

        Ok(())
    }
}
