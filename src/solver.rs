//! Invoking the solver on the problem built so far.
use crate::formulation::Formulation;
use crate::formulation::problem::{Problem, SolveScope};
use crate::model::parameters::SUPPORTED_SOLVERS;
use crate::weights::WeightStore;
use anyhow::{Result, ensure};
use highs::{HighsModelStatus, HighsStatus, RowProblem, Sense};
use log::debug;
use std::error::Error;
use std::fmt;

/// Solves a problem of type `P`.
///
/// Implementations must write the solution for `scope` back into the problem.
pub trait SolveInvoker<P> {
    /// Solve the problem with the weights currently in effect
    fn solve(
        &mut self,
        problem: &mut P,
        weights: &WeightStore,
        solver_name: &str,
        scope: &SolveScope,
    ) -> Result<()>;
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Try to solve the model, returning an error if the model is incoherent or result is non-optimal
pub fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Solves problems with HiGHS
#[derive(Debug, Default)]
pub struct HighsSolver {
    /// Whether HiGHS writes its own log to the console
    pub verbose: bool,
}

impl HighsSolver {
    /// Convert the problem into a HiGHS problem.
    ///
    /// If `fixed_integers` is given, integer columns are fixed at those (rounded) values.
    fn build(
        problem: &Problem,
        weights: &WeightStore,
        fixed_integers: Option<&[f64]>,
    ) -> RowProblem {
        let mut highs_problem = RowProblem::default();
        let columns: Vec<_> = problem
            .columns()
            .iter()
            .zip(problem.iter_objective_coefficients(weights))
            .enumerate()
            .map(|(idx, (column, coeff))| {
                match (column.integer, fixed_integers) {
                    (true, Some(values)) => {
                        let value = values[idx].round();
                        highs_problem.add_column(coeff, value..=value)
                    }
                    (true, None) => {
                        highs_problem.add_integer_column(coeff, column.lower..=column.upper)
                    }
                    (false, _) => highs_problem.add_column(coeff, column.lower..=column.upper),
                }
            })
            .collect();

        for row in problem.rows() {
            highs_problem.add_row(
                row.lower..=row.upper,
                row.terms
                    .iter()
                    .map(|(var, coeff)| (columns[var.index()], *coeff)),
            );
        }

        highs_problem
    }

    fn run(&self, highs_problem: RowProblem) -> Result<highs::SolvedModel, ModelError> {
        let mut model = highs_problem.optimise(Sense::Minimise);
        model.set_option("output_flag", self.verbose);
        solve_optimal(model)
    }

    /// Solve the problem, returning column values and row duals.
    ///
    /// For problems with integer columns, duals are taken from a second solve with the integer
    /// columns fixed at their optimal values.
    fn solve_problem(
        &self,
        problem: &Problem,
        weights: &WeightStore,
    ) -> Result<(Vec<f64>, Vec<f64>), ModelError> {
        let solved = self.run(Self::build(problem, weights, None))?;
        debug!("Objective value: {}", solved.objective_value());
        let solution = solved.get_solution();
        let values = solution.columns().to_vec();
        if !problem.has_integer_columns() {
            return Ok((values, solution.dual_rows().to_vec()));
        }

        let fixed = self.run(Self::build(problem, weights, Some(&values)))?;
        let duals = fixed.get_solution().dual_rows().to_vec();

        Ok((values, duals))
    }
}

impl SolveInvoker<Formulation> for HighsSolver {
    fn solve(
        &mut self,
        formulation: &mut Formulation,
        weights: &WeightStore,
        solver_name: &str,
        scope: &SolveScope,
    ) -> Result<()> {
        ensure!(
            SUPPORTED_SOLVERS.contains(&solver_name),
            "Unknown solver '{solver_name}'"
        );

        let (values, duals) = self.solve_problem(formulation.problem(), weights)?;
        let problem = formulation.problem_mut();
        problem.record_solution(scope, &values, &duals, weights);
        if let SolveScope::Isolated(period_scenario) = scope {
            problem.fix_solved(period_scenario);
        }

        Ok(())
    }
}
