//! A growing linear (mixed-integer) problem with named columns and rows.
//!
//! The problem is shared by every stage: blocks append columns and rows, and solved values are
//! written back into it. Objective coefficients of operation columns are not fixed when the
//! column is added. They are evaluated against the weights in effect at solve time, which is how
//! stages solved in isolation come to ignore every other (period, scenario).
use crate::universe::{PeriodScenario, ScenarioID};
use crate::weights::WeightStore;
use anyhow::Result;
use std::io::Write;
use std::ops::{Bound, RangeBounds};

/// A column of the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

/// A row of the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint(usize);

impl Variable {
    /// The index of the column in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

impl Constraint {
    /// The index of the row in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which part of the time structure a column or row belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Not tied to any (period, scenario), e.g. investment decisions
    Global,
    /// Tied to one (period, scenario) and load level
    Operation {
        /// The period
        period: u32,
        /// The scenario
        scenario: ScenarioID,
        /// Stage weight times load-level duration
        factor: f64,
    },
}

impl Scope {
    /// Whether this belongs to the given (period, scenario)
    fn belongs_to(&self, period_scenario: &PeriodScenario) -> bool {
        match self {
            Scope::Global => false,
            Scope::Operation {
                period, scenario, ..
            } => *period == period_scenario.0 && *scenario == period_scenario.1,
        }
    }

    /// The weight applied to costs in this scope, given the current weights
    fn weight(&self, weights: &WeightStore) -> f64 {
        match self {
            Scope::Global => 1.0,
            Scope::Operation {
                period,
                scenario,
                factor,
            } => weights.period_probability(*period, scenario).0 * factor,
        }
    }
}

/// A column (decision variable)
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name used in LP files
    pub name: String,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Whether the column must take an integer value
    pub integer: bool,
    /// Unweighted cost
    pub cost: f64,
    /// The scope of the column
    pub scope: Scope,
}

/// A row (constraint)
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Name used in LP files
    pub name: String,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Coefficients of the columns in the row
    pub terms: Vec<(Variable, f64)>,
    /// The scope of the row
    pub scope: Scope,
}

/// Which part of the problem a solve covers
#[derive(Debug, Clone, PartialEq)]
pub enum SolveScope {
    /// A single (period, scenario), solved in isolation
    Isolated(PeriodScenario),
    /// Every (period, scenario) at once
    Horizon,
}

/// The problem under construction together with the latest solution
#[derive(Debug, Default, Clone)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
    values: Vec<Option<f64>>,
    duals: Vec<Option<f64>>,
}

fn bounds_to_pair<R: RangeBounds<f64>>(bounds: R) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}

impl Problem {
    fn push_column<R: RangeBounds<f64>>(
        &mut self,
        name: String,
        bounds: R,
        cost: f64,
        scope: Scope,
        integer: bool,
    ) -> Variable {
        let (lower, upper) = bounds_to_pair(bounds);
        self.columns.push(Column {
            name,
            lower,
            upper,
            integer,
            cost,
            scope,
        });
        self.values.push(None);

        Variable(self.columns.len() - 1)
    }

    /// Add a continuous column
    pub fn add_column<R: RangeBounds<f64>>(
        &mut self,
        name: String,
        bounds: R,
        cost: f64,
        scope: Scope,
    ) -> Variable {
        self.push_column(name, bounds, cost, scope, false)
    }

    /// Add an integer column
    pub fn add_integer_column<R: RangeBounds<f64>>(
        &mut self,
        name: String,
        bounds: R,
        cost: f64,
        scope: Scope,
    ) -> Variable {
        self.push_column(name, bounds, cost, scope, true)
    }

    /// Add a row
    pub fn add_row<R, I>(&mut self, name: String, bounds: R, terms: I, scope: Scope) -> Constraint
    where
        R: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = bounds_to_pair(bounds);
        self.rows.push(Row {
            name,
            lower,
            upper,
            terms: terms.into_iter().collect(),
            scope,
        });
        self.duals.push(None);

        Constraint(self.rows.len() - 1)
    }

    /// The columns of the problem
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows of the problem
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether any column is integer
    pub fn has_integer_columns(&self) -> bool {
        self.columns.iter().any(|col| col.integer)
    }

    /// The objective coefficient of a column under the given weights
    pub fn objective_coefficient(&self, var: Variable, weights: &WeightStore) -> f64 {
        let column = &self.columns[var.0];
        column.cost * column.scope.weight(weights)
    }

    /// Iterate over the objective coefficients of all columns under the given weights
    pub fn iter_objective_coefficients<'a>(
        &'a self,
        weights: &'a WeightStore,
    ) -> impl Iterator<Item = f64> + 'a {
        (0..self.columns.len()).map(move |idx| self.objective_coefficient(Variable(idx), weights))
    }

    /// The solved value of a column, if it has been solved
    pub fn value(&self, var: Variable) -> Option<f64> {
        self.values[var.0]
    }

    /// The dual value of a row, if it has been solved.
    ///
    /// Duals of operation rows are divided by the weight of the row's scope at solve time, so
    /// that they are expressed per unit rather than per weighted unit.
    pub fn dual(&self, constraint: Constraint) -> Option<f64> {
        self.duals[constraint.0]
    }

    /// Store the solution of a solve covering `scope`.
    ///
    /// Values of columns and duals of rows outside `scope` are left as they were. Global columns
    /// are always updated.
    pub fn record_solution(
        &mut self,
        scope: &SolveScope,
        values: &[f64],
        duals: &[f64],
        weights: &WeightStore,
    ) {
        let in_scope = |item: &Scope| match scope {
            SolveScope::Horizon => true,
            SolveScope::Isolated(period_scenario) => {
                *item == Scope::Global || item.belongs_to(period_scenario)
            }
        };

        for (idx, column) in self.columns.iter().enumerate() {
            if in_scope(&column.scope) {
                if let Some(value) = values.get(idx) {
                    self.values[idx] = Some(*value);
                }
            }
        }

        for (idx, row) in self.rows.iter().enumerate() {
            if !in_scope(&row.scope) {
                continue;
            }
            if let Some(dual) = duals.get(idx) {
                let weight = row.scope.weight(weights);
                self.duals[idx] = Some(if weight == 0.0 { 0.0 } else { dual / weight });
            }
        }
    }

    /// Fix the operation columns of a (period, scenario) at their solved values
    pub fn fix_solved(&mut self, period_scenario: &PeriodScenario) {
        for (column, value) in self.columns.iter_mut().zip(&self.values) {
            if let Some(value) = value
                && column.scope.belongs_to(period_scenario)
            {
                column.lower = *value;
                column.upper = *value;
            }
        }
    }

    /// Write the problem in CPLEX LP format, with objective coefficients for the given weights
    pub fn write_lp<W: Write>(&self, out: &mut W, title: &str, weights: &WeightStore) -> Result<()> {
        writeln!(out, "\\ {title}")?;
        writeln!(out, "Minimize")?;
        write!(out, " obj:")?;
        for (idx, column) in self.columns.iter().enumerate() {
            let coeff = self.objective_coefficient(Variable(idx), weights);
            if coeff != 0.0 {
                write!(out, " {} {}", signed(coeff), lp_name(&column.name))?;
            }
        }
        writeln!(out)?;

        writeln!(out, "Subject To")?;
        for row in self.rows.iter().filter(|row| !row.terms.is_empty()) {
            let expr = row
                .terms
                .iter()
                .map(|(var, coeff)| format!("{} {}", signed(*coeff), lp_name(&self.columns[var.0].name)))
                .collect::<Vec<_>>()
                .join(" ");
            let name = lp_name(&row.name);
            if row.lower == row.upper {
                writeln!(out, " {name}: {expr} = {}", row.lower)?;
            } else {
                if row.lower.is_finite() {
                    writeln!(out, " {name}_lo: {expr} >= {}", row.lower)?;
                }
                if row.upper.is_finite() {
                    writeln!(out, " {name}_up: {expr} <= {}", row.upper)?;
                }
            }
        }

        writeln!(out, "Bounds")?;
        for column in &self.columns {
            let name = lp_name(&column.name);
            if column.lower == column.upper {
                writeln!(out, " {name} = {}", column.lower)?;
            } else if !column.lower.is_finite() && !column.upper.is_finite() {
                writeln!(out, " {name} free")?;
            } else {
                writeln!(
                    out,
                    " {} <= {name} <= {}",
                    lp_bound(column.lower),
                    lp_bound(column.upper)
                )?;
            }
        }

        let integers: Vec<_> = self
            .columns
            .iter()
            .filter(|col| col.integer)
            .map(|col| lp_name(&col.name))
            .collect();
        if !integers.is_empty() {
            writeln!(out, "Generals")?;
            for name in integers {
                writeln!(out, " {name}")?;
            }
        }
        writeln!(out, "End")?;

        Ok(())
    }
}

/// Format a coefficient with an explicit sign
fn signed(coeff: f64) -> String {
    if coeff < 0.0 {
        format!("- {}", -coeff)
    } else {
        format!("+ {coeff}")
    }
}

/// Format a bound, writing infinities the way LP readers expect
fn lp_bound(bound: f64) -> String {
    if bound == f64::INFINITY {
        "+inf".to_string()
    } else if bound == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        bound.to_string()
    }
}

/// Replace characters which are not allowed in LP names
fn lp_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
