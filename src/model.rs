//! The model represents the static input data provided by the user.
use crate::system::PowerSystem;
use crate::universe::IndexUniverse;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{InvestmentMode, ModelParameters, TechnologyOutput};

/// Model definition
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Periods, scenarios, stages, load levels and candidate sets
    pub universe: IndexUniverse,
    /// Nodes, units, lines and demand
    pub system: PowerSystem,
}

impl Model {
    /// The name of the case, taken from the model folder's name
    pub fn case_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "case".to_string())
    }

    /// Whether the next solve can be restricted to a single stage.
    ///
    /// This is the case when no candidate set requires an integer investment decision, i.e.
    /// every set of candidates is either empty or relaxed.
    pub fn stages_solved_in_isolation(&self) -> bool {
        self.parameters.all_relaxed_or_absent(
            !self.universe.candidate_units.is_empty(),
            !self.universe.retirement_units.is_empty(),
            !self.universe.candidate_lines.is_empty(),
        )
    }
}
