//! Read and validate model parameters from `model.toml`.
//!
//! This module defines the `ModelParameters` struct and helpers for loading and validating the
//! `model.toml` file found in each case directory.
use crate::input::{input_err_msg, read_toml};
use crate::toggle::deserialise_toggle;
use crate::units::{Dimensionless, MoneyPerEnergy, UnitType};
use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// The names of the solvers which can be used
pub const SUPPORTED_SOLVERS: [&str; 1] = ["highs"];

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_solver, String, "highs".to_string());
define_param_default!(default_investment_mode, InvestmentMode, InvestmentMode::Binary);
define_unit_param_default!(default_annual_discount_rate, Dimensionless, 0.0);
define_unit_param_default!(default_ens_cost, MoneyPerEnergy, 10_000.0);
define_param_default!(default_technology_output, TechnologyOutput, TechnologyOutput::Both);
define_param_default!(default_output_flag, bool, true);

/// How investment (or retirement) decisions for a class of candidates are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum InvestmentMode {
    /// No investment is allowed: decisions are fixed at zero
    NotAllowed,
    /// Decisions are binary
    Binary,
    /// Decisions are relaxed to continuous values between zero and one
    Relaxed,
}

impl TryFrom<u8> for InvestmentMode {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::NotAllowed),
            1 => Ok(Self::Binary),
            2 => Ok(Self::Relaxed),
            _ => bail!("Invalid investment mode {value}. Expected 0, 1 or 2"),
        }
    }
}

/// The level of detail for generation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum)]
pub enum TechnologyOutput {
    /// Results per generating unit
    #[string = "unit"]
    Unit,
    /// Results aggregated per technology
    #[string = "technology"]
    Technology,
    /// Both of the above
    #[string = "both"]
    Both,
}

impl TechnologyOutput {
    /// Whether per-unit results are wanted
    pub fn per_unit(self) -> bool {
        matches!(self, Self::Unit | Self::Both)
    }

    /// Whether per-technology results are wanted
    pub fn per_technology(self) -> bool {
        matches!(self, Self::Technology | Self::Both)
    }
}

/// Model parameters as defined in the `model.toml` file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The name of the solver used for every solve
    #[serde(default = "default_solver")]
    pub solver: String,
    /// How generation investment decisions are represented
    #[serde(default = "default_investment_mode")]
    pub generation_investment: InvestmentMode,
    /// How generation retirement decisions are represented
    #[serde(default = "default_investment_mode")]
    pub generation_retirement: InvestmentMode,
    /// How network investment decisions are represented
    #[serde(default = "default_investment_mode")]
    pub network_investment: InvestmentMode,
    /// The annual discount rate applied to investment costs
    #[serde(default = "default_annual_discount_rate")]
    pub annual_discount_rate: Dimensionless,
    /// The year to which costs are discounted. Defaults to the first period.
    #[serde(default)]
    pub economic_base_year: Option<u32>,
    /// The cost of energy not served
    #[serde(default = "default_ens_cost")]
    pub ens_cost: MoneyPerEnergy,
    /// Whether generation results are written per unit, per technology or both
    #[serde(default = "default_technology_output")]
    pub technology_output: TechnologyOutput,
    /// Whether results are also aggregated per area
    #[serde(default = "default_output_flag", deserialize_with = "deserialise_toggle")]
    pub area_output: bool,
    /// Whether pivoted tables suitable for plotting are written
    #[serde(default = "default_output_flag", deserialize_with = "deserialise_toggle")]
    pub plot_output: bool,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            generation_investment: default_investment_mode(),
            generation_retirement: default_investment_mode(),
            network_investment: default_investment_mode(),
            annual_discount_rate: default_annual_discount_rate(),
            economic_base_year: None,
            ens_cost: default_ens_cost(),
            technology_output: default_technology_output(),
            area_output: default_output_flag(),
            plot_output: default_output_flag(),
        }
    }
}

/// Check that the solver is one we can invoke
fn check_solver(solver: &str) -> Result<()> {
    ensure!(
        SUPPORTED_SOLVERS.contains(&solver),
        "Unknown solver '{solver}'. Supported solvers: {}",
        SUPPORTED_SOLVERS.join(", ")
    );

    Ok(())
}

/// Check that the `annual_discount_rate` parameter is valid
fn check_annual_discount_rate(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "annual_discount_rate must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `ens_cost` parameter is valid
fn check_ens_cost(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerEnergy(0.0),
        "ens_cost must be a finite number greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_solver(&self.solver)?;
        check_annual_discount_rate(self.annual_discount_rate)?;
        check_ens_cost(self.ens_cost)?;

        Ok(())
    }

    /// Whether every candidate class is either absent or relaxed.
    ///
    /// Only [`InvestmentMode::Relaxed`] counts as relaxed; a class with no candidates is ignored.
    pub fn all_relaxed_or_absent(
        &self,
        has_generation_candidates: bool,
        has_retirement_candidates: bool,
        has_line_candidates: bool,
    ) -> bool {
        [
            (has_generation_candidates, self.generation_investment),
            (has_retirement_candidates, self.generation_retirement),
            (has_line_candidates, self.network_investment),
        ]
        .into_iter()
        .all(|(present, mode)| !present || mode == InvestmentMode::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_model_toml(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn model_params_from_path_defaults() {
        let dir = tempdir().unwrap();
        write_model_toml(dir.path(), "");

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.solver, "highs");
        assert_eq!(params.generation_investment, InvestmentMode::Binary);
        assert_eq!(params.technology_output, TechnologyOutput::Both);
        assert!(params.area_output);
        assert!(params.plot_output);
    }

    #[test]
    fn model_params_from_path() {
        let dir = tempdir().unwrap();
        write_model_toml(
            dir.path(),
            "generation_investment = 2\nnetwork_investment = 0\n\
             technology_output = \"unit\"\nplot_output = \"No\"\nannual_discount_rate = 0.04",
        );

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.generation_investment, InvestmentMode::Relaxed);
        assert_eq!(params.network_investment, InvestmentMode::NotAllowed);
        assert_eq!(params.technology_output, TechnologyOutput::Unit);
        assert!(!params.plot_output);
        assert_eq!(params.annual_discount_rate, Dimensionless(0.04));
    }

    #[test]
    fn model_params_unknown_solver() {
        let dir = tempdir().unwrap();
        write_model_toml(dir.path(), "solver = \"cplex\"");
        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert!(
            err.chain()
                .any(|cause| cause.to_string() == "Unknown solver 'cplex'. Supported solvers: highs")
        );
    }

    #[rstest]
    #[case("generation_investment = 3")]
    #[case("area_output = \"maybe\"")]
    fn model_params_invalid(#[case] contents: &str) {
        let dir = tempdir().unwrap();
        write_model_toml(dir.path(), contents);
        assert!(ModelParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.05, true)]
    #[case(-0.01, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn check_annual_discount_rate_works(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(
            check_annual_discount_rate(Dimensionless(value)).is_ok(),
            expected_valid
        );
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(0.0, false)]
    #[case(-5.0, false)]
    #[case(f64::INFINITY, false)]
    fn check_ens_cost_works(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_ens_cost(MoneyPerEnergy(value)).is_ok(), expected_valid);
    }

    #[rstest]
    #[case(false, false, false, InvestmentMode::Binary, true)]
    #[case(true, false, false, InvestmentMode::Relaxed, true)]
    #[case(true, false, false, InvestmentMode::Binary, false)]
    #[case(true, false, false, InvestmentMode::NotAllowed, false)]
    #[case(true, true, true, InvestmentMode::Relaxed, true)]
    fn all_relaxed_or_absent_works(
        #[case] gc: bool,
        #[case] gd: bool,
        #[case] lc: bool,
        #[case] mode: InvestmentMode,
        #[case] expected: bool,
    ) {
        let params = ModelParameters {
            generation_investment: mode,
            generation_retirement: mode,
            network_investment: mode,
            ..ModelParameters::default()
        };
        assert_eq!(params.all_relaxed_or_absent(gc, gd, lc), expected);
    }

    /// Each class is checked against its own mode. `None` means the class has no candidates, in
    /// which case its mode is set to binary to check that it is ignored.
    #[rstest]
    #[case(Some(InvestmentMode::Relaxed), None, Some(InvestmentMode::Binary), false)]
    #[case(None, Some(InvestmentMode::Binary), None, false)]
    #[case(Some(InvestmentMode::Relaxed), Some(InvestmentMode::Relaxed), None, true)]
    #[case(Some(InvestmentMode::Relaxed), Some(InvestmentMode::NotAllowed), None, false)]
    #[case(Some(InvestmentMode::Binary), Some(InvestmentMode::Relaxed), None, false)]
    #[case(None, None, Some(InvestmentMode::Relaxed), true)]
    fn all_relaxed_or_absent_mixed_modes(
        #[case] gc: Option<InvestmentMode>,
        #[case] gd: Option<InvestmentMode>,
        #[case] lc: Option<InvestmentMode>,
        #[case] expected: bool,
    ) {
        let params = ModelParameters {
            generation_investment: gc.unwrap_or(InvestmentMode::Binary),
            generation_retirement: gd.unwrap_or(InvestmentMode::Binary),
            network_investment: lc.unwrap_or(InvestmentMode::Binary),
            ..ModelParameters::default()
        };
        assert_eq!(
            params.all_relaxed_or_absent(gc.is_some(), gd.is_some(), lc.is_some()),
            expected
        );
    }
}
