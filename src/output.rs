//! Writing results and other run information to file.
use crate::model::TechnologyOutput;
use crate::output::results::SolvedModel;
use crate::output::table::write_rows;
use anyhow::{Context, Result, ensure};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, IntoEnumIterator};

pub mod graph;
pub mod metadata;
pub mod results;
pub mod table;

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path, results_root: PathBuf) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([results_root, model_name.into()].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Directory exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The families of results which can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ResultKind {
    /// Investment, retirement and line investment decisions
    Investment,
    /// Output of generating units
    GenerationOperation,
    /// Operation of energy storage
    EssOperation,
    /// Deviation of net output and demand from their means
    Flexibility,
    /// Reserve margins
    Reliability,
    /// Line flows and energy not served
    NetworkOperation,
    /// A graph of the network
    NetworkMap,
    /// Energy totals
    OperationSummary,
    /// Weighted costs
    CostSummary,
    /// Marginal costs of demand
    Marginal,
    /// Revenues, costs and profits
    Economic,
}

/// Which families of results are written.
///
/// Each toggle is independent of the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultToggles {
    investment: bool,
    generation_operation: bool,
    ess_operation: bool,
    flexibility: bool,
    reliability: bool,
    network_operation: bool,
    network_map: bool,
    operation_summary: bool,
    cost_summary: bool,
    marginal: bool,
    economic: bool,
}

impl ResultToggles {
    /// Every family of results
    pub fn detailed() -> Self {
        let mut toggles = Self::default();
        for kind in ResultKind::iter() {
            toggles.set(kind, true);
        }

        toggles
    }

    /// Investment, generation, storage, network and operation summary results only
    pub fn summary() -> Self {
        Self {
            investment: true,
            generation_operation: true,
            ess_operation: true,
            network_operation: true,
            operation_summary: true,
            ..Self::default()
        }
    }

    /// The detailed set if `output_results` is on, else the summary set
    pub fn from_output_results(output_results: bool) -> Self {
        if output_results {
            Self::detailed()
        } else {
            Self::summary()
        }
    }

    fn flag_mut(&mut self, kind: ResultKind) -> &mut bool {
        match kind {
            ResultKind::Investment => &mut self.investment,
            ResultKind::GenerationOperation => &mut self.generation_operation,
            ResultKind::EssOperation => &mut self.ess_operation,
            ResultKind::Flexibility => &mut self.flexibility,
            ResultKind::Reliability => &mut self.reliability,
            ResultKind::NetworkOperation => &mut self.network_operation,
            ResultKind::NetworkMap => &mut self.network_map,
            ResultKind::OperationSummary => &mut self.operation_summary,
            ResultKind::CostSummary => &mut self.cost_summary,
            ResultKind::Marginal => &mut self.marginal,
            ResultKind::Economic => &mut self.economic,
        }
    }

    /// Turn a family of results on or off
    pub fn set(&mut self, kind: ResultKind, enabled: bool) {
        *self.flag_mut(kind) = enabled;
    }

    /// Whether a family of results is written
    pub fn is_enabled(mut self, kind: ResultKind) -> bool {
        *self.flag_mut(kind)
    }
}

/// How much detail is written for the families of results which support it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailLevels {
    /// Per unit and/or per technology generation results
    pub technology: TechnologyOutput,
    /// Whether results are also aggregated per area
    pub area: bool,
    /// Whether pivoted tables for plotting are written
    pub plot: bool,
}

/// Something which writes a family of results
pub trait ResultSink {
    /// Write one family of results
    fn write(&mut self, kind: ResultKind) -> Result<()>;
}

/// Write every family of results which is enabled, in a fixed order
pub fn dispatch_results<S: ResultSink>(toggles: &ResultToggles, sink: &mut S) -> Result<()> {
    for kind in ResultKind::iter().filter(|kind| toggles.is_enabled(*kind)) {
        debug!("Writing {kind} results");
        sink.write(kind)
            .with_context(|| format!("Failed to write {kind} results"))?;
    }

    Ok(())
}

/// Writes results for a solved model as CSV files (and a DOT file for the network map)
pub struct CsvResultWriter<'a, 'm> {
    staged: &'a SolvedModel<'m>,
    output_dir: &'a Path,
    case: String,
    detail: DetailLevels,
}

impl<'a, 'm> CsvResultWriter<'a, 'm> {
    /// Create a new writer, with detail levels taken from the model parameters
    pub fn new(staged: &'a SolvedModel<'m>, output_dir: &'a Path) -> Self {
        let params = &staged.model.parameters;
        Self {
            staged,
            output_dir,
            case: staged.model.case_name(),
            detail: DetailLevels {
                technology: params.technology_output,
                area: params.area_output,
                plot: params.plot_output,
            },
        }
    }

    fn file_path(&self, name: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{name}_{}.{extension}", self.case))
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.file_path(name, "csv")
    }

    fn write_investment(&self) -> Result<()> {
        let staged = self.staged;
        write_rows(&self.csv_path("investment"), results::investment_rows(staged))?;
        if self.detail.technology.per_technology() {
            results::technology_investment(staged)
                .write(&self.csv_path("investment_technology"))?;
        }
        if self.detail.plot {
            results::investment_plot(staged).write(&self.csv_path("investment_plot"))?;
        }

        Ok(())
    }

    fn write_generation(&self) -> Result<()> {
        let staged = self.staged;
        if self.detail.technology.per_unit() {
            write_rows(
                &self.csv_path("generation_unit"),
                results::generation_rows(staged),
            )?;
        }
        if self.detail.technology.per_technology() {
            results::technology_generation(staged)
                .write(&self.csv_path("generation_technology"))?;
        }
        if self.detail.area {
            results::area_generation(staged).write(&self.csv_path("generation_area"))?;
        }
        if self.detail.plot {
            results::generation_plot(staged).write(&self.csv_path("generation_plot"))?;
        }

        Ok(())
    }

    fn write_storage(&self) -> Result<()> {
        write_rows(&self.csv_path("ess"), results::storage_rows(self.staged))?;
        if self.detail.technology.per_technology() {
            results::technology_inventory(self.staged)
                .write(&self.csv_path("ess_inventory_technology"))?;
        }

        Ok(())
    }

    fn write_flexibility(&self) -> Result<()> {
        results::technology_flexibility(self.staged)
            .write(&self.csv_path("flexibility_technology"))?;
        write_rows(
            &self.csv_path("flexibility_demand"),
            results::demand_flexibility_rows(self.staged),
        )
    }

    fn write_network(&self) -> Result<()> {
        write_rows(&self.csv_path("network_flow"), results::flow_rows(self.staged))?;
        write_rows(&self.csv_path("ens"), results::ens_rows(self.staged))
    }

    fn write_marginal(&self) -> Result<()> {
        write_rows(&self.csv_path("marginal"), results::marginal_rows(self.staged))?;
        if self.detail.plot {
            results::marginal_plot(self.staged).write(&self.csv_path("marginal_plot"))?;
        }

        Ok(())
    }

    fn write_economic(&self) -> Result<()> {
        write_rows(&self.csv_path("economic"), results::economic_rows(self.staged))?;
        if self.detail.plot {
            results::economic_plot(self.staged).write(&self.csv_path("economic_plot"))?;
        }

        Ok(())
    }
}

impl ResultSink for CsvResultWriter<'_, '_> {
    fn write(&mut self, kind: ResultKind) -> Result<()> {
        let staged = self.staged;
        match kind {
            ResultKind::Investment => self.write_investment(),
            ResultKind::GenerationOperation => self.write_generation(),
            ResultKind::EssOperation => self.write_storage(),
            ResultKind::Flexibility => self.write_flexibility(),
            ResultKind::Reliability => write_rows(
                &self.csv_path("reliability"),
                results::reliability_rows(staged),
            ),
            ResultKind::NetworkOperation => self.write_network(),
            ResultKind::NetworkMap => {
                graph::write_network_map(staged, &self.file_path("network_map", "dot"))
            }
            ResultKind::OperationSummary => write_rows(
                &self.csv_path("operation_summary"),
                results::operation_summary_rows(staged),
            ),
            ResultKind::CostSummary => {
                write_rows(&self.csv_path("cost_summary"), results::cost_rows(staged))
            }
            ResultKind::Marginal => self.write_marginal(),
            ResultKind::Economic => self.write_economic(),
        }
    }
}

/// Write the enabled families of results for a solved model to `output_dir`
pub fn write_results(
    staged: &SolvedModel,
    output_dir: &Path,
    toggles: &ResultToggles,
) -> Result<()> {
    let mut writer = CsvResultWriter::new(staged, output_dir);
    dispatch_results(toggles, &mut writer)?;
    info!("Results written to {}", output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, weights};
    use crate::model::Model;
    use crate::output::results::tests::solve;
    use crate::weights::WeightStore;
    use anyhow::bail;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::tempdir;

    /// Records the kinds of results it is asked to write
    #[derive(Default)]
    struct RecordingSink {
        written: Vec<ResultKind>,
        fail_at: Option<ResultKind>,
    }

    impl ResultSink for RecordingSink {
        fn write(&mut self, kind: ResultKind) -> Result<()> {
            if self.fail_at == Some(kind) {
                bail!("disk full");
            }
            self.written.push(kind);
            Ok(())
        }
    }

    #[test]
    fn toggles_are_independent() {
        for kind in ResultKind::iter() {
            let mut toggles = ResultToggles::default();
            toggles.set(kind, true);

            let mut sink = RecordingSink::default();
            dispatch_results(&toggles, &mut sink).unwrap();
            assert_eq!(sink.written, [kind]);

            // Turning one toggle off leaves the rest untouched
            let mut toggles = ResultToggles::detailed();
            toggles.set(kind, false);
            let mut sink = RecordingSink::default();
            dispatch_results(&toggles, &mut sink).unwrap();
            assert_eq!(sink.written.len(), 10);
            assert!(!sink.written.contains(&kind));
        }
    }

    #[test]
    fn summary_preset() {
        let mut sink = RecordingSink::default();
        dispatch_results(&ResultToggles::summary(), &mut sink).unwrap();
        assert_eq!(
            sink.written,
            [
                ResultKind::Investment,
                ResultKind::GenerationOperation,
                ResultKind::EssOperation,
                ResultKind::NetworkOperation,
                ResultKind::OperationSummary
            ]
        );
    }

    #[rstest]
    #[case(true, ResultToggles::detailed())]
    #[case(false, ResultToggles::summary())]
    fn from_output_results(#[case] output_results: bool, #[case] expected: ResultToggles) {
        assert_eq!(ResultToggles::from_output_results(output_results), expected);
    }

    #[test]
    fn dispatch_stops_at_first_failure() {
        let mut sink = RecordingSink {
            fail_at: Some(ResultKind::Flexibility),
            ..Default::default()
        };
        let result = dispatch_results(&ResultToggles::detailed(), &mut sink);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to write flexibility results"
        );
        assert_eq!(
            sink.written,
            [
                ResultKind::Investment,
                ResultKind::GenerationOperation,
                ResultKind::EssOperation
            ]
        );
    }

    #[rstest]
    fn write_all_results(model: Model, weights: WeightStore) {
        let staged = solve(&model, weights);
        let dir = tempdir().unwrap();
        write_results(&staged, dir.path(), &ResultToggles::detailed()).unwrap();

        for name in [
            "investment_simple.csv",
            "generation_unit_simple.csv",
            "generation_technology_simple.csv",
            "generation_area_simple.csv",
            "generation_plot_simple.csv",
            "ess_simple.csv",
            "flexibility_demand_simple.csv",
            "reliability_simple.csv",
            "network_flow_simple.csv",
            "ens_simple.csv",
            "network_map_simple.dot",
            "operation_summary_simple.csv",
            "cost_summary_simple.csv",
            "marginal_simple.csv",
            "economic_simple.csv",
            "economic_plot_simple.csv",
        ] {
            assert!(dir.path().join(name).is_file(), "{name} not written");
        }

        let summary =
            fs::read_to_string(dir.path().join("operation_summary_simple.csv")).unwrap();
        assert!(summary.starts_with("period,scenario,demand,generation,consumption,ens\n"));
    }

    #[rstest]
    fn technology_detail_limits_generation_files(mut model: Model, weights: WeightStore) {
        model.parameters.technology_output = TechnologyOutput::Unit;
        model.parameters.plot_output = false;
        let staged = solve(&model, weights);
        let dir = tempdir().unwrap();
        let mut toggles = ResultToggles::default();
        toggles.set(ResultKind::GenerationOperation, true);
        write_results(&staged, dir.path(), &toggles).unwrap();

        assert!(dir.path().join("generation_unit_simple.csv").is_file());
        assert!(!dir.path().join("generation_technology_simple.csv").exists());
        assert!(!dir.path().join("generation_plot_simple.csv").exists());
        assert!(!dir.path().join("investment_simple.csv").exists());
    }

    #[test]
    fn create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        assert!(!create_output_directory(temp_dir.path(), false).unwrap());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn create_output_directory_existing_non_empty_directory(#[case] allow_overwrite: bool) {
        let temp_dir = tempdir().unwrap();
        File::create(temp_dir.path().join("file.csv")).unwrap();

        let result = create_output_directory(temp_dir.path(), allow_overwrite);
        if allow_overwrite {
            assert!(result.unwrap());
            assert!(temp_dir.path().read_dir().unwrap().next().is_none());
        } else {
            assert!(result.is_err());
        }
    }

    #[test]
    fn get_output_dir_uses_model_name() {
        let temp_dir = tempdir().unwrap();
        let model_dir = temp_dir.path().join("simple");
        fs::create_dir(&model_dir).unwrap();

        let output_dir = get_output_dir(&model_dir, PathBuf::from("tepes_results")).unwrap();
        assert_eq!(output_dir, PathBuf::from("tepes_results/simple"));
    }
}
