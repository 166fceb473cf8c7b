use super::config::OutputConfig;
use super::hypothesis::{Scenario, ScenarioSet};
use crate::grid::{GridError, GridEvaluator, GridSummary, GridValue, RetentionGrid};
use crate::output::{
    PlotError, TableError, render_curves, render_surface, write_curves, write_grid, write_matrix,
};
use crate::types::RegimeViolation;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Plot(#[from] PlotError),
    #[error("Failed to prepare output location: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parameters are outside their documented regimes: {}", join_violations(.0))]
    Regime(Vec<RegimeViolation>),
}

fn join_violations(violations: &[RegimeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Receives each evaluated grid. Implementations decide where results go.
pub trait ScenarioSink {
    fn consume(&mut self, scenario: &Scenario, grid: &RetentionGrid) -> Result<(), ScenarioError>;
}

/// Writes the row table, and optionally the matrix and a surface plot, per scenario.
pub struct FileSink {
    directory: PathBuf,
    file_prefix: String,
    matrix: bool,
    plot: Option<GridValue>,
}

impl FileSink {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            directory: output.directory.clone(),
            file_prefix: output.file_prefix.clone(),
            matrix: output.matrix,
            plot: output.plots.then_some(output.plot_value),
        }
    }

    /// Path of the row table written for `scenario`.
    pub fn table_path(&self, scenario: &Scenario) -> PathBuf {
        self.directory
            .join(format!("{}.csv", scenario.file_stem(&self.file_prefix)))
    }
}

impl ScenarioSink for FileSink {
    fn consume(&mut self, scenario: &Scenario, grid: &RetentionGrid) -> Result<(), ScenarioError> {
        fs::create_dir_all(&self.directory)?;
        let stem = scenario.file_stem(&self.file_prefix);

        let table = self.table_path(scenario);
        write_grid(&table, grid.rows())?;
        log::info!("Wrote {} rows to {}", grid.len(), table.display());

        if self.matrix {
            let path = self.directory.join(format!("{stem}_matrix.csv"));
            write_matrix(&path, grid.pratio_matrix().view())?;
        }
        if let Some(value) = self.plot {
            let path = self.directory.join(format!("{stem}.svg"));
            render_surface(&path, &scenario.title(), grid.rows(), value)?;
        }
        Ok(())
    }
}

/// Keeps every grid in memory, in the order received.
#[derive(Default)]
pub struct MemorySink {
    pub grids: Vec<(Scenario, RetentionGrid)>,
}

impl ScenarioSink for MemorySink {
    fn consume(&mut self, scenario: &Scenario, grid: &RetentionGrid) -> Result<(), ScenarioError> {
        self.grids.push((*scenario, grid.clone()));
        Ok(())
    }
}

/// Observer for reporting progress through a scenario batch.
pub trait ScenarioProgress {
    fn on_batch_start(&mut self, total: usize) {
        let _ = total;
    }
    fn on_scenario_finish(&mut self, scenario: &Scenario, succeeded: bool) {
        let _ = (scenario, succeeded);
    }
    fn on_batch_finish(&mut self) {}
}

#[derive(Default)]
pub struct NoopScenarioProgress;

impl ScenarioProgress for NoopScenarioProgress {}

/// What happened to one scenario of a batch.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub result: Result<GridSummary, ScenarioError>,
}

impl ScenarioOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(summary) => write!(
                f,
                "{}: pratio in [{:.6}, {:.6}]",
                self.scenario.title(),
                summary.min_pratio,
                summary.max_pratio
            ),
            Err(e) => write!(f, "{}: failed: {e}", self.scenario.title()),
        }
    }
}

/// Evaluates a batch of scenarios, one grid at a time.
///
/// A failing scenario is recorded in its outcome and the batch moves on.
pub struct ScenarioRunner {
    evaluator: GridEvaluator,
    strict_regimes: bool,
}

impl ScenarioRunner {
    pub fn new(evaluator: GridEvaluator) -> Self {
        Self {
            evaluator,
            strict_regimes: false,
        }
    }

    pub fn with_strict_regimes(mut self, strict: bool) -> Self {
        self.strict_regimes = strict;
        self
    }

    pub fn evaluator(&self) -> &GridEvaluator {
        &self.evaluator
    }

    /// Warns about out-of-regime parameters, or rejects them in strict mode.
    pub fn check_regimes(&self) -> Result<(), ScenarioError> {
        let violations = self.evaluator.parameters().regime_violations();
        if violations.is_empty() {
            return Ok(());
        }
        if self.strict_regimes {
            return Err(ScenarioError::Regime(violations));
        }
        for violation in &violations {
            log::warn!("{violation}");
        }
        Ok(())
    }

    pub fn run_one(
        &self,
        scenario: &Scenario,
        sink: &mut dyn ScenarioSink,
    ) -> Result<GridSummary, ScenarioError> {
        log::info!("Evaluating {}", scenario.title());
        let grid = self.evaluator.evaluate(&scenario.mixture)?;
        let summary = grid.summary();
        log::info!("{}: minimum pratio {}", grid.mixture(), summary.min_pratio);
        sink.consume(scenario, &grid)?;
        Ok(summary)
    }

    /// Runs every scenario in order. Only the regime check can abort the batch.
    pub fn run(
        &self,
        set: &ScenarioSet,
        sink: &mut dyn ScenarioSink,
        progress: &mut dyn ScenarioProgress,
    ) -> Result<Vec<ScenarioOutcome>, ScenarioError> {
        self.check_regimes()?;
        progress.on_batch_start(set.len());
        let mut outcomes = Vec::with_capacity(set.len());
        for scenario in set.scenarios() {
            let result = self.run_one(scenario, sink);
            if let Err(e) = &result {
                log::warn!("Scenario {} failed: {e}", scenario.title());
            }
            progress.on_scenario_finish(scenario, result.is_ok());
            outcomes.push(ScenarioOutcome {
                scenario: *scenario,
                result,
            });
        }
        progress.on_batch_finish();
        Ok(outcomes)
    }

    /// Writes the three category survival curves on the grid axis as a table
    /// and, when `plot` is set, as a line chart.
    pub fn write_curves(
        &self,
        output: &OutputConfig,
        title: &str,
    ) -> Result<Vec<PathBuf>, ScenarioError> {
        fs::create_dir_all(&output.directory)?;
        let curves = self.evaluator.curves()?;
        let table = output
            .directory
            .join(format!("{}survival_curves.csv", output.file_prefix));
        write_curves(&table, &curves)?;
        let mut written = vec![table];
        if output.plots {
            let chart = output
                .directory
                .join(format!("{}survival_curves.svg", output.file_prefix));
            render_curves(&chart, title, &curves)?;
            written.push(chart);
        }
        Ok(written)
    }
}
