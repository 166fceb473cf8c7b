#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use paralog::grid::{GridValue, TimeIndexing};
use paralog::output::{
    read_grid, render_curves, render_surface, write_curves, write_grid, write_matrix,
};
use paralog::scenario::{
    DEFAULT_MUTATIONAL_OPPORTUNITY_SWITCH, FileSink, Hypothesis, RunConfig, Scenario,
    ScenarioProgress, ScenarioRunner, ScenarioSet,
};
use paralog::types::CategoryMixture;

#[derive(Parser)]
#[command(
    name = "paralog",
    version,
    about = "Duplicate gene retention surfaces under competing retention hypotheses"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate every scenario of a hypothesis and write one table per mixture
    #[command(about = "Run a scenario batch (outputs: one CSV and SVG per mixture)")]
    Run(RunArgs),

    /// Evaluate a single mixture
    #[command(about = "Evaluate one mixture (outputs: row table, optional matrix and plot)")]
    Grid(GridArgs),

    /// Export the category survival curves on the grid axis
    #[command(about = "Write survival curves (outputs: CSV, optional SVG)")]
    Curves(CurvesArgs),

    /// Re-render a surface plot from a saved row table
    #[command(about = "Plot a saved row table as a 3D scatter (outputs: SVG)")]
    Plot(PlotArgs),

    /// Print or save the default run configuration
    #[command(about = "Write the default run configuration as TOML")]
    Config(ConfigArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HypothesisCli {
    Independence,
    Duplicability,
    MutationalOpportunity,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum IndexingCli {
    FromFirstStep,
    FromOrigin,
}

impl From<IndexingCli> for TimeIndexing {
    fn from(value: IndexingCli) -> Self {
        match value {
            IndexingCli::FromFirstStep => TimeIndexing::FromFirstStep,
            IndexingCli::FromOrigin => TimeIndexing::FromOrigin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PlotValueCli {
    Pratio,
    LogPratio,
}

impl From<PlotValueCli> for GridValue {
    fn from(value: PlotValueCli) -> Self {
        match value {
            PlotValueCli::Pratio => GridValue::Pratio,
            PlotValueCli::LogPratio => GridValue::LogPratio,
        }
    }
}

/// Model settings shared by every evaluating subcommand.
#[derive(Args)]
pub struct ModelArgs {
    /// TOML run configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of points on each time axis
    #[arg(long, value_name = "N")]
    pub time_points: Option<usize>,

    /// Number of series terms in the survival integral
    #[arg(long, value_name = "N")]
    pub truncation: Option<usize>,

    /// Whether the time axis starts at the first step or at the origin
    #[arg(long, value_enum)]
    pub indexing: Option<IndexingCli>,

    /// Reject parameters outside their documented regimes
    #[arg(long)]
    pub strict_regimes: bool,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Retention hypothesis to evaluate
    #[arg(long, value_enum)]
    pub hypothesis: Option<HypothesisCli>,

    /// Fraction of Alt_func-retained duplicates that behave like Non by t2
    #[arg(long, value_name = "FRACTION")]
    pub switch: Option<f64>,

    /// Evaluate only the reference composition (30% Alt_func, 45% Dos, 25% Non)
    #[arg(long)]
    pub reference: bool,

    /// Directory receiving the output files
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix for every output file name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Also write the headerless pratio matrix of every scenario
    #[arg(long)]
    pub matrix: bool,

    /// Skip SVG rendering
    #[arg(long)]
    pub no_plots: bool,
}

#[derive(Args)]
pub struct GridArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Fraction of Alt_func duplicates in the starting genome
    #[arg(long, default_value = "0.3")]
    pub alt: f64,

    /// Fraction of Dos duplicates in the starting genome
    #[arg(long, default_value = "0.45")]
    pub dos: f64,

    /// Fraction of Non duplicates in the starting genome
    #[arg(long, default_value = "0.25")]
    pub non: f64,

    /// Fraction of Alt_func-retained duplicates that behave like Non by t2
    #[arg(long, default_value = "0")]
    pub switch: f64,

    /// Row table destination
    #[arg(long, default_value = "pratio.csv")]
    pub output: PathBuf,

    /// Also write the headerless pratio matrix here
    #[arg(long, value_name = "FILE")]
    pub matrix: Option<PathBuf>,

    /// Also render a 3D scatter here
    #[arg(long, value_name = "FILE")]
    pub plot: Option<PathBuf>,

    /// Value shown on the vertical axis of the scatter
    #[arg(long, value_enum, default_value_t = PlotValueCli::Pratio)]
    pub plot_value: PlotValueCli,
}

#[derive(Args)]
pub struct CurvesArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Curve table destination
    #[arg(long, default_value = "survival_curves.csv")]
    pub output: PathBuf,

    /// Also render the curves here
    #[arg(long, value_name = "FILE")]
    pub plot: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlotArgs {
    /// Row table written by `run` or `grid`
    pub table: PathBuf,

    /// SVG destination; defaults to the table path with an .svg extension
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Value shown on the vertical axis
    #[arg(long, value_enum, default_value_t = PlotValueCli::Pratio)]
    pub value: PlotValueCli,

    /// Plot title; defaults to the table file name
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration here instead of printing it
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Run(args)) => run_batch(args),
        Some(Commands::Grid(args)) => run_grid(args),
        Some(Commands::Curves(args)) => run_curves(args),
        Some(Commands::Plot(args)) => run_plot(args),
        Some(Commands::Config(args)) => run_config(args),
        None => {
            let printed = Cli::command().print_help();
            println!();
            printed.map_err(Into::into)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Loads the configuration file if given and applies the command-line overrides.
fn load_config(args: &ModelArgs) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading run configuration from {}", path.display());
            RunConfig::load(path)?
        }
        None => RunConfig::default(),
    };
    if let Some(time_points) = args.time_points {
        config.time_points = time_points;
    }
    if let Some(truncation) = args.truncation {
        config.truncation = truncation;
    }
    if let Some(indexing) = args.indexing {
        config.indexing = indexing.into();
    }
    config.strict_regimes |= args.strict_regimes;
    Ok(config)
}

fn select_hypothesis(
    config: &RunConfig,
    hypothesis: Option<HypothesisCli>,
    switch: Option<f64>,
) -> Result<Hypothesis, Box<dyn Error>> {
    let selected = match hypothesis {
        Some(HypothesisCli::Independence) => Hypothesis::Independence,
        Some(HypothesisCli::Duplicability) => Hypothesis::Duplicability,
        Some(HypothesisCli::MutationalOpportunity) => match config.hypothesis {
            current @ Hypothesis::MutationalOpportunity { .. } => current,
            _ => Hypothesis::MutationalOpportunity {
                switch: DEFAULT_MUTATIONAL_OPPORTUNITY_SWITCH,
            },
        },
        None => config.hypothesis,
    };
    match (selected, switch) {
        (Hypothesis::MutationalOpportunity { .. }, Some(switch)) => {
            Ok(Hypothesis::MutationalOpportunity { switch })
        }
        (other, Some(_)) => Err(format!(
            "--switch only applies to the mutational-opportunity hypothesis, not the {other}."
        )
        .into()),
        (other, None) => Ok(other),
    }
}

fn build_runner(config: &RunConfig) -> Result<ScenarioRunner, Box<dyn Error>> {
    let runner = ScenarioRunner::new(config.evaluator()?);
    Ok(runner.with_strict_regimes(config.strict_regimes))
}

fn run_batch(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.model)?;
    config.hypothesis = select_hypothesis(&config, args.hypothesis, args.switch)?;
    if let Some(directory) = args.output_dir {
        config.output.directory = directory;
    }
    if let Some(prefix) = args.prefix {
        config.output.file_prefix = prefix;
    }
    config.output.matrix |= args.matrix;
    if args.no_plots {
        config.output.plots = false;
    }

    let set = if args.reference {
        ScenarioSet::reference(config.hypothesis)?
    } else {
        config.scenarios()?
    };
    let hypothesis = set.hypothesis();
    log::info!("Running {} scenario(s) under the {hypothesis}", set.len());

    let runner = build_runner(&config)?;
    let mut sink = FileSink::from_config(&config.output);
    let mut progress = BarProgress::new();
    let outcomes = runner.run(&set, &mut sink, &mut progress)?;

    if config.output.curves {
        for path in runner.write_curves(&config.output, "Survival over Time")? {
            log::info!("Wrote {}", path.display());
        }
    }

    for outcome in &outcomes {
        println!("{outcome}");
    }
    let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
    if failed > 0 {
        let total = outcomes.len();
        return Err(format!("{failed} of {total} scenarios failed.").into());
    }
    Ok(())
}

fn run_grid(args: GridArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.model)?;
    let mixture = CategoryMixture::new(args.alt, args.dos, args.non, args.switch)?;
    let runner = build_runner(&config)?;
    runner.check_regimes()?;

    let grid = runner.evaluator().evaluate(&mixture)?;
    let summary = grid.summary();
    println!(
        "{mixture}: pratio in [{:.6}, {:.6}]",
        summary.min_pratio, summary.max_pratio
    );

    write_grid(&args.output, grid.rows())?;
    log::info!("Wrote {} rows to {}", grid.len(), args.output.display());
    if let Some(path) = &args.matrix {
        write_matrix(path, grid.pratio_matrix().view())?;
        log::info!("Wrote pratio matrix to {}", path.display());
    }
    if let Some(path) = &args.plot {
        let title = mixture.to_string();
        render_surface(path, &title, grid.rows(), args.plot_value.into())?;
        log::info!("Rendered {}", path.display());
    }
    Ok(())
}

fn run_curves(args: CurvesArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.model)?;
    let runner = build_runner(&config)?;
    runner.check_regimes()?;

    let curves = runner.evaluator().curves()?;
    write_curves(&args.output, &curves)?;
    log::info!("Wrote {} curves to {}", curves.len(), args.output.display());
    if let Some(path) = &args.plot {
        render_curves(path, "Survival over Time", &curves)?;
        log::info!("Rendered {}", path.display());
    }
    Ok(())
}

fn run_plot(args: PlotArgs) -> Result<(), Box<dyn Error>> {
    let rows = read_grid(&args.table)?;
    let output = args
        .output
        .unwrap_or_else(|| args.table.with_extension("svg"));
    let title = args.title.unwrap_or_else(|| {
        args.table
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    render_surface(&output, &title, &rows, args.value.into())?;
    println!("Rendered {} rows to {}", rows.len(), output.display());
    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<(), Box<dyn Error>> {
    let config = RunConfig::default();
    match args.output {
        Some(path) => {
            config.save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

/// Batch progress on stderr; hidden when stderr is not a terminal.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(0), draw_target);
        let template = "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        Self { bar }
    }
}

impl ScenarioProgress for BarProgress {
    fn on_batch_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_scenario_finish(&mut self, scenario: &Scenario, succeeded: bool) {
        let status = if succeeded { "done" } else { "failed" };
        self.bar
            .set_message(format!("{} {status}", scenario.mixture));
        self.bar.inc(1);
    }

    fn on_batch_finish(&mut self) {
        self.bar.finish_with_message("all scenarios evaluated");
    }
}
