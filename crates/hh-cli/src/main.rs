//! hhstat CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hh_sweep::{
    CommandRunner, FailurePolicy, LimitPipeline, PipelineMode, PipelineOptions, ProcessRunner,
    RecordingRunner, SweepOptions, SweepPlan,
};
use std::path::{Path, PathBuf};

mod plot;

#[derive(Parser)]
#[command(name = "hhstat")]
#[command(about = "hhstat - limit sweeps, aggregation and plotting for HH searches")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command per point of a sweep plan
    Sweep {
        /// Sweep plan (YAML or JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Override the plan's output root
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Print the commands without resetting directories or running anything
        #[arg(long)]
        dry_run: bool,

        /// Record failing points and go on instead of stopping at the first one
        #[arg(long)]
        keep_going: bool,
    },

    /// Build datacards and workspaces, compute limits and plot them for one model
    Limits {
        /// Model descriptor configuration (YAML)
        #[arg(long)]
        cfg: PathBuf,

        /// Name of the descriptor in `--cfg`
        #[arg(long)]
        model_desc: String,

        /// Output directory
        #[arg(long)]
        output: PathBuf,

        /// Job count forwarded to the external tools
        #[arg(long, default_value = "8")]
        parallel: usize,

        /// Only redraw the plots from existing limit files
        #[arg(long, alias = "plotOnly", conflicts_with = "collect_and_plot")]
        plot_only: bool,

        /// Collect existing per-job outputs, then plot
        #[arg(long, alias = "collectAndPlot")]
        collect_and_plot: bool,

        /// Run impacts for every channel and point
        #[arg(long)]
        impacts: bool,

        /// Run nuisance pulls for every channel and point
        #[arg(long)]
        pulls: bool,

        /// Run the saturated goodness-of-fit test for every channel
        #[arg(long, alias = "GoF")]
        gof: bool,

        /// Restrict datacard creation to one signal point
        #[arg(long)]
        signal_point: Option<String>,

        /// Record the external commands and print them instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Input shapes files; several are merged first
        shapes: Vec<PathBuf>,
    },

    /// Merge per-point limit files into per-category files
    Collect {
        /// Sweep output directory holding one subdirectory per point
        #[arg(short, long)]
        input: PathBuf,

        /// Categories to merge (comma separated)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Also write all_limits.json with every category at this point label
        #[arg(long)]
        combined_point: Option<String>,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw limit panels from a combined limits file
    Plot(plot::PlotArgs),

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Sweep { plan, output_root, dry_run, keep_going } => {
            cmd_sweep(&plan, output_root, dry_run, keep_going)
        }
        Commands::Limits {
            cfg,
            model_desc,
            output,
            parallel,
            plot_only,
            collect_and_plot,
            impacts,
            pulls,
            gof,
            signal_point,
            dry_run,
            shapes,
        } => {
            let mode = if plot_only {
                PipelineMode::PlotOnly
            } else if collect_and_plot {
                PipelineMode::CollectAndPlot
            } else {
                PipelineMode::Run
            };
            let opts = PipelineOptions {
                cfg,
                model_desc,
                output,
                parallel,
                mode,
                impacts,
                pulls,
                gof,
                signal_point,
                shapes,
                base_dir: std::env::current_dir()?,
            };
            cmd_limits(&opts, dry_run)
        }
        Commands::Collect { input, categories, combined_point, output } => {
            cmd_collect(&input, categories, combined_point.as_deref(), output.as_ref())
        }
        Commands::Plot(args) => plot::cmd_plot(&args),
        Commands::Version => {
            println!("hhstat {}", hh_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_sweep(
    plan_path: &Path,
    output_root: Option<PathBuf>,
    dry_run: bool,
    keep_going: bool,
) -> Result<()> {
    let plan = SweepPlan::load(plan_path)
        .with_context(|| format!("failed to load sweep plan {}", plan_path.display()))?;
    let opts = SweepOptions {
        output_root,
        base_dir: std::env::current_dir()?,
        dry_run,
        policy: if keep_going { FailurePolicy::Continue } else { FailurePolicy::Abort },
    };

    let mut runner = ProcessRunner { echo: true };
    let report = hh_sweep::run_sweep(&plan, &mut runner, &opts)
        .with_context(|| format!("sweep '{}' failed", plan.label))?;
    if dry_run {
        return Ok(());
    }

    tracing::info!(report = %report.path().display(), ok = report.n_ok(), "sweep finished");
    if report.n_failed() > 0 {
        anyhow::bail!(
            "{} of {} sweep jobs failed (see {})",
            report.n_failed(),
            report.jobs.len(),
            report.path().display()
        );
    }
    Ok(())
}

fn cmd_limits(opts: &PipelineOptions, dry_run: bool) -> Result<()> {
    let cfg_path = opts.base_dir.join(&opts.cfg);
    let config = hh_core::ModelConfig::load(&cfg_path)
        .with_context(|| format!("failed to load model config {}", cfg_path.display()))?;
    let desc = config.descriptor(&opts.model_desc)?;
    let pipeline = LimitPipeline::new(desc, &config.tools, opts)?;

    if dry_run {
        let mut runner = RecordingRunner::new();
        run_pipeline(&pipeline, &mut runner)?;
        for inv in &runner.invocations {
            println!("[{}] % {}", inv.cwd.display(), inv.display());
        }
        return Ok(());
    }

    let mut runner = ProcessRunner { echo: true };
    run_pipeline(&pipeline, &mut runner)
}

fn run_pipeline(pipeline: &LimitPipeline<'_>, runner: &mut dyn CommandRunner) -> Result<()> {
    pipeline
        .run(runner)
        .with_context(|| format!("limit pipeline failed in {}", pipeline.output_dir().display()))
}

fn cmd_collect(
    input: &Path,
    categories: Vec<String>,
    combined_point: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let categories = if categories.is_empty() {
        hh_sweep::DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
    } else {
        categories
    };

    let summaries = hh_sweep::aggregate(input, &categories)
        .with_context(|| format!("failed to aggregate limits under {}", input.display()))?;
    let mut value = serde_json::json!({ "categories": summaries });

    if let Some(point) = combined_point {
        let combined = hh_sweep::combine_categories(input, &categories, point)?;
        value["combined"] = serde_json::json!({
            "output": input.join(hh_sweep::aggregate::ALL_LIMITS_FILE),
            "point": point,
            "entries": combined.len(),
        });
    }

    write_json(output, value)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
