//! Cookie Taster CLI
//!
//! The `cookie-taster` command renders every selected option combination of a
//! cookiecutter template and runs tasters against each generated project.
//!
//! ## Commands
//!
//! - `test`: render and taste combinations; exits 0 iff all pass
//! - `inspect`: list a template's options and their choices

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use taster_core::reporting::{render_text, write_json};
use taster_core::{
    build_options, combination_count, generate, select_all, Combination, CombinationRun,
    OptionSchema, ProgressListener, RunScheduler, SchedulerConfig, Selection,
};
use taster_exec::renderer::{DEFAULT_PROGRAM, DEFAULT_RENDER_TIMEOUT_SECS};
use taster_exec::{prepare_output_root, resolve_template, CookiecutterRenderer, TasterConfig};

#[derive(Parser)]
#[command(name = "cookie-taster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Test cookiecutter templates with multiple option combinations", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render and taste every selected combination of a template
    Test(TestArgs),

    /// List the options a template declares
    Inspect {
        /// Template source (local path or git URL)
        template: String,
    },
}

#[derive(Args)]
struct TestArgs {
    /// Template source (local path or git URL)
    template: String,

    /// Directory where generated projects are written
    #[arg(
        short,
        long,
        env = "COOKIE_TASTER_OUTPUT_DIR",
        default_value = "cookie-taster-output"
    )]
    output_dir: PathBuf,

    /// Maximum combinations in flight (default: available parallelism)
    #[arg(short, long, env = "COOKIE_TASTER_JOBS")]
    jobs: Option<usize>,

    /// Values to vary for an option, e.g. `--select license=MIT,BSD` (repeatable)
    #[arg(long = "select", value_name = "OPTION=V1,V2", value_parser = parse_select)]
    select: Vec<(String, Vec<String>)>,

    /// Vary every option over all of its choices
    #[arg(long)]
    all: bool,

    /// JSON file declaring command tasters
    #[arg(long)]
    tasters: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Remove previous contents of the output directory first
    #[arg(long)]
    clean: bool,

    /// Per-render timeout in seconds (0 disables it)
    #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// cookiecutter-compatible executable used to render
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    cookiecutter: String,

    /// Print the combinations without rendering anything
    #[arg(long)]
    dry_run: bool,
}

/// Exit status after a forced quit (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// The first interrupt cancels gracefully; any later one quits immediately.
fn interrupt_forces_exit(interrupts: u32) -> bool {
    interrupts > 1
}

/// Parse `name=v1,v2` into an option name and its values.
fn parse_select(raw: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (name, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected OPTION=VALUES, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing option name in '{raw}'"));
    }
    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(format!("no values given for '{name}'"));
    }
    Ok((name.to_string(), values))
}

/// Start from defaults (or every choice with `all`), then apply `--select`.
/// Repeated selections of one option accumulate.
fn build_selection(
    schema: &OptionSchema,
    all: bool,
    select: Vec<(String, Vec<String>)>,
) -> Selection {
    let mut selection = if all { select_all(schema) } else { Selection::new() };
    let mut explicit = Selection::new();
    for (name, values) in select {
        explicit.entry(name).or_default().extend(values);
    }
    selection.extend(explicit);
    selection
}

/// Logs one line per started and finished combination.
struct ConsoleProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }
}

impl ProgressListener for ConsoleProgress {
    fn on_session_started(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn on_task_started(&self, index: usize, combination: &Combination) {
        info!(index, %combination, "tasting");
    }

    fn on_run_finalized(&self, run: &CombinationRun) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        let verdict = if run.incomplete {
            "incomplete"
        } else if run.passed() {
            "passed"
        } else {
            "failed"
        };
        info!(index = run.index, verdict, "[{done}/{total}] {}", run.combination);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    taster_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Test(args) => {
            let passed = cmd_test(args).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Inspect { template } => cmd_inspect(&template).await,
    }
}

async fn cmd_inspect(source: &str) -> Result<()> {
    let template = resolve_template(source)
        .await
        .with_context(|| format!("Failed to resolve template '{source}'"))?;
    let schema = template.schema().context("Failed to read template options")?;

    if schema.is_empty() {
        println!("Template declares no choice options.");
        return Ok(());
    }
    for entry in schema.entries() {
        let default = entry.choices.first().map(String::as_str).unwrap_or_default();
        println!("{}: {} (default: {})", entry.name, entry.choices.join(", "), default);
    }
    let total = combination_count(&build_options(&schema, &select_all(&schema))?);
    println!("\n{} options, {} combinations with --all", schema.len(), total);
    Ok(())
}

async fn cmd_test(args: TestArgs) -> Result<bool> {
    let template = resolve_template(&args.template)
        .await
        .with_context(|| format!("Failed to resolve template '{}'", args.template))?;
    let schema = template.schema().context("Failed to read template options")?;
    let selection = build_selection(&schema, args.all, args.select);
    let options = build_options(&schema, &selection).context("Invalid option selection")?;

    let total = combination_count(&options);
    println!("{} combinations to taste", total);
    let combinations = generate(&options);

    if args.dry_run {
        for (index, combination) in combinations.iter().enumerate() {
            println!("#{index:<4} {combination}");
        }
        return Ok(true);
    }

    let taster_config = match &args.tasters {
        Some(path) => TasterConfig::load(path)?,
        None => TasterConfig::default(),
    };
    let registry = Arc::new(taster_config.build_registry());
    info!(tasters = ?registry.names(), "registered tasters");

    prepare_output_root(&args.output_dir, args.clean)
        .await
        .with_context(|| format!("Failed to prepare {}", args.output_dir.display()))?;
    let renderer = CookiecutterRenderer::new(&template, &args.output_dir)
        .with_program(args.cookiecutter)
        .with_timeout_secs(args.timeout_secs);

    let config = match args.jobs {
        Some(jobs) => SchedulerConfig::with_limit(jobs),
        None => SchedulerConfig::default(),
    };
    let scheduler = RunScheduler::new(config).with_progress(Arc::new(ConsoleProgress::new()));

    let cancel = scheduler.cancel_signal();
    tokio::spawn(async move {
        let mut interrupts = 0u32;
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupts += 1;
            if interrupt_forces_exit(interrupts) {
                warn!("second interrupt received; exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            warn!("interrupt received; finishing in-flight combinations (press Ctrl-C again to force quit)");
            cancel.cancel();
        }
    });

    let report = scheduler
        .run(combinations, Arc::new(renderer), registry)
        .await
        .context("Run failed")?;

    println!("{}", render_text(&report));
    if let Some(path) = &args.report {
        write_json(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(report.all_passed())
}
