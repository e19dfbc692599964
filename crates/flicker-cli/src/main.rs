// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! `flicker`: tags a window-hierarchy / layer trace pair and checks the
//! configured assertion plans against every tag.
//!
//! `analyze` writes `tag_trace.json` and `error_trace.json` into the output
//! directory, prints the metric map as JSON on stdout and exits non-zero
//! when the error report is not empty. `tags` only prints the tag trace.
//!
//! Diagnostics go through `tracing`; set `RUST_LOG=flicker=debug` to see the
//! per-tag progress emitted by the engines.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use flicker_config::{ConfigService, FsConfigStore};
use flicker_core::{AssertionConfig, FlickerService, LogSink, TaggingEngine};
use flicker_trace::{read_trace, LayersTrace, WindowManagerTrace};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Key of the assertion configuration in the user config store.
const CONFIG_KEY: &str = "assertions";
const TAG_TRACE_FILE: &str = "tag_trace.json";
const ERROR_TRACE_FILE: &str = "error_trace.json";

#[derive(Parser)]
#[command(
    name = "flicker",
    version,
    about = "Temporal assertions over window and layer traces",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag the traces, check every tag and write the artifacts.
    Analyze(AnalyzeArgs),
    /// Print the tag trace without checking anything.
    Tags(TraceArgs),
}

#[derive(Args)]
struct TraceArgs {
    /// Window-hierarchy trace (JSON).
    #[arg(long)]
    wm_trace: PathBuf,
    /// Layer trace (JSON).
    #[arg(long)]
    layers_trace: PathBuf,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    traces: TraceArgs,
    /// Assertion configuration (JSON). Defaults to the user config store.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving `tag_trace.json` and `error_trace.json`.
    #[arg(long)]
    out: PathBuf,
    /// Delete regular files already in the output directory first.
    #[arg(long)]
    clean: bool,
    /// Threads used to evaluate tags.
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Tags(args) => run_tags(&args),
    }
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let (wm, layers) = load_traces(&args.traces)?;
    let config = load_config(args.config.as_deref())?;
    if config.assertion_count() == 0 {
        warn!("no assertions configured; only tags will be produced");
    }

    let engine = config
        .to_engine()
        .context("invalid assertion configuration")?
        .with_sink(tracing_sink(Target::Assert));
    let service = FlickerService::new(engine)
        .with_tagging(TaggingEngine::new().with_sink(tracing_sink(Target::Tagging)))
        .with_workers(args.workers);
    let analysis = service.run(&wm, &layers);

    prepare_out_dir(&args.out, args.clean)?;
    write_json(&args.out.join(TAG_TRACE_FILE), &analysis.tags)?;
    write_json(&args.out.join(ERROR_TRACE_FILE), &analysis.report)?;

    let summary = analysis.report.summary();
    info!(
        tags = analysis.tags.len(),
        entries = summary.total(),
        passed = analysis.metrics.passed_count(),
        metrics = analysis.metrics.len(),
        "analysis finished"
    );

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&analysis.metrics)?)?;

    if !summary.is_green() {
        bail!(
            "{} problem(s) found ({} failed, {} exhausted, {} crashed, {} empty); see {}\n{}",
            summary.total(),
            summary.failed,
            summary.exhausted,
            summary.crashed,
            summary.empty_trace,
            args.out.join(ERROR_TRACE_FILE).display(),
            analysis.report
        );
    }
    Ok(())
}

fn run_tags(args: &TraceArgs) -> Result<()> {
    let (wm, layers) = load_traces(args)?;
    let tags = TaggingEngine::new()
        .with_sink(tracing_sink(Target::Tagging))
        .run(&wm, &layers);
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&tags)?)?;
    Ok(())
}

fn load_traces(args: &TraceArgs) -> Result<(WindowManagerTrace, LayersTrace)> {
    let wm: WindowManagerTrace = read_trace(&args.wm_trace)
        .with_context(|| format!("reading WM trace {}", args.wm_trace.display()))?;
    let layers: LayersTrace = read_trace(&args.layers_trace)
        .with_context(|| format!("reading layers trace {}", args.layers_trace.display()))?;
    info!(
        wm_entries = wm.len(),
        layer_entries = layers.len(),
        "traces loaded"
    );
    Ok((wm, layers))
}

/// Reads `path` when given, else the user config store. A missing or
/// unreadable store yields an empty configuration.
fn load_config(path: Option<&Path>) -> Result<AssertionConfig> {
    if let Some(path) = path {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing assertion config {}", path.display()));
    }

    let loaded = FsConfigStore::new()
        .and_then(|store| ConfigService::new(store).load::<AssertionConfig>(CONFIG_KEY));
    match loaded {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(AssertionConfig::default()),
        Err(err) => {
            warn!(error = %err, "could not load stored assertion config");
            Ok(AssertionConfig::default())
        }
    }
}

fn prepare_out_dir(out: &Path, clean: bool) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    if !clean {
        return Ok(());
    }
    for entry in fs::read_dir(out)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())
                .with_context(|| format!("removing {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "artifact written");
    Ok(())
}

#[derive(Clone, Copy)]
enum Target {
    Tagging,
    Assert,
}

/// Forwards engine diagnostics to `tracing` at debug level.
fn tracing_sink(target: Target) -> LogSink {
    match target {
        Target::Tagging => Arc::new(|line: &str| {
            tracing::debug!(target: "flicker::tagging", "{line}");
        }),
        Target::Assert => Arc::new(|line: &str| {
            tracing::debug!(target: "flicker::assert", "{line}");
        }),
    }
}
