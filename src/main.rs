use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use sayonara_shred::ui::{human_bytes, ProgressBar};
use sayonara_shred::*;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "sayonara-shred")]
#[command(about = "Overwrite, rename and delete files and folders beyond recovery")]
#[command(version)]
struct Cli {
    /// Files, folders or glob patterns to wipe
    #[arg(required = true)]
    paths: Vec<String>,

    /// Overwrite algorithm
    #[arg(short, long, value_enum)]
    algorithm: Option<AlgorithmKind>,

    /// Passes per file (Gutmann always runs once)
    #[arg(short, long)]
    repeats: Option<u32>,

    /// Maximum files wiped in parallel (1-10)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Wipe one file at a time
    #[arg(long)]
    no_parallel: bool,

    /// Leave folders in place after their files are wiped
    #[arg(long)]
    no_folder_names: bool,

    /// Do not throttle between blocks
    #[arg(long)]
    full_resources: bool,

    /// Restart elevated when files fail and rights are missing
    #[arg(long)]
    auto_relaunch: bool,

    /// Settings file (TOML)
    #[arg(short, long, env = "SAYONARA_SHRED_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print events as JSON lines and log as JSON (needs --yes, there is no prompt)
    #[arg(long, requires = "yes")]
    json: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, settings: &mut WipeSettings) {
        if let Some(algorithm) = self.algorithm {
            settings.algorithm = algorithm;
        }
        if let Some(repeats) = self.repeats {
            settings.repeats = repeats;
        }
        if let Some(threads) = self.threads {
            settings.max_threads = threads;
        }
        if self.no_parallel {
            settings.parallel_enabled = false;
        }
        if self.no_folder_names {
            settings.include_folder_names = false;
        }
        if self.full_resources {
            settings.use_full_resources = true;
        }
        if self.auto_relaunch {
            settings.allow_auto_relaunch = true;
        }
    }
}

/// What the event loop saw by the time the scheduler drained
#[derive(Default)]
struct RunSummary {
    counters: CounterSnapshot,
    failures: Vec<FailedJob>,
    relaunch: Option<RelaunchRequest>,
    folders: Option<CleanReport>,
    canceled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_guard = init_logging(&cli)?;

    if !cfg!(feature = "color-output") {
        colored::control::set_override(false);
    }

    let mut settings = WipeSettings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    settings.validate()?;

    let paths = expand_patterns(&cli.paths)?;
    if !cli.yes && !confirm(&paths, &settings)? {
        println!("Aborted.");
        return Ok(());
    }

    let show_progress = cfg!(feature = "progress-bars") && !cli.json;
    let scheduler = Arc::new(Scheduler::new(settings.clone())?);
    scheduler.set_ui_visible(show_progress);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    scheduler.add_observer(move |event: &WipeEvent| {
        let _ = tx.send(event.clone());
    });

    setup_signal_handlers(Arc::clone(&scheduler))?;

    let jobs = scheduler.submit(&paths);
    if jobs.is_empty() {
        println!("Nothing to wipe.");
        return Ok(());
    }
    tracing::info!(jobs = jobs.len(), algorithm = %settings.algorithm, "Wipe started");

    let selection = settings.selection();
    let passes = u64::from(selection.repeats()) * selection.instantiate().passes_per_round();
    let mut bar = show_progress.then(|| ProgressBar::new(30));
    let mut written: HashMap<JobId, u64> = HashMap::new();
    let mut summary = RunSummary::default();

    while let Some(event) = rx.recv().await {
        if cli.json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            WipeEvent::JobProgress { job, written: w, .. } => {
                written.insert(job, w);
            }
            WipeEvent::CountersChanged(snapshot) => summary.counters = snapshot,
            WipeEvent::FoldersCleaned(report) => summary.folders = Some(report),
            WipeEvent::FailuresReported { failures } => summary.failures = failures,
            WipeEvent::RelaunchRequested(request) => summary.relaunch = Some(request),
            WipeEvent::Drained { canceled, .. } => {
                summary.canceled = canceled;
                break;
            }
            _ => {}
        }

        if let Some(bar) = bar.as_mut() {
            let expected = summary.counters.bytes.total_file_size * passes;
            bar.update(&summary.counters, written.values().sum(), expected);
        }
    }

    let total_written: u64 = written.values().sum();
    let elapsed = match bar.as_mut() {
        Some(bar) => {
            let expected = summary.counters.bytes.total_file_size * passes;
            bar.finish(&summary.counters, total_written, expected);
            bar.elapsed()
        }
        None => Duration::ZERO,
    };

    if !cli.json {
        print_summary(&summary, total_written, elapsed);
    }

    if let Some(request) = summary.relaunch.as_ref() {
        let status = relaunch(request, &settings)?;
        drop(log_guard);
        std::process::exit(status);
    }

    let code = if is_interrupted() || summary.canceled {
        130
    } else if summary.counters.states.failed > 0 || summary.counters.states.unknown > 0 {
        1
    } else {
        0
    };
    // Flush the file writer before exiting
    drop(log_guard);
    std::process::exit(code);
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console = if cli.json {
        fmt::layer().json().with_writer(io::stderr).boxed()
    } else {
        fmt::layer().with_writer(io::stderr).with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;

    Ok(guard)
}

/// Expand glob patterns. Patterns matching nothing are passed on as-is so
/// they show up as missing.
fn expand_patterns(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for arg in args {
        if !arg.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(arg));
            continue;
        }

        let before = paths.len();
        for entry in glob::glob(arg).with_context(|| format!("Invalid pattern: {}", arg))? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => tracing::warn!(pattern = %arg, error = %e, "Unreadable glob match"),
            }
        }
        if paths.len() == before {
            paths.push(PathBuf::from(arg));
        }
    }
    Ok(paths)
}

fn confirm(paths: &[PathBuf], settings: &WipeSettings) -> Result<bool> {
    println!("{}", "The following will be overwritten and deleted:".bold());
    for path in paths.iter().take(10) {
        println!("  {}", path.display());
    }
    if paths.len() > 10 {
        println!("  ... and {} more", paths.len() - 10);
    }
    println!(
        "Algorithm: {}, repeats: {}",
        settings.algorithm,
        settings.selection().repeats()
    );
    print!("{} [y/N] ", "This cannot be undone. Continue?".yellow().bold());
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_summary(summary: &RunSummary, written: u64, elapsed: Duration) {
    let states = &summary.counters.states;
    let bytes = &summary.counters.bytes;

    println!();
    println!("{}", "=== Wipe Summary ===".bold());
    println!("  Finished: {}", states.finished.to_string().green());
    if states.canceled > 0 {
        println!("  Canceled: {}", states.canceled.to_string().yellow());
    }
    if states.missing > 0 {
        println!("  Missing:  {}", states.missing.to_string().yellow());
    }
    if states.failed > 0 {
        println!("  Failed:   {}", states.failed.to_string().red());
    }
    if states.unknown > 0 {
        println!("  Unknown:  {}", states.unknown.to_string().red());
    }
    println!(
        "  Wiped {} of files, {} written",
        human_bytes(bytes.wiped_file_size as f64),
        human_bytes(written as f64)
    );
    println!(
        "  Elapsed: {}",
        humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
    );

    if let Some(report) = summary.folders.as_ref() {
        if !report.removed.is_empty() {
            println!("  Folders removed: {}", report.removed.len());
        }
        for kept in &report.retained {
            println!("  {} {}", "Folder kept:".yellow(), kept.display());
        }
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", "Failed files:".red().bold());
        for failed in &summary.failures {
            match failed.failure.as_ref() {
                Some(failure) => {
                    println!("  {} - {}", failed.path.display(), failure.message.red());
                    println!("    {}", failure.kind.description());
                    for (key, value) in &failure.context.metadata {
                        println!("    {}: {}", key, value);
                    }
                }
                None => println!("  {}", failed.path.display()),
            }
        }
        if summary.failures.iter().any(|f| f.elevation_may_help()) {
            println!(
                "{}",
                "Some files may be wiped by running again with elevated rights (--auto-relaunch)."
                    .yellow()
            );
        }
    }
}

/// Restart elevated with the same algorithm and the leftover paths
fn relaunch(request: &RelaunchRequest, settings: &WipeSettings) -> Result<i32> {
    let algorithm = settings
        .algorithm
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| "secure-random".to_string());

    let extra: Vec<OsString> = vec![
        "--yes".into(),
        "--algorithm".into(),
        algorithm.into(),
        "--repeats".into(),
        settings.repeats.to_string().into(),
    ];

    println!(
        "{} {} path(s) with elevated rights...",
        "Relaunching for".yellow(),
        request.failed_paths.len() + request.base_folders.len()
    );
    let status = request
        .command(&extra)?
        .status()
        .context("Failed to relaunch")?;
    Ok(status.code().unwrap_or(1))
}

// Signal handler for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(scheduler: Arc<Scheduler>) -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                if is_interrupted() {
                    eprintln!("\nSecond interrupt, exiting immediately.");
                    std::process::exit(130);
                }
                eprintln!("\n\nInterrupt received! Canceling wipe...");
                eprintln!("   Files already overwritten stay overwritten; unfinished files are kept.");
                set_interrupted();
                scheduler.cancel_all();
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_scheduler: Arc<Scheduler>) -> Result<()> {
    Ok(())
}
