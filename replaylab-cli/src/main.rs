//! ReplayLab CLI: replay, sweep, import, generate and window commands.
//!
//! Commands:
//! - `replay`: run one replay from a TOML config and save its report
//! - `sweep`: run the config's `[sweep]` grid, one replay per point
//! - `import`: load a bar CSV into a history store
//! - `generate`: write a seeded synthetic series into a history store
//! - `window`: print the init and evaluation ranges for a start date

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use replaylab_core::domain::{CollectionId, DataRecord, ReplayMode};
use replaylab_core::store::HistoricalStore;
use replaylab_core::window::{day_start, parse_date, parse_end_date, TimeRange, TimeWindow, UpperBound};
use replaylab_runner::{
    generate, import_into, open_store, read_bars_file, run_replay, save_artifacts, Interval,
    JsonlStore, ParamSweep, ReplayConfig, ReplayReport, SyntheticParams,
};

#[derive(Parser)]
#[command(name = "replaylab", about = "ReplayLab CLI: historical bar/tick replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where `import` and `generate` write.
#[derive(clap::Args)]
struct Target {
    /// Database name.
    #[arg(long)]
    database: String,

    /// Collection name. Defaults to the symbol.
    #[arg(long)]
    collection: Option<String>,

    /// Write to a JSON-lines store rooted here.
    #[arg(long, conflicts_with = "config")]
    root: Option<PathBuf>,

    /// Write to the store named in this config's `[store]` table.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one replay from a TOML config file.
    Replay {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for report.json and log.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run one replay per point of the config's `[sweep]` grid.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Run points one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Strategy statistic to rank completed runs by.
        #[arg(long)]
        rank_by: Option<String>,

        /// Save artifacts for every run here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Import a bar CSV into a history store.
    Import {
        /// CSV file with date, time, open, high, low, close, volume columns.
        #[arg(long)]
        csv: PathBuf,

        /// Symbol stamped on every imported bar.
        #[arg(long)]
        symbol: String,

        #[command(flatten)]
        target: Target,
    },
    /// Write a seeded synthetic series into a history store.
    Generate {
        #[arg(long, default_value = "SYNTH")]
        symbol: String,

        /// First timestamp's date (YYYYMMDD or YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Number of records.
        #[arg(long, default_value_t = 1000)]
        count: usize,

        /// Record spacing: second, minute or day.
        #[arg(long, default_value = "minute")]
        interval: Interval,

        /// bar or tick.
        #[arg(long, default_value = "bar")]
        mode: ReplayMode,

        #[arg(long, default_value_t = 3400.0)]
        price: f64,

        /// Maximum relative move per step.
        #[arg(long, default_value_t = 0.002)]
        volatility: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        target: Target,
    },
    /// Print the init and evaluation ranges for a start date.
    Window {
        /// Data start date (YYYYMMDD or YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Warm-up days before the strategy starts.
        #[arg(long, default_value_t = 10)]
        warmup: i64,

        /// Inclusive end date.
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { config, output_dir } => run_replay_cmd(config, output_dir),
        Commands::Sweep {
            config,
            sequential,
            rank_by,
            output_dir,
        } => run_sweep_cmd(config, sequential, rank_by, output_dir),
        Commands::Import {
            csv,
            symbol,
            target,
        } => run_import_cmd(csv, symbol, target),
        Commands::Generate {
            symbol,
            start,
            count,
            interval,
            mode,
            price,
            volatility,
            seed,
            target,
        } => {
            let params = SyntheticParams {
                symbol,
                start: day_start(parse_date(&start)?),
                interval,
                count,
                start_price: price,
                volatility,
                seed,
            };
            run_generate_cmd(params, mode, target)
        }
        Commands::Window { start, warmup, end } => run_window_cmd(&start, warmup, end.as_deref()),
    }
}

fn run_replay_cmd(config_path: PathBuf, output_dir: PathBuf) -> Result<()> {
    let config = ReplayConfig::from_file(&config_path)?;
    let report = run_replay(&config)?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_sweep_cmd(
    config_path: PathBuf,
    sequential: bool,
    rank_by: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = ReplayConfig::from_file(&config_path)?;
    if config.sweep.is_empty() {
        bail!("{} has no [sweep] table", config_path.display());
    }

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&config)?;

    // Ranking only orders completed runs; failed ones follow.
    let rows: Vec<&ReplayReport> = match &rank_by {
        Some(stat) => {
            let mut rows = results.sorted_by_stat(stat);
            rows.extend(results.failed());
            rows
        }
        None => results.all().iter().collect(),
    };

    println!();
    println!("=== Sweep: {} runs, {} failed ===", results.len(), results.failed().len());
    println!("{:<14} {:<10} {:>10}  {}", "Run", "State", "Records", "Params");
    println!("{}", "-".repeat(60));
    for report in rows {
        let params: Vec<String> = report
            .strategy
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!(
            "{:<14} {:<10} {:>10}  {}",
            report.short_id(),
            report.state.to_string(),
            report.dispatched,
            params.join(" ")
        );
    }

    if let Some(dir) = output_dir {
        for report in results.all() {
            save_artifacts(report, &dir)?;
        }
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn open_target(target: &Target) -> Result<Box<dyn HistoricalStore>> {
    match (&target.root, &target.config) {
        (Some(root), None) => {
            std::fs::create_dir_all(root)
                .with_context(|| format!("failed to create {}", root.display()))?;
            Ok(Box::new(JsonlStore::new(root.clone())))
        }
        (None, Some(path)) => Ok(open_store(&ReplayConfig::from_file(path)?.store)?),
        _ => bail!("one of --root or --config is required"),
    }
}

fn write_records(target: &Target, symbol: &str, records: Vec<DataRecord>) -> Result<()> {
    let collection = CollectionId::new(
        target.database.clone(),
        target.collection.clone().unwrap_or_else(|| symbol.to_string()),
    );
    let mut store = open_target(target)?;
    let written = import_into(store.as_mut(), &collection, records)?;
    println!("Wrote {written} records to {} ({})", collection, store.name());
    Ok(())
}

fn run_import_cmd(csv: PathBuf, symbol: String, target: Target) -> Result<()> {
    let bars = read_bars_file(&csv, &symbol)?;
    write_records(&target, &symbol, bars.into_iter().map(DataRecord::from).collect())
}

fn run_generate_cmd(params: SyntheticParams, mode: ReplayMode, target: Target) -> Result<()> {
    let records = generate(&params, mode);
    write_records(&target, &params.symbol, records)
}

fn run_window_cmd(start: &str, warmup: i64, end: Option<&str>) -> Result<()> {
    let end = parse_end_date(end.unwrap_or(""))?;
    let window = TimeWindow::from_start(start, warmup)?.with_end(end);

    println!("Data start:     {}", window.data_start());
    println!("Strategy start: {}", window.strategy_start());
    println!("Init:           {}", format_range(&window.init_range()));
    println!("Evaluation:     {}", format_range(&window.evaluation_range()));
    if window.is_degenerate() {
        println!("WARNING: evaluation range is empty");
    }
    Ok(())
}

fn format_range(range: &TimeRange) -> String {
    match range.end {
        UpperBound::Exclusive(end) => format!("[{}, {})", range.start, end),
        UpperBound::Inclusive(end) => format!("[{}, {}]", range.start, end),
        UpperBound::Unbounded => format!("[{}, ...)", range.start),
    }
}

fn print_summary(report: &ReplayReport) {
    println!();
    println!("=== Replay Result ===");
    println!("Run:            {}", report.short_id());
    println!("Store:          {} {}", report.store, report.collection);
    println!("Mode:           {}", report.mode);
    println!("Strategy:       {}", report.strategy.name);
    println!("State:          {}", report.state);
    if let Some(load) = &report.load {
        println!(
            "History:        {} init, {} evaluation{}",
            load.init_records,
            load.evaluation_records,
            if load.connected { "" } else { " (store unavailable)" }
        );
    }
    println!("Dispatched:     {}", report.dispatched);
    if let Some(t) = report.final_time {
        println!("Final time:     {t}");
    }
    if !report.stats.is_empty() {
        println!();
        println!("--- Strategy ---");
        for (name, value) in &report.stats {
            println!("{name:<16}{value}");
        }
    }
    if let Some(err) = &report.error {
        println!();
        println!("ERROR: {err}");
    }
    println!();
}
