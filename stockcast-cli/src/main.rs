//! Stockcast CLI: forecast a ticker's daily closes, one-shot or interactively.
//!
//! Commands:
//! - `forecast`: run one request through the readiness gate and print the report
//! - `interactive`: read `SYMBOL [YEARS]` lines and answer each one
//! - `tickers`: list the preset ticker selection

mod export;
mod report;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use stockcast_core::data::{
    CachedProvider, CsvProvider, DataProvider, FetchCache, SyntheticProvider, YahooProvider,
};
use stockcast_core::{
    ForecastRequest, GateError, GateReport, ReadinessGate, StockcastConfig,
    TrendSeasonalForecaster,
};

/// Exit status for input the user can fix.
const EXIT_INVALID_INPUT: i32 = 2;
/// Exit status for every other failed request.
const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(
    name = "stockcast",
    about = "Stockcast: multi-year stock price forecasts behind a readiness gate"
)]
struct Cli {
    /// Log gate transitions and cache activity.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Where price history comes from.
    #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
    source: SourceKind,

    /// Directory of `{SYMBOL}.csv` files (for `--source csv`).
    #[arg(long, default_value = "data")]
    csv_dir: PathBuf,

    /// Minimum usable rows; overrides the config file.
    #[arg(long)]
    min_rows: Option<usize>,

    /// First day of history (YYYY-MM-DD); overrides the config file.
    #[arg(long)]
    start: Option<NaiveDate>,
}

#[derive(clap::Args, Clone)]
struct ChartArgs {
    /// Skip the ASCII chart.
    #[arg(long, default_value_t = false)]
    no_chart: bool,

    /// Chart width in columns.
    #[arg(long, default_value_t = 72)]
    width: usize,

    /// Chart height in rows.
    #[arg(long, default_value_t = 16)]
    height: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one ticker.
    Forecast {
        /// Ticker symbol (e.g. AAPL).
        #[arg(long)]
        symbol: String,

        /// Years to forecast (1-4).
        #[arg(long, default_value_t = 1)]
        years: u32,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chart: ChartArgs,

        /// Write the forecast to a .csv or .json file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Answer `SYMBOL [YEARS]` lines from stdin until EOF or `quit`.
    Interactive {
        /// Years used when a line names only a symbol.
        #[arg(long, default_value_t = 1)]
        years: u32,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chart: ChartArgs,
    },
    /// List the preset tickers.
    Tickers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Yahoo,
    Csv,
    Synthetic,
}

type Gate = ReadinessGate<Box<dyn DataProvider>, TrendSeasonalForecaster>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forecast {
            symbol,
            years,
            source,
            chart,
            export,
        } => cmd_forecast(&config, symbol, years, &source, &chart, export),
        Commands::Interactive {
            years,
            source,
            chart,
        } => cmd_interactive(&config, years, &source, &chart),
        Commands::Tickers => {
            cmd_tickers(&config);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<StockcastConfig> {
    match path {
        Some(path) => StockcastConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(StockcastConfig::default()),
    }
}

/// Apply CLI overrides on top of the loaded config.
fn effective_config(config: &StockcastConfig, args: &SourceArgs) -> Result<StockcastConfig> {
    let mut config = config.clone();
    if let Some(min_rows) = args.min_rows {
        config.min_rows = min_rows;
    }
    if let Some(start) = args.start {
        config.start_date = start;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn build_provider(config: &StockcastConfig, args: &SourceArgs) -> Result<Box<dyn DataProvider>> {
    let inner: Box<dyn DataProvider> = match args.source {
        SourceKind::Yahoo => Box::new(
            YahooProvider::new(config.http_timeout()).context("failed to build HTTP client")?,
        ),
        SourceKind::Csv => Box::new(CsvProvider::new(&args.csv_dir)),
        SourceKind::Synthetic => Box::new(SyntheticProvider::new()),
    };

    if !config.cache.enabled {
        return Ok(inner);
    }
    let cache = FetchCache::new(config.cache_ttl(), config.cache.capacity);
    Ok(Box::new(CachedProvider::new(inner, cache)))
}

fn build_gate(config: &StockcastConfig, args: &SourceArgs) -> Result<Gate> {
    let config = effective_config(config, args)?;
    let provider = build_provider(&config, args)?;
    let forecaster = config.forecaster().context("invalid forecast settings")?;
    log::debug!(
        "using provider {} from {} with min_rows={}",
        provider.name(),
        config.start_date,
        config.min_rows
    );
    Ok(ReadinessGate::new(provider, forecaster, config.gate_config()))
}

fn chart_size(args: &ChartArgs) -> Option<(usize, usize)> {
    (!args.no_chart).then_some((args.width, args.height))
}

fn exit_code(err: &GateError) -> i32 {
    if err.is_user_correctable() {
        EXIT_INVALID_INPUT
    } else {
        EXIT_FAILURE
    }
}

fn print_gate_error(err: &GateError) {
    if err.is_user_correctable() {
        eprintln!("Warning: {err}");
    } else {
        eprintln!("Error: {err}");
    }
}

fn cmd_forecast(
    config: &StockcastConfig,
    symbol: String,
    years: u32,
    source: &SourceArgs,
    chart: &ChartArgs,
    export: Option<PathBuf>,
) -> Result<()> {
    let gate = build_gate(config, source)?;
    let request = ForecastRequest::new(symbol, years);

    let report = match gate.handle(&request) {
        Ok(report) => report,
        Err(err) => {
            print_gate_error(&err);
            std::process::exit(exit_code(&err));
        }
    };

    print!("{}", report::format_report(&report, chart_size(chart)));

    if let Some(path) = export {
        write_export(&path, &report)?;
    }
    Ok(())
}

fn write_export(path: &std::path::Path, report: &GateReport) -> Result<()> {
    export::write_export(path, report, chrono::Local::now().date_naive())?;
    println!("\nForecast written to {}", path.display());
    Ok(())
}

fn cmd_interactive(
    config: &StockcastConfig,
    default_years: u32,
    source: &SourceArgs,
    chart: &ChartArgs,
) -> Result<()> {
    let gate = build_gate(config, source)?;

    println!("Stock forecast. Enter `SYMBOL [YEARS]` (years 1-4), or `quit`.");
    println!("Suggested tickers: {}", config.tickers.join(", "));

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read stdin")?;
        let trimmed = line.trim();
        if matches!(trimmed.to_ascii_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        match answer_line(&gate, trimmed, default_years) {
            Ok(report) => print!("{}", report::format_report(&report, chart_size(chart))),
            Err(err) => print_gate_error(&err),
        }
    }
    Ok(())
}

/// One interactive request. Failures end the request, never the loop.
fn answer_line(gate: &Gate, line: &str, default_years: u32) -> Result<GateReport, GateError> {
    let request = ForecastRequest::parse_line(line, default_years)?;
    gate.handle(&request)
}

fn cmd_tickers(config: &StockcastConfig) {
    println!("=== Preset tickers ===");
    for ticker in &config.tickers {
        println!("{ticker}");
    }
}
