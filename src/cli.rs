//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::held_file_adapter::load_held;
use crate::adapters::inst_flow_csv_adapter::InstFlowCsvAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::backtest::{minimum_bars, run_or_skip, BacktestResult};
use crate::domain::config::ScreenConfig;
use crate::domain::config_validation::validate_date_range;
use crate::domain::error::TwscanError;
use crate::domain::inst_flow::InstFlow;
use crate::domain::metrics::RunStatus;
use crate::domain::scan::{rank_candidates, scan_latest, ScanRecord};
use crate::domain::universe::{normalize_codes, parse_codes, HeldSet, Market};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::inst_flow_port::InstFlowPort;
use crate::ports::notifier::Notifier;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "twscan", about = "Daily trend screener and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the `[run]` section.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory holding `<CODE>.csv` price files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Comma-separated codes; defaults to every file in the data directory
    #[arg(long)]
    pub codes: Option<String>,
    /// TW or TWO, used to suffix bare numeric codes
    #[arg(long)]
    pub market: Option<String>,
    /// Institutional flow CSV (date,code,net_inst)
    #[arg(long)]
    pub inst: Option<PathBuf>,
    /// Output directory for CSV reports
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// First date to load (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// Last date to load (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the latest bar of every instrument
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        run: RunArgs,
        /// Held-instrument list, one code per line
        #[arg(long)]
        held: Option<PathBuf>,
        /// Also write every evaluated instrument, not just candidates
        #[arg(long)]
        full_report: bool,
    },
    /// Replay history bar by bar for each instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Resolve and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for instrument(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
}

/// `[run]` settings after command-line overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_dir: PathBuf,
    /// `None` means every instrument in the data directory.
    pub codes: Option<Vec<String>>,
    pub market: Market,
    pub held_file: Option<PathBuf>,
    pub inst_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub full_report: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Scan {
            config,
            run,
            held,
            full_report,
        } => run_scan(&config, &run, held, full_report),
        Command::Backtest { config, run } => run_backtest(&config, &run),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, run } => run_info(&config, &run),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<(FileConfigAdapter, ScreenConfig), TwscanError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = ScreenConfig::resolve(&adapter)?;
    Ok((adapter, config))
}

pub fn build_run_settings(
    adapter: &dyn ConfigPort,
    args: &RunArgs,
) -> Result<RunSettings, TwscanError> {
    let from_file = |key: &str| {
        adapter
            .get_string("run", key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let market = match args.market.clone().or_else(|| from_file("market")) {
        Some(m) => m.parse::<Market>()?,
        None => Market::default(),
    };
    let codes = match args.codes.clone().or_else(|| from_file("codes")) {
        Some(list) => Some(parse_codes(&list, market)?),
        None => None,
    };
    let start = args.start.clone().or_else(|| from_file("start_date"));
    let end = args.end.clone().or_else(|| from_file("end_date"));
    let (start_date, end_date) = validate_date_range(start.as_deref(), end.as_deref())?;

    Ok(RunSettings {
        data_dir: args
            .data_dir
            .clone()
            .or_else(|| from_file("data_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data")),
        codes,
        market,
        held_file: from_file("held_file").map(PathBuf::from),
        inst_file: args
            .inst
            .clone()
            .or_else(|| from_file("inst_file").map(PathBuf::from)),
        output_dir: args
            .output
            .clone()
            .or_else(|| from_file("output_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("output")),
        start_date,
        end_date,
        full_report: adapter.get_bool("run", "full_report", false),
    })
}

/// Configured codes, or every symbol the data port knows about.
pub fn resolve_codes(
    settings: &RunSettings,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, TwscanError> {
    match &settings.codes {
        Some(codes) => Ok(codes.clone()),
        None => {
            let symbols = data_port.list_symbols()?;
            Ok(normalize_codes(
                symbols.iter().map(String::as_str),
                settings.market,
            ))
        }
    }
}

fn load_inst_flows(settings: &RunSettings) -> Result<Option<InstFlowCsvAdapter>, TwscanError> {
    match &settings.inst_file {
        Some(path) => {
            let adapter = InstFlowCsvAdapter::from_file(path)?;
            info!(path = %path.display(), instruments = adapter.len(), "institutional flow loaded");
            Ok(Some(adapter))
        }
        None => Ok(None),
    }
}

fn inst_flow_for(inst_port: Option<&(dyn InstFlowPort + Sync)>, code: &str) -> Option<InstFlow> {
    let port = inst_port?;
    match port.inst_flow(code) {
        Ok(flow) => flow,
        Err(e) => {
            warn!(code, error = %e, "institutional flow unavailable");
            None
        }
    }
}

/// Scans every code in parallel; failures are logged and left out. Records
/// keep the order of `codes`.
pub fn scan_universe(
    data_port: &(dyn DataPort + Sync),
    inst_port: Option<&(dyn InstFlowPort + Sync)>,
    held: &HeldSet,
    codes: &[String],
    settings: &RunSettings,
    config: &ScreenConfig,
) -> Vec<ScanRecord> {
    codes
        .par_iter()
        .filter_map(|code| {
            let outcome = data_port
                .fetch_ohlcv(code, settings.start_date, settings.end_date)
                .and_then(|bars| {
                    let inst = inst_flow_for(inst_port, code);
                    scan_latest(code, &bars, inst.as_ref(), held.contains(code), config)
                });
            match outcome {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(code = %code, error = %e, "skipping instrument");
                    None
                }
            }
        })
        .collect()
}

/// Backtests every code in parallel. Results keep the order of `codes`.
pub fn backtest_universe(
    data_port: &(dyn DataPort + Sync),
    inst_port: Option<&(dyn InstFlowPort + Sync)>,
    codes: &[String],
    settings: &RunSettings,
    config: &ScreenConfig,
) -> Vec<BacktestResult> {
    codes
        .par_iter()
        .map(|code| {
            let bars = data_port.fetch_ohlcv(code, settings.start_date, settings.end_date);
            let inst = inst_flow_for(inst_port, code);
            run_or_skip(code, bars, inst.as_ref(), config)
        })
        .collect()
}

/// Hands each record's message card to `notifier`. Returns how many were sent.
pub fn dispatch_notifications(
    records: &[ScanRecord],
    config: &ScreenConfig,
    notifier: &dyn Notifier,
) -> usize {
    let mut sent = 0;
    for record in records {
        let Some(card) = record.card(config) else {
            continue;
        };
        match notifier.notify(&record.code, &card) {
            Ok(()) => sent += 1,
            Err(e) => warn!(code = %record.code, error = %e, "notification failed"),
        }
    }
    sent
}

fn run_scan(
    config_path: &Path,
    args: &RunArgs,
    held_override: Option<PathBuf>,
    full_report: bool,
) -> Result<ExitCode, TwscanError> {
    let (adapter, config) = load_config(config_path)?;
    let mut settings = build_run_settings(&adapter, args)?;
    if held_override.is_some() {
        settings.held_file = held_override;
    }
    settings.full_report |= full_report;

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let codes = resolve_codes(&settings, &data_port)?;
    if codes.is_empty() {
        error!("no codes to scan");
        return Ok(ExitCode::from(5));
    }
    let held = match &settings.held_file {
        Some(path) => load_held(path)?,
        None => HeldSet::new(),
    };
    let inst = load_inst_flows(&settings)?;
    let inst_port = inst.as_ref().map(|a| a as &(dyn InstFlowPort + Sync));

    info!(codes = codes.len(), held = held.len(), "scanning");
    let records = scan_universe(&data_port, inst_port, &held, &codes, &settings, &config);

    let candidates = rank_candidates(&records);
    for c in &candidates {
        info!(code = %c.code, date = %c.date(), score = c.score(), "entry candidate");
    }
    for r in records.iter().filter(|r| r.exit()) {
        info!(code = %r.code, reasons = %r.exit_reasons(), "exit signal on held instrument");
    }
    let sent = dispatch_notifications(&records, &config, &LogNotifier);

    CsvReportAdapter::new(settings.output_dir.clone()).write_scan(
        &records,
        &config,
        settings.full_report,
    )?;
    info!(
        evaluated = records.len(),
        skipped = codes.len() - records.len(),
        candidates = candidates.len(),
        notifications = sent,
        "scan complete"
    );
    Ok(ExitCode::SUCCESS)
}

fn run_backtest(config_path: &Path, args: &RunArgs) -> Result<ExitCode, TwscanError> {
    let (adapter, config) = load_config(config_path)?;
    let settings = build_run_settings(&adapter, args)?;

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let codes = resolve_codes(&settings, &data_port)?;
    if codes.is_empty() {
        error!("no codes to backtest");
        return Ok(ExitCode::from(5));
    }
    let inst = load_inst_flows(&settings)?;
    let inst_port = inst.as_ref().map(|a| a as &(dyn InstFlowPort + Sync));

    info!(
        codes = codes.len(),
        minimum_bars = minimum_bars(&config),
        "running backtest"
    );
    let results = backtest_universe(&data_port, inst_port, &codes, &settings, &config);

    for r in &results {
        let s = &r.summary;
        match &s.status {
            RunStatus::Completed => info!(
                code = %s.code,
                total_return = %format!("{:.2}%", s.total_return * 100.0),
                cagr = %format!("{:.2}%", s.cagr * 100.0),
                trades = s.trade_count,
                win_rate = %s
                    .win_rate
                    .map(|w| format!("{:.1}%", w * 100.0))
                    .unwrap_or_else(|| "n/a".to_string()),
                max_drawdown = %format!("{:.1}%", s.max_drawdown * 100.0),
                "backtest complete"
            ),
            RunStatus::Skipped { reason } => warn!(code = %s.code, reason = %reason, "backtest skipped"),
        }
    }

    CsvReportAdapter::new(settings.output_dir.clone()).write_backtest(&results)?;
    Ok(ExitCode::SUCCESS)
}

fn run_validate(config_path: &Path) -> Result<ExitCode, TwscanError> {
    let (adapter, config) = load_config(config_path)?;
    let settings = build_run_settings(&adapter, &RunArgs::default())?;

    let p = &config.indicators;
    let e = &config.signal.entry;
    println!(
        "indicators: EMA{} VOL{}/{} KD({},{},{}) ADX{} MACD({},{},{}) ATR{} trail EMA{}",
        p.ema_period,
        p.vol_fast,
        p.vol_slow,
        p.kd_n,
        p.kd_smooth_k,
        p.kd_smooth_d,
        p.adx_period,
        p.macd_fast,
        p.macd_slow,
        p.macd_signal,
        p.atr_period,
        p.trail_ema_period
    );
    println!(
        "entry: K {}-{} D {}-{} ADX > {} MACD positive={} cross={}",
        e.kmin, e.kmax, e.dmin, e.dmax, e.adx_min, e.macd_require_positive, e.macd_require_cross
    );
    println!(
        "backtest: capital {} risk {} commission {} slippage {} stop fill {:?}",
        config.backtest.initial_capital,
        config.backtest.risk_per_trade,
        config.backtest.execution.commission_pct,
        config.backtest.execution.slippage_pct,
        config.backtest.stop_fill
    );
    println!("minimum bars per instrument: {}", minimum_bars(&config));
    println!("data directory: {}", settings.data_dir.display());
    match &settings.codes {
        Some(codes) => println!("codes: {}", codes.join(", ")),
        None => println!("codes: all files in data directory"),
    }
    info!("configuration is valid");
    Ok(ExitCode::SUCCESS)
}

fn run_info(config_path: &Path, args: &RunArgs) -> Result<ExitCode, TwscanError> {
    let (adapter, _config) = load_config(config_path)?;
    let settings = build_run_settings(&adapter, args)?;
    let data_port = CsvAdapter::new(settings.data_dir.clone());

    for code in resolve_codes(&settings, &data_port)? {
        match data_port.get_data_range(&code) {
            Ok(Some((first, last, count))) => {
                println!("{code}: {count} bars, {first} to {last}");
            }
            Ok(None) => warn!(code = %code, "no data found"),
            Err(e) => warn!(code = %code, error = %e, "failed to read data"),
        }
    }
    Ok(ExitCode::SUCCESS)
}
