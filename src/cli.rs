//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_batch, BacktestConfig, BacktestResult, BatchJob, SimulatorKind};
use crate::domain::bar::Bar;
use crate::domain::config_validation::{
    build_engine, load_backtest_config, load_market_state_detector, load_risk_config,
    load_risk_policy, load_walk_forward_config,
};
use crate::domain::error::TraderError;
use crate::domain::features::build_features;
use crate::domain::market_state::{MarketStateDetector, TrendStateDetector};
use crate::domain::metrics::{PerformanceMetrics, TradeMetrics};
use crate::domain::ranking::{rank_score, rank_symbols, RankedSymbol};
use crate::domain::regime::classify_regime;
use crate::domain::risk::RiskManager;
use crate::domain::signal_engine::{htf_filter, SignalEngine};
use crate::domain::threshold::dynamic_threshold;
use crate::domain::walkforward::walk_forward;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_TIMEFRAME: &str = "1h";

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Regime-aware signal engine and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over one or more symbols
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <symbol>_<timeframe>.csv files
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Repeat for a batch run
        #[arg(long)]
        symbol: Vec<String>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long, default_value = "stop-only")]
        simulator: SimulatorKind,
        /// Equity curve CSV; trades go to <stem>_trades.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the signal for the latest bar
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Rank symbols by momentum, trend and volume
    Rank {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Defaults to [backtest] symbols
        #[arg(long)]
        symbol: Vec<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Show only the best N
        #[arg(long)]
        top: Option<usize>,
    },
    /// Walk-forward validation of the signal engine
    WalkForward {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        timeframe: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            timeframe,
            simulator,
            output,
        } => with_inputs(&config, data.as_ref(), |data_port, adapter| {
            let symbols = resolve_symbols(&symbol, adapter);
            let timeframe = resolve_timeframe(timeframe.as_deref(), adapter);
            run_backtest_pipeline(
                data_port,
                adapter,
                &symbols,
                &timeframe,
                simulator,
                output.as_deref(),
            )
        }),
        Command::Signal {
            config,
            data,
            symbol,
            timeframe,
        } => with_inputs(&config, data.as_ref(), |data_port, adapter| {
            let timeframe = resolve_timeframe(timeframe.as_deref(), adapter);
            run_signal(data_port, adapter, &symbol, &timeframe)
        }),
        Command::Rank {
            config,
            data,
            symbol,
            timeframe,
            top,
        } => with_inputs(&config, data.as_ref(), |data_port, adapter| {
            let symbols = resolve_symbols(&symbol, adapter);
            let timeframe = resolve_timeframe(timeframe.as_deref(), adapter);
            run_rank(data_port, adapter, &symbols, &timeframe, top)
        }),
        Command::WalkForward {
            config,
            data,
            symbol,
            timeframe,
        } => with_inputs(&config, data.as_ref(), |data_port, adapter| {
            let timeframe = resolve_timeframe(timeframe.as_deref(), adapter);
            run_walk_forward(data_port, adapter, &symbol, &timeframe)
        }),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`). Repeated calls are
/// no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn with_inputs(
    config_path: &Path,
    data_override: Option<&PathBuf>,
    f: impl FnOnce(&dyn DataPort, &dyn ConfigPort) -> ExitCode,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_dir = match resolve_data_dir(data_override, &adapter) {
        Some(d) => d,
        None => {
            let err = TraderError::ConfigMissing {
                section: "data".into(),
                key: "dir".into(),
            };
            eprintln!("error: {err} (or pass --data)");
            return (&err).into();
        }
    };
    let data_port = CsvAdapter::new(data_dir);
    f(&data_port, &adapter)
}

pub fn resolve_data_dir(data_override: Option<&PathBuf>, config: &dyn ConfigPort) -> Option<PathBuf> {
    data_override
        .cloned()
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
}

/// `--symbol` wins over `[backtest] symbols` (comma-separated).
pub fn resolve_symbols(symbol_override: &[String], config: &dyn ConfigPort) -> Vec<String> {
    if !symbol_override.is_empty() {
        return symbol_override.to_vec();
    }
    config
        .get_string("backtest", "symbols")
        .map(|s| {
            s.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn resolve_timeframe(timeframe_override: Option<&str>, config: &dyn ConfigPort) -> String {
    timeframe_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "timeframe"))
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string())
}

fn load_series(
    data_port: &dyn DataPort,
    symbol: &str,
    timeframe: &str,
) -> Result<Vec<Bar>, TraderError> {
    let ohlcv = data_port.fetch_bars(symbol, timeframe)?;
    info!(symbol, timeframe, bars = ohlcv.len(), "loaded bars");
    Ok(build_features(&ohlcv))
}

struct Pipeline {
    engine: SignalEngine,
    risk: RiskManager,
    backtest: BacktestConfig,
}

fn load_pipeline(config: &dyn ConfigPort) -> Result<Pipeline, TraderError> {
    Ok(Pipeline {
        engine: build_engine(config)?,
        risk: RiskManager::new(load_risk_config(config), load_risk_policy(config)),
        backtest: load_backtest_config(config)?,
    })
}

/// Per-symbol output file for batch runs: `<stem>_<symbol>.csv`.
pub fn output_for(output: &Path, symbol: &str, batch: bool) -> PathBuf {
    if !batch {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "equity".to_string());
    output.with_file_name(format!("{}_{}.csv", stem, symbol))
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbols: &[String],
    timeframe: &str,
    simulator: SimulatorKind,
    output_path: Option<&Path>,
) -> ExitCode {
    if symbols.is_empty() {
        let err = TraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbols".into(),
        };
        eprintln!("error: {err} (or pass --symbol)");
        return (&err).into();
    }

    let pipeline = match load_pipeline(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut first_error: Option<TraderError> = None;
    let mut jobs = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match load_series(data_port, symbol, timeframe) {
            Ok(series) => jobs.push(BatchJob {
                label: symbol.clone(),
                series,
            }),
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }
    if jobs.is_empty() {
        let err = first_error.unwrap_or(TraderError::NoData {
            symbol: symbols.join(","),
            timeframe: timeframe.to_string(),
        });
        eprintln!("error: {err}");
        return (&err).into();
    }

    eprintln!(
        "Running {} backtest: {} series, timeframe {}",
        simulator,
        jobs.len(),
        timeframe
    );
    let sim = simulator.build(&pipeline.engine, pipeline.risk, pipeline.backtest);
    let outcomes = run_batch(sim.as_ref(), &jobs);

    let batch = outcomes.len() > 1;
    let reporter = CsvReportAdapter::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => {
                print_summary(&outcome.label, &result);
                if let Some(output) = output_path {
                    let path = output_for(output, &outcome.label, batch);
                    match reporter.write_result(&result, &path) {
                        Ok(()) => eprintln!("Equity curve written to: {}", path.display()),
                        Err(e) => {
                            eprintln!("error: {e}");
                            first_error.get_or_insert(e);
                        }
                    }
                }
            }
            Err(e) => {
                eprintln!("error: {}: {e}", outcome.label);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

fn print_summary(label: &str, result: &BacktestResult) {
    let perf = PerformanceMetrics::compute(&result.equity_curve);
    let trades = TradeMetrics::compute(&result.trades);
    eprintln!("\n=== {} ===", label);
    eprintln!("Final Equity:     {:.2}", result.final_equity);
    eprintln!("Total Return:     {:.2}%", result.total_return() * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", perf.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", perf.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", trades.total_trades);
    eprintln!("Profit Factor:    {:.2}", trades.profit_factor);
    eprintln!("Expectancy:       {:.2}", trades.expectancy);
    eprintln!("Risk Score:       {}", trades.risk_score);
}

pub fn run_signal(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: &str,
    timeframe: &str,
) -> ExitCode {
    let result = load_pipeline(config)
        .and_then(|p| load_series(data_port, symbol, timeframe).map(|s| (p, s)));
    let (pipeline, series) = match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut signal = pipeline.engine.generate(&series);
    if let Some(htf) = config.get_string("signal", "htf_timeframe") {
        let htf_state = match load_series(data_port, symbol, &htf) {
            Ok(htf_series) => state_detector(config).detect(&htf_series),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        println!(
            "htf state:    {} ({htf})",
            htf_state.map(|s| s.as_str()).unwrap_or("-")
        );
        signal = htf_filter(signal, htf_state);
    }
    let regime = classify_regime(&series);
    let strength = dynamic_threshold(Some(regime)).grade(signal.probability);
    let fmt_level = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".into());

    if let Some(last) = series.last() {
        println!("bar:          {}", last.timestamp);
    }
    println!("signal:       {}", signal.kind);
    println!("probability:  {:.4}", signal.probability);
    println!("strength:     {}", strength);
    println!("regime:       {}", regime);
    println!(
        "market state: {}",
        signal.regime.map(|s| s.as_str()).unwrap_or("-")
    );
    println!("entry:        {}", fmt_level(signal.entry));
    println!("stop:         {}", fmt_level(signal.stop));
    println!("take profit:  {}", fmt_level(signal.take_profit));
    if let Some(reason) = signal.reason {
        println!("reason:       {}", reason.code());
    }

    let decision = pipeline
        .risk
        .enrich(signal, pipeline.backtest.initial_equity, 0.0);
    match (&decision.plan, decision.signal.reason) {
        (Some(plan), _) => println!(
            "plan:         size {:.6} risking {:.2}% ({:.2})",
            plan.position_size,
            plan.risk_pct * 100.0,
            plan.risk_amount()
        ),
        (None, Some(reason)) if decision.signal.is_hold() => {
            println!("plan:         none ({})", reason.code())
        }
        (None, _) => println!("plan:         none"),
    }
    ExitCode::SUCCESS
}

/// The configured detector, or the stock one when gating is disabled.
fn state_detector(config: &dyn ConfigPort) -> Box<dyn MarketStateDetector> {
    load_market_state_detector(config).unwrap_or_else(|| Box::new(TrendStateDetector::default()))
}

/// Score every symbol that loads and print them best first. Symbols that fail
/// to load are skipped; the first such error sets the exit code.
pub fn run_rank(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbols: &[String],
    timeframe: &str,
    top: Option<usize>,
) -> ExitCode {
    if symbols.is_empty() {
        let err = TraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbols".into(),
        };
        eprintln!("error: {err} (or pass --symbol)");
        return (&err).into();
    }

    let detector = state_detector(config);
    let mut first_error: Option<TraderError> = None;
    let mut entries = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match data_port.fetch_bars(symbol, timeframe) {
            Ok(ohlcv) => {
                let state = detector.detect(&build_features(&ohlcv));
                entries.push(RankedSymbol {
                    symbol: symbol.clone(),
                    score: rank_score(&ohlcv, state),
                    state,
                });
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    let ranked = rank_symbols(entries, top);
    println!("rank  symbol        score  state");
    for (n, entry) in ranked.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:>7.4}  {}",
            n + 1,
            entry.symbol,
            entry.score,
            entry.state.map(|s| s.as_str()).unwrap_or("-")
        );
    }

    match first_error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

pub fn run_walk_forward(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: &str,
    timeframe: &str,
) -> ExitCode {
    let folds = build_engine(config)
        .and_then(|engine| load_walk_forward_config(config).map(|wf| (engine, wf)))
        .and_then(|(engine, wf)| {
            let series = load_series(data_port, symbol, timeframe)?;
            walk_forward(&engine, &series, wf)
        });
    let folds = match folds {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("fold  start  test_start  test_end  signals  trades  win_rate  expectancy_r");
    for (n, fold) in folds.iter().enumerate() {
        println!(
            "{:>4}  {:>5}  {:>10}  {:>8}  {:>7}  {:>6}  {:>7.1}%  {:>12.3}",
            n + 1,
            fold.start,
            fold.test_start,
            fold.test_end,
            fold.signals,
            fold.trades.len(),
            fold.win_rate() * 100.0,
            fold.expectancy
        );
    }
    let all: Vec<f64> = folds
        .iter()
        .flat_map(|f| f.trades.iter().map(|t| t.r_multiple))
        .collect();
    let summary = TradeMetrics::from_pnls(&all);
    println!(
        "overall: {} trades, profit factor {:.2}, expectancy {:.3}R",
        summary.total_trades, summary.profit_factor, summary.expectancy
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_for_single_and_batch() {
        let out = Path::new("/tmp/run/equity.csv");
        assert_eq!(output_for(out, "BTC", false), PathBuf::from("/tmp/run/equity.csv"));
        assert_eq!(output_for(out, "BTC", true), PathBuf::from("/tmp/run/equity_BTC.csv"));
    }

    #[test]
    fn cli_parses_backtest_batch() {
        let cli = Cli::try_parse_from([
            "sigtrader",
            "backtest",
            "--config",
            "c.ini",
            "--symbol",
            "BTC",
            "--symbol",
            "ETH",
            "--simulator",
            "risk-aware",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                symbol, simulator, ..
            } => {
                assert_eq!(symbol, vec!["BTC", "ETH"]);
                assert_eq!(simulator, SimulatorKind::RiskAware);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_rank() {
        let cli = Cli::try_parse_from([
            "sigtrader", "rank", "--config", "c.ini", "--symbol", "BTC", "--top", "5",
        ])
        .unwrap();
        match cli.command {
            Command::Rank { symbol, top, .. } => {
                assert_eq!(symbol, vec!["BTC"]);
                assert_eq!(top, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_simulator() {
        let parsed = Cli::try_parse_from([
            "sigtrader",
            "backtest",
            "--config",
            "c.ini",
            "--simulator",
            "martingale",
        ]);
        assert!(parsed.is_err());
    }
}
