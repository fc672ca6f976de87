//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Symbol, timeframe and data directory resolution
//! - Backtest pipeline over CSV files on disk, single and batch
//! - Per-symbol failures in a batch
//! - Config errors and their exit codes
//! - The signal, rank and walk-forward commands

mod common;

use common::*;
use sigtrader::adapters::csv_adapter::CsvAdapter;
use sigtrader::adapters::file_config_adapter::FileConfigAdapter;
use sigtrader::cli;
use sigtrader::domain::backtest::SimulatorKind;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_csv(dir: &Path, name: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    fs::write(dir.join(name), content).unwrap();
}

fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

fn full_ini(extra: &str) -> String {
    format!(
        "{MODEL_INI}\n[signal]\nthreshold = 0.55\n\n[backtest]\ninitial_equity = 10000\nwarmup = 100\n{extra}"
    )
}

fn config(extra: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(&full_ini(extra)).unwrap()
}

mod resolution {
    use super::*;

    #[test]
    fn symbols_from_flag_win_over_config() {
        let adapter = config("symbols = BTC, ETH ,\n");
        assert_eq!(cli::resolve_symbols(&[], &adapter), vec!["BTC", "ETH"]);
        assert_eq!(
            cli::resolve_symbols(&["SOL".to_string()], &adapter),
            vec!["SOL"]
        );
    }

    #[test]
    fn symbols_empty_without_config() {
        let adapter = config("");
        assert!(cli::resolve_symbols(&[], &adapter).is_empty());
    }

    #[test]
    fn timeframe_defaults_to_hourly() {
        let adapter = config("");
        assert_eq!(cli::resolve_timeframe(None, &adapter), "1h");
        assert_eq!(cli::resolve_timeframe(Some("4h"), &adapter), "4h");

        let with_data = FileConfigAdapter::from_string("[data]\ntimeframe = 1d\ndir = /srv/bars\n")
            .unwrap();
        assert_eq!(cli::resolve_timeframe(None, &with_data), "1d");
        assert_eq!(
            cli::resolve_data_dir(None, &with_data),
            Some(PathBuf::from("/srv/bars"))
        );
        assert_eq!(
            cli::resolve_data_dir(Some(&PathBuf::from("/tmp")), &with_data),
            Some(PathBuf::from("/tmp"))
        );
    }
}

mod backtest_pipeline {
    use super::*;

    #[test]
    fn single_symbol_writes_equity_and_trades() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "BTC_1h.csv", &wavy_ohlcv(300));
        let output = dir.path().join("equity.csv");

        let code = cli::run_backtest_pipeline(
            &CsvAdapter::new(dir.path().to_path_buf()),
            &config(""),
            &["BTC".to_string()],
            "1h",
            SimulatorKind::StopOnly,
            Some(output.as_path()),
        );

        assert!(same_code(code, ExitCode::SUCCESS));
        let curve = fs::read_to_string(&output).unwrap();
        assert_eq!(curve.lines().count(), 1 + 200);
        assert!(dir.path().join("equity_trades.csv").exists());
    }

    #[test]
    fn batch_writes_one_file_per_symbol() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "BTC_1h.csv", &wavy_ohlcv(300));
        write_csv(dir.path(), "ETH_1h.csv", &wavy_ohlcv(250));
        let output = dir.path().join("equity.csv");

        let code = cli::run_backtest_pipeline(
            &CsvAdapter::new(dir.path().to_path_buf()),
            &config(""),
            &["BTC".to_string(), "ETH".to_string()],
            "1h",
            SimulatorKind::RiskAware,
            Some(output.as_path()),
        );

        assert!(same_code(code, ExitCode::SUCCESS));
        let btc = fs::read_to_string(dir.path().join("equity_BTC.csv")).unwrap();
        let eth = fs::read_to_string(dir.path().join("equity_ETH.csv")).unwrap();
        assert_eq!(btc.lines().count(), 1 + 199);
        assert_eq!(eth.lines().count(), 1 + 149);
    }

    #[test]
    fn failing_symbol_does_not_stop_the_others() {
        let dir = TempDir::new().unwrap();
        let port = MockDataPort::new()
            .with_bars("GOOD", wavy_ohlcv(300))
            .with_error("BAD", "connection reset");
        let output = dir.path().join("equity.csv");

        let code = cli::run_backtest_pipeline(
            &port,
            &config(""),
            &["GOOD".to_string(), "BAD".to_string()],
            "1h",
            SimulatorKind::StopOnly,
            Some(output.as_path()),
        );

        assert!(same_code(code, ExitCode::from(3)));
        assert!(output.exists());
    }

    #[test]
    fn too_few_bars_is_exit_five() {
        let port = MockDataPort::new().with_bars("BTC", wavy_ohlcv(80));
        let code = cli::run_backtest_pipeline(
            &port,
            &config(""),
            &["BTC".to_string()],
            "1h",
            SimulatorKind::StopOnly,
            None,
        );
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn missing_model_is_config_error() {
        let port = MockDataPort::new().with_bars("BTC", wavy_ohlcv(300));
        let adapter = FileConfigAdapter::from_string("[backtest]\nwarmup = 100\n").unwrap();
        let code = cli::run_backtest_pipeline(
            &port,
            &adapter,
            &["BTC".to_string()],
            "1h",
            SimulatorKind::StopOnly,
            None,
        );
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn no_symbols_is_config_error() {
        let code = cli::run_backtest_pipeline(
            &MockDataPort::new(),
            &config(""),
            &[],
            "1h",
            SimulatorKind::StopOnly,
            None,
        );
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let code = cli::run_backtest_pipeline(
            &MockDataPort::new(),
            &config(""),
            &["XYZ".to_string()],
            "1h",
            SimulatorKind::StopOnly,
            None,
        );
        assert!(same_code(code, ExitCode::from(5)));
    }
}

mod commands {
    use super::*;

    #[test]
    fn load_config_from_disk() {
        use sigtrader::ports::config_port::ConfigPort;

        let file = write_temp_ini(&full_ini(""));
        let adapter = match cli::load_config(file.path()) {
            Ok(a) => a,
            Err(code) => panic!("unexpected {code:?}"),
        };
        assert_eq!(adapter.get_int("backtest", "warmup", 0), 100);
    }

    #[test]
    fn load_config_missing_file_is_exit_two() {
        let code = match cli::load_config(Path::new("/nonexistent/sigtrader.ini")) {
            Err(code) => code,
            Ok(_) => panic!("expected a parse error"),
        };
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn signal_command_succeeds() {
        let port = MockDataPort::new().with_bars("BTC", wavy_ohlcv(200));
        let code = cli::run_signal(&port, &config(""), "BTC", "1h");
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn signal_command_reports_missing_data() {
        let code = cli::run_signal(&MockDataPort::new(), &config(""), "BTC", "1h");
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn walk_forward_command_succeeds() {
        let port = MockDataPort::new().with_bars("BTC", wavy_ohlcv(400));
        let adapter = config("\n[walk_forward]\ntrain_size = 200\ntest_size = 50\n");
        let code = cli::run_walk_forward(&port, &adapter, "BTC", "1h");
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn walk_forward_with_default_folds_needs_more_data() {
        let port = MockDataPort::new().with_bars("BTC", wavy_ohlcv(400));
        let code = cli::run_walk_forward(&port, &config(""), "BTC", "1h");
        assert!(same_code(code, ExitCode::from(5)));
    }

    #[test]
    fn signal_with_htf_reads_the_second_timeframe() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "BTC_1h.csv", &wavy_ohlcv(200));
        let port = CsvAdapter::new(dir.path().to_path_buf());
        let adapter = FileConfigAdapter::from_string(&format!(
            "{MODEL_INI}\n[signal]\nthreshold = 0.55\nhtf_timeframe = 4h\n"
        ))
        .unwrap();

        let missing = cli::run_signal(&port, &adapter, "BTC", "1h");
        assert!(same_code(missing, ExitCode::from(5)));

        write_csv(dir.path(), "BTC_4h.csv", &wavy_ohlcv(150));
        let code = cli::run_signal(&port, &adapter, "BTC", "1h");
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn rank_command_succeeds() {
        let port = MockDataPort::new()
            .with_bars("BTC", wavy_ohlcv(120))
            .with_bars("ETH", wavy_ohlcv(60));
        let code = cli::run_rank(
            &port,
            &config(""),
            &["BTC".to_string(), "ETH".to_string()],
            "1h",
            Some(1),
        );
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn rank_reports_failing_symbol() {
        let port = MockDataPort::new()
            .with_bars("BTC", wavy_ohlcv(120))
            .with_error("BAD", "timeout");
        let code = cli::run_rank(
            &port,
            &config(""),
            &["BTC".to_string(), "BAD".to_string()],
            "1h",
            None,
        );
        assert!(same_code(code, ExitCode::from(3)));
    }

    #[test]
    fn rank_without_symbols_is_config_error() {
        let code = cli::run_rank(&MockDataPort::new(), &config(""), &[], "1h", None);
        assert!(same_code(code, ExitCode::from(2)));
    }
}
