//! End-to-end tests across the feature provider, signal engine, risk manager
//! and both simulators.

mod common;

use approx::assert_relative_eq;
use common::*;
use sigtrader::adapters::file_config_adapter::FileConfigAdapter;
use sigtrader::domain::backtest::{run_batch, BacktestConfig, BatchJob, SimulatorKind};
use sigtrader::domain::bar::{columns, Bar};
use sigtrader::domain::config_validation::build_engine;
use sigtrader::domain::error::TraderError;
use sigtrader::domain::features::build_features;
use sigtrader::domain::market_state::{MarketState, TrendStateDetector};
use sigtrader::domain::metrics::TradeMetrics;
use sigtrader::domain::position::ExitReason;
use sigtrader::domain::regime::{classify_regime, Regime};
use sigtrader::domain::risk::{position_size, RiskManager};
use sigtrader::domain::signal::{HoldReason, SignalKind};
use sigtrader::domain::signal_engine::SignalEngine;
use sigtrader::domain::walkforward::{walk_forward, WalkForwardConfig};

fn scripted_engine() -> SignalEngine {
    SignalEngine::new(Box::new(ScriptedModel::new()), 0.55, None)
}

fn logistic_engine() -> SignalEngine {
    let config = FileConfigAdapter::from_string(MODEL_INI).unwrap();
    build_engine(&config).unwrap()
}

#[test]
fn size_for_one_percent_of_ten_thousand_over_two_points() {
    assert_relative_eq!(position_size(10_000.0, 0.01, 100.0, 98.0), 50.0);
}

#[test]
fn confident_model_in_bullish_trend_buys() {
    let bars: Vec<Bar> = (0..10)
        .map(|i| confirmed_bar(i, 100.0, Tilt::Bullish, 0.9))
        .collect();
    assert_eq!(classify_regime(&bars), Regime::Trending);

    let engine = SignalEngine::new(
        Box::new(FixedModel::new(0.90)),
        0.55,
        Some(Box::new(TrendStateDetector::default())),
    );
    let signal = engine.generate(&bars);

    assert_eq!(signal.kind, SignalKind::Buy);
    assert_eq!(signal.regime, Some(MarketState::Bull));
    assert_relative_eq!(signal.entry.unwrap(), 100.0);
    assert_relative_eq!(signal.stop.unwrap(), 99.0);
    assert_relative_eq!(signal.take_profit.unwrap(), 102.0);
}

#[test]
fn hard_drawdown_turns_buy_into_hold() {
    let bars = vec![confirmed_bar(0, 100.0, Tilt::Bullish, 0.9)];
    let signal = scripted_engine().generate(&bars);
    assert_eq!(signal.kind, SignalKind::Buy);

    let decision = RiskManager::default().enrich(signal, 10_000.0, 0.30);
    assert_eq!(decision.signal.kind, SignalKind::Hold);
    assert_eq!(decision.signal.reason, Some(HoldReason::DrawdownLimit));
    assert_eq!(decision.signal.reason.unwrap().code(), "drawdown_limit");
    assert!(decision.plan.is_none());
}

#[test]
fn generate_ignores_bars_after_the_window() {
    let engine = logistic_engine();
    let bars = build_features(&wavy_ohlcv(300));
    assert_eq!(bars.len(), 300);

    for i in [120, 180, 250] {
        let expected = engine.generate(&bars[..=i]);
        let mut mutated = bars.clone();
        for bar in mutated.iter_mut().skip(i + 1) {
            bar.set(columns::CLOSE, bar.close * 3.0);
            bar.set(columns::RSI, 1.0);
        }
        assert_eq!(engine.generate(&mutated[..=i]), expected);
    }
}

#[test]
fn features_are_causal() {
    let ohlcv = wavy_ohlcv(200);
    let full = build_features(&ohlcv);
    let prefix = build_features(&ohlcv[..=150]);
    let (a, b) = (&full[150], &prefix[150]);
    for column in b.columns() {
        let (x, y) = (a.value(column).unwrap(), b.value(column).unwrap());
        assert!((x - y).abs() < 1e-9, "{column}: {x} vs {y}");
    }
}

#[test]
fn generate_is_pure() {
    let engine = logistic_engine();
    let bars = build_features(&wavy_ohlcv(200));
    assert_eq!(engine.generate(&bars), engine.generate(&bars));
}

#[test]
fn stop_only_exits_at_close_through_stop() {
    let engine = scripted_engine();
    let series = scripted_series(&[
        (100.0, Tilt::Bullish, 0.9),
        (98.5, Tilt::Neutral, 0.1),
        (100.0, Tilt::Neutral, 0.1),
    ]);
    let sim = SimulatorKind::StopOnly.build(&engine, RiskManager::default(), BacktestConfig::default());
    let result = sim.run(&series).unwrap();

    assert_eq!(result.equity_curve.len(), 3);
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_relative_eq!(trade.size, 100.0);
    assert_relative_eq!(trade.exit, 98.5);
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_relative_eq!(result.final_equity, 9_850.0);
}

#[test]
fn risk_aware_exits_at_target_level() {
    let engine = scripted_engine();
    let series = scripted_series(&[
        (100.0, Tilt::Bullish, 0.9),
        (101.0, Tilt::Neutral, 0.1),
        (102.5, Tilt::Neutral, 0.1),
        (103.0, Tilt::Neutral, 0.1),
    ]);
    let sim =
        SimulatorKind::RiskAware.build(&engine, RiskManager::default(), BacktestConfig::default());
    let result = sim.run(&series).unwrap();

    assert_eq!(result.equity_curve.len(), 3);
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_relative_eq!(trade.size, 125.0);
    assert_relative_eq!(trade.exit, 102.0);
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert_relative_eq!(result.final_equity, 10_250.0);
}

#[test]
fn simulators_on_real_features_balance_their_books() {
    let engine = logistic_engine();
    let series = build_features(&wavy_ohlcv(400));
    for kind in [SimulatorKind::StopOnly, SimulatorKind::RiskAware] {
        let sim = kind.build(&engine, RiskManager::default(), BacktestConfig::default());
        let result = sim.run(&series).unwrap();
        let net = TradeMetrics::compute(&result.trades).net_pnl;
        assert_relative_eq!(result.final_equity, result.initial_equity + net, epsilon = 1e-6);
        assert!(result.equity_curve.len() >= 299);
    }
}

#[test]
fn short_series_is_insufficient_data() {
    let engine = scripted_engine();
    let sim = SimulatorKind::StopOnly.build(&engine, RiskManager::default(), BacktestConfig::default());
    assert!(matches!(
        sim.run(&quiet_series(100, 100.0)),
        Err(TraderError::InsufficientData { bars: 100, .. })
    ));
}

#[test]
fn batch_failure_does_not_affect_other_series() {
    let engine = SignalEngine::new(Box::new(PanicAbove::new(150.0)), 0.55, None);
    let mut spike = quiet_series(120, 100.0);
    spike.push(confirmed_bar(120, 200.0, Tilt::Neutral, 0.1));
    let jobs = vec![
        BatchJob {
            label: "calm".into(),
            series: quiet_series(120, 100.0),
        },
        BatchJob {
            label: "spike".into(),
            series: spike,
        },
        BatchJob {
            label: "short".into(),
            series: quiet_series(10, 100.0),
        },
    ];
    let sim = SimulatorKind::StopOnly.build(&engine, RiskManager::default(), BacktestConfig::default());
    let outcomes = run_batch(sim.as_ref(), &jobs);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].label, "calm");
    let calm = outcomes[0].result.as_ref().unwrap();
    assert_eq!(calm.equity_curve.len(), 20);
    assert!(matches!(
        outcomes[1].result,
        Err(TraderError::RunPanicked { ref label, .. }) if label == "spike"
    ));
    assert!(matches!(
        outcomes[2].result,
        Err(TraderError::InsufficientData { .. })
    ));
}

#[test]
fn walk_forward_over_real_features() {
    let engine = logistic_engine();
    let series = build_features(&wavy_ohlcv(400));
    let folds = walk_forward(
        &engine,
        &series,
        WalkForwardConfig {
            train_size: 200,
            test_size: 50,
        },
    )
    .unwrap();

    assert_eq!(folds.len(), 3);
    for fold in &folds {
        assert_eq!(fold.test_end - fold.test_start, 50);
        assert!(fold.trades.len() <= fold.signals);
        assert!(fold.trades.iter().all(|t| t.r_multiple.is_finite()));
    }
}
