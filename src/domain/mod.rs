//! Core domain types and logic: features, signal generation, risk and simulation.

pub mod ohlcv;
pub mod bar;
pub mod indicator;
pub mod features;
pub mod regime;
pub mod threshold;
pub mod model;
pub mod market_state;
pub mod signal;
pub mod levels;
pub mod signal_engine;
pub mod risk;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod walkforward;
pub mod ranking;
pub mod config_validation;
pub mod error;
