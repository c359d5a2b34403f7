//! Walk-forward analysis — the required validation protocol.
//!
//! Partitions the series into successive (train, test) windows advancing by
//! the test length, backtests only each test window, and aggregates metrics
//! as the arithmetic mean across windows. A single full-period run is not a
//! substitute. Windows own independent simulated capital and position state,
//! so they are evaluated in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::domain::Bar;

use crate::config::BacktestConfig;
use crate::engine::{run_backtest, BacktestError};
use crate::metrics::PerformanceMetrics;

/// Window lengths in bars. Defaults correspond to the production cadence of
/// six months training / one month testing on hourly bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub train_bars: usize,
    pub test_bars: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_bars: 4320,
            test_bars: 720,
        }
    }
}

/// Bar-index ranges of a single walk-forward window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub index: usize,
    /// Train range [start, end), context preceding the test window.
    pub train_start: usize,
    pub train_end: usize,
    /// Test range [start, end), the only bars that are backtested.
    pub test_start: usize,
    pub test_end: usize,
}

/// Per-window outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub window: WindowSpec,
    pub metrics: PerformanceMetrics,
}

/// Arithmetic means of the per-window metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub windows: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub avg_trade_count: f64,
}

/// Complete walk-forward outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    pub aggregate: AggregateMetrics,
}

/// Errors from walk-forward analysis.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("cannot fit any (train {train}, test {test}) window in {total} bars")]
    InsufficientData {
        total: usize,
        train: usize,
        test: usize,
    },
    #[error("test window shorter than backtest warmup ({test} <= {warmup})")]
    TestWindowTooShort { test: usize, warmup: usize },
    #[error("backtest failed on window {window}: {source}")]
    Backtest {
        window: usize,
        #[source]
        source: BacktestError,
    },
}

/// Create the window partition: window i tests
/// [train + i*test, train + (i+1)*test).
pub fn create_windows(
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<WindowSpec>, WalkForwardError> {
    let train = config.train_bars;
    let test = config.test_bars;
    if total_bars < train + test {
        return Err(WalkForwardError::InsufficientData {
            total: total_bars,
            train,
            test,
        });
    }

    let mut windows = Vec::new();
    let mut index = 0;
    loop {
        let test_start = train + index * test;
        let test_end = test_start + test;
        if test_end > total_bars {
            break;
        }
        windows.push(WindowSpec {
            index,
            train_start: test_start - train,
            train_end: test_start,
            test_start,
            test_end,
        });
        index += 1;
    }
    Ok(windows)
}

/// Run the walk-forward protocol. Test windows are backtested in parallel;
/// each gets a fresh simulated capital and position state.
pub fn run_walk_forward(
    bars: &[Bar],
    backtest: &BacktestConfig,
    config: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    if config.test_bars <= backtest.warmup_bars + 1 {
        return Err(WalkForwardError::TestWindowTooShort {
            test: config.test_bars,
            warmup: backtest.warmup_bars,
        });
    }
    let windows = create_windows(bars.len(), config)?;

    let results: Result<Vec<WindowResult>, WalkForwardError> = windows
        .into_par_iter()
        .map(|window| {
            let slice = &bars[window.test_start..window.test_end];
            let result =
                run_backtest(slice, backtest).map_err(|source| WalkForwardError::Backtest {
                    window: window.index,
                    source,
                })?;
            Ok(WindowResult {
                window,
                metrics: result.metrics,
            })
        })
        .collect();
    let mut results = results?;
    // par_iter preserves order, but sort anyway so the contract is explicit.
    results.sort_by_key(|r| r.window.index);

    let aggregate = aggregate_metrics(results.iter().map(|r| &r.metrics));
    Ok(WalkForwardResult {
        windows: results,
        aggregate,
    })
}

/// Arithmetic mean of each metric across windows.
pub fn aggregate_metrics<'a>(
    metrics: impl Iterator<Item = &'a PerformanceMetrics>,
) -> AggregateMetrics {
    let collected: Vec<&PerformanceMetrics> = metrics.collect();
    let n = collected.len();
    if n == 0 {
        return AggregateMetrics {
            windows: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            sharpe: 0.0,
            max_drawdown: 0.0,
            total_return: 0.0,
            avg_trade_count: 0.0,
        };
    }
    let count = n as f64;
    AggregateMetrics {
        windows: n,
        win_rate: collected.iter().map(|m| m.win_rate).sum::<f64>() / count,
        profit_factor: collected.iter().map(|m| m.profit_factor).sum::<f64>() / count,
        sharpe: collected.iter().map(|m| m.sharpe).sum::<f64>() / count,
        max_drawdown: collected.iter().map(|m| m.max_drawdown).sum::<f64>() / count,
        total_return: collected.iter().map(|m| m.total_return).sum::<f64>() / count,
        avg_trade_count: collected.iter().map(|m| m.trade_count as f64).sum::<f64>() / count,
    }
}
