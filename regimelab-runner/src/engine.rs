//! Backtest engine — deterministic replay of the decision pipeline.
//!
//! Drives the same regime → strategy → risk chain as the live cycle over a
//! closed historical series, with no external collaborators. One simulated
//! position at a time (a documented simplification; the live risk manager
//! allows three concurrent). A position opened at bar t is filled at that
//! bar's close; from bar t+1 on, each bar's high/low is tested against the
//! stop first, then the first target, then the holding-period time exit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use regimelab_core::domain::{Bar, Direction, PositionId, Signal, StrategyKind};
use regimelab_core::indicators::IndicatorTable;
use regimelab_core::regime::RegimeDetector;
use regimelab_core::risk::RiskManager;
use regimelab_core::strategy::{MeanReversion, Strategy, TrendFollowing};

use crate::config::BacktestConfig;
use crate::metrics::PerformanceMetrics;

/// Errors from the backtest engine.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("insufficient data: {got} bars <= warmup {warmup}")]
    InsufficientData { got: usize, warmup: usize },
}

/// What closed a simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeExit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::TimeExit => write!(f, "time_exit"),
        }
    }
}

/// One closed simulated trade, in exit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTrade {
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size_lots: f64,
    pub pnl: f64,
    /// PnL as a percentage of capital after the close.
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<SimTrade>,
    pub metrics: PerformanceMetrics,
    /// Capital plus unrealized PnL, one point per evaluated bar.
    pub equity_curve: Vec<f64>,
    pub final_capital: f64,
    pub bar_count: usize,
    pub warmup_bars: usize,
}

/// The open simulated position.
struct SimPosition {
    id: PositionId,
    signal: Signal,
    size_lots: f64,
    entry_index: usize,
    entry_time: DateTime<Utc>,
}

/// Run the decision pipeline over a closed historical series.
///
/// Deterministic: identical series and config always yield an identical
/// trade ledger and metrics.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, BacktestError> {
    let warmup = config.warmup_bars;
    if bars.len() <= warmup + 1 {
        return Err(BacktestError::InsufficientData {
            got: bars.len(),
            warmup,
        });
    }

    let core = &config.core;
    let detector = RegimeDetector::new(core.regime.clone());
    let mean_reversion = MeanReversion::new(&core.strategy);
    let trend_following = TrendFollowing::new(&core.strategy);
    let mut risk = RiskManager::new(
        config.initial_capital,
        core.risk.clone(),
        core.instrument.clone(),
    );

    // Causal series: precomputing once equals recomputing per prefix.
    let table = IndicatorTable::compute(bars, &core.indicators);

    let pip = core.instrument.pip;
    let pip_value_per_lot = core.instrument.pip_value_per_lot;

    let mut open: Option<SimPosition> = None;
    let mut trades: Vec<SimTrade> = Vec::new();
    let mut equity_curve: Vec<f64> = Vec::with_capacity(bars.len() - warmup + 1);
    equity_curve.push(config.initial_capital);
    let mut current_day = bars[warmup].timestamp.date_naive();

    for i in warmup..bars.len() {
        let bar = &bars[i];

        let day = bar.timestamp.date_naive();
        if day != current_day {
            risk.reset_daily();
            current_day = day;
        }

        // Exits first: a position opened at bar t is exit-checked from t+1.
        if let Some(position) = &open {
            if let Some((exit_price, reason)) = check_exit(position, bar, i, config) {
                let position = open.take().unwrap();
                let pips = (exit_price - position.signal.entry) / pip
                    * position.signal.direction.sign();
                let pnl = (pips - config.commission_pips) * pip_value_per_lot * position.size_lots;
                risk.close_position(position.id, pnl);
                let capital = risk.state().capital;
                debug!(i, pnl, %reason, "simulated position closed");
                trades.push(SimTrade {
                    direction: position.signal.direction,
                    strategy: position.signal.strategy,
                    entry_time: position.entry_time,
                    exit_time: bar.timestamp,
                    entry_price: position.signal.entry,
                    exit_price,
                    size_lots: position.size_lots,
                    pnl,
                    pnl_pct: if capital != 0.0 {
                        pnl / capital * 100.0
                    } else {
                        0.0
                    },
                    exit_reason: reason,
                    bars_held: i - position.entry_index,
                });
            }
        }

        // Entries: one simulated position at a time.
        if open.is_none() && !risk.state().status.is_halted() {
            let regime = detector.classify(bars, &table, i);
            let strategy: Option<&dyn Strategy> = match regime.strategy() {
                Some(StrategyKind::MeanReversion) => Some(&mean_reversion),
                Some(StrategyKind::TrendFollowing) => Some(&trend_following),
                // Grid places resting orders; it produces no per-bar entries
                // to simulate here.
                Some(StrategyKind::Grid) | None => None,
            };
            if let Some(strategy) = strategy {
                if let Some(signal) = strategy.evaluate(bars, i, &table) {
                    let size_lots = risk.calculate_position_size(
                        signal.entry,
                        signal.stop_loss,
                        strategy.risk_per_trade(),
                    );
                    let risk_amount = risk.state().capital * strategy.risk_per_trade();
                    if size_lots > 0.0 && risk.can_open_position(risk_amount).is_ok() {
                        let id = risk.add_position(&signal, size_lots, risk_amount, bar.timestamp);
                        debug!(i, strategy = %signal.strategy, "simulated position opened");
                        open = Some(SimPosition {
                            id,
                            signal,
                            size_lots,
                            entry_index: i,
                            entry_time: bar.timestamp,
                        });
                    }
                }
            }
        }

        // Equity includes the unrealized PnL of the open position.
        let unrealized = open
            .as_ref()
            .map(|p| {
                let pips = (bar.close - p.signal.entry) / pip * p.signal.direction.sign();
                pips * pip_value_per_lot * p.size_lots
            })
            .unwrap_or(0.0);
        equity_curve.push(risk.state().capital + unrealized);
    }

    // A still-open position stays open; the ledger holds closed trades only
    // and the equity curve already carries its unrealized PnL.
    let metrics = PerformanceMetrics::compute(&trades, &equity_curve);
    Ok(BacktestResult {
        trades,
        metrics,
        equity_curve,
        final_capital: risk.state().capital,
        bar_count: bars.len(),
        warmup_bars: warmup,
    })
}

/// Test a bar against the open position's exits: stop first (conservative),
/// then the first target, then the time exit at the close.
fn check_exit(
    position: &SimPosition,
    bar: &Bar,
    index: usize,
    config: &BacktestConfig,
) -> Option<(f64, ExitReason)> {
    let signal = &position.signal;
    match signal.direction {
        Direction::Long => {
            if bar.low <= signal.stop_loss {
                return Some((signal.stop_loss, ExitReason::StopLoss));
            }
            if bar.high >= signal.take_profit_1 {
                return Some((signal.take_profit_1, ExitReason::TakeProfit));
            }
        }
        Direction::Short => {
            if bar.high >= signal.stop_loss {
                return Some((signal.stop_loss, ExitReason::StopLoss));
            }
            if bar.low <= signal.take_profit_1 {
                return Some((signal.take_profit_1, ExitReason::TakeProfit));
            }
        }
    }
    if index - position.entry_index > config.max_holding_bars {
        return Some((bar.close, ExitReason::TimeExit));
    }
    None
}
