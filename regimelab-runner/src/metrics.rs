//! Performance metrics — pure functions over the trade ledger and equity
//! curve. No dependencies on the engine loop itself.

use serde::{Deserialize, Serialize};

use crate::engine::SimTrade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Mean losing PnL, kept negative.
    pub avg_loss: f64,
    /// |avg_win / avg_loss|, the realized reward/risk.
    pub avg_reward_risk: f64,
    /// Peak-to-trough equity decline as a positive fraction.
    pub max_drawdown: f64,
    /// Annualized mean/stdev ratio of per-trade returns.
    pub sharpe: f64,
    pub total_return: f64,
    pub final_equity: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the closed-trade ledger and equity curve.
    pub fn compute(trades: &[SimTrade], equity_curve: &[f64]) -> Self {
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            avg_reward_risk: avg_reward_risk(trades),
            max_drawdown: max_drawdown(equity_curve),
            sharpe: sharpe_ratio(trades),
            total_return: total_return(equity_curve),
            final_equity: equity_curve.last().copied().unwrap_or(0.0),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive PnL.
pub fn win_rate(trades: &[SimTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.pnl > 0.0).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits / gross losses. Capped at 100.0 for the all-winners edge.
pub fn profit_factor(trades: &[SimTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean winning PnL (0 when there are no winners).
pub fn avg_win(trades: &[SimTrade]) -> f64 {
    mean(trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl))
}

/// Mean losing PnL, negative (0 when there are no losers).
pub fn avg_loss(trades: &[SimTrade]) -> f64 {
    mean(trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl))
}

/// Realized reward/risk: |avg_win / avg_loss|.
pub fn avg_reward_risk(trades: &[SimTrade]) -> f64 {
    let loss = avg_loss(trades);
    if loss == 0.0 {
        return 0.0;
    }
    (avg_win(trades) / loss).abs()
}

/// Maximum drawdown from the equity curve, as a positive fraction.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized mean/stdev ratio of per-trade percentage returns.
/// Zero with fewer than two trades or zero dispersion.
pub fn sharpe_ratio(trades: &[SimTrade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    if initial <= 0.0 {
        return 0.0;
    }
    (equity_curve.last().unwrap() - initial) / initial
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}
