//! Risk management — position sizing, limit gating, and the trading/halted
//! state machine.
//!
//! `RiskState` is an explicit value object owned by the `RiskManager`; nothing
//! else mutates it. Gating (`can_open_position`) checks limits in a fixed
//! short-circuit order; circuit breakers (daily loss, drawdown, consecutive
//! losses) are re-evaluated after every capital change and flip the state to
//! halted. Halted is sticky: only an explicit resume (or the connectivity
//! auto-resume owned by the emergency monitor) restores trading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Instrument, RiskConfig};
use crate::domain::{Position, PositionId, Signal};
use crate::emergency::EmergencyReason;

/// Why trading is halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    DailyLossLimit,
    MaxDrawdown,
    ConsecutiveLosses,
    Emergency(EmergencyReason),
    Manual,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::DailyLossLimit => write!(f, "daily loss limit reached"),
            HaltReason::MaxDrawdown => write!(f, "maximum drawdown reached"),
            HaltReason::ConsecutiveLosses => write!(f, "consecutive losses"),
            HaltReason::Emergency(reason) => write!(f, "emergency stop: {reason}"),
            HaltReason::Manual => write!(f, "manual halt"),
        }
    }
}

/// The trading/halted state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingStatus {
    Trading,
    Halted(HaltReason),
}

impl TradingStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, TradingStatus::Halted(_))
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        match self {
            TradingStatus::Trading => None,
            TradingStatus::Halted(reason) => Some(*reason),
        }
    }
}

/// All mutable risk bookkeeping, threaded through each cycle by the
/// orchestrator. `peak_capital` is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub initial_capital: f64,
    pub capital: f64,
    pub peak_capital: f64,
    pub daily_pnl: f64,
    pub consecutive_losses: u32,
    pub daily_trade_count: u32,
    pub open_positions: Vec<Position>,
    pub status: TradingStatus,
}

impl RiskState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            peak_capital: initial_capital,
            daily_pnl: 0.0,
            consecutive_losses: 0,
            daily_trade_count: 0,
            open_positions: Vec::new(),
            status: TradingStatus::Trading,
        }
    }

    /// Drawdown = (peak - capital) / peak, recomputed on every read.
    pub fn drawdown(&self) -> f64 {
        if self.peak_capital <= 0.0 {
            return 0.0;
        }
        (self.peak_capital - self.capital) / self.peak_capital
    }

    /// Sum of dollar risk across open positions.
    pub fn total_open_risk(&self) -> f64 {
        self.open_positions.iter().map(|p| p.risk_amount).sum()
    }
}

/// A rejected open attempt. Expected and non-fatal: it blocks only the
/// attempted trade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskViolation {
    #[error("trading halted: {0}")]
    Halted(HaltReason),
    #[error("risk {requested:.2} exceeds per-trade limit {limit:.2}")]
    PerTradeRisk { requested: f64, limit: f64 },
    #[error("maximum concurrent positions reached ({open}/{max})")]
    MaxConcurrent { open: usize, max: usize },
    #[error("total portfolio risk {total:.2} would exceed limit {limit:.2}")]
    PortfolioRisk { total: f64, limit: f64 },
    #[error("daily trade limit reached ({count}/{max})")]
    DailyTradeLimit { count: u32, max: u32 },
}

/// Snapshot of the account for the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub initial_capital: f64,
    pub capital: f64,
    pub peak_capital: f64,
    pub daily_pnl: f64,
    pub total_return: f64,
    pub drawdown: f64,
    pub open_positions: usize,
    pub consecutive_losses: u32,
    pub daily_trade_count: u32,
    pub halted: bool,
    pub halt_reason: Option<HaltReason>,
}

/// Risk headroom figures for the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_open_risk: f64,
    pub total_open_risk_pct: f64,
    pub available_risk: f64,
    pub max_position_risk: f64,
    pub daily_loss_limit: f64,
    pub daily_loss_remaining: f64,
}

/// Sizes positions and enforces the limit stack.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    instrument: Instrument,
    state: RiskState,
    next_position_id: u64,
}

impl RiskManager {
    pub fn new(initial_capital: f64, config: RiskConfig, instrument: Instrument) -> Self {
        Self {
            config,
            instrument,
            state: RiskState::new(initial_capital),
            next_position_id: 1,
        }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Check whether a new position with the given dollar risk is allowed.
    /// Limits short-circuit in a fixed order; the first violated limit wins.
    pub fn can_open_position(&self, risk_amount: f64) -> Result<(), RiskViolation> {
        if let TradingStatus::Halted(reason) = self.state.status {
            return Err(RiskViolation::Halted(reason));
        }

        let per_trade_limit = self.state.capital * self.config.max_risk_per_trade;
        if risk_amount > per_trade_limit {
            return Err(RiskViolation::PerTradeRisk {
                requested: risk_amount,
                limit: per_trade_limit,
            });
        }

        if self.state.open_positions.len() >= self.config.max_concurrent_positions {
            return Err(RiskViolation::MaxConcurrent {
                open: self.state.open_positions.len(),
                max: self.config.max_concurrent_positions,
            });
        }

        let portfolio_limit = self.state.capital * self.config.max_total_risk;
        let total = self.state.total_open_risk() + risk_amount;
        if total > portfolio_limit {
            return Err(RiskViolation::PortfolioRisk {
                total,
                limit: portfolio_limit,
            });
        }

        if self.state.daily_trade_count >= self.config.max_daily_trades {
            return Err(RiskViolation::DailyTradeLimit {
                count: self.state.daily_trade_count,
                max: self.config.max_daily_trades,
            });
        }

        Ok(())
    }

    /// Position size in lots for the given entry/stop and risk fraction.
    ///
    /// size = (capital * risk_pct / stop_distance_pips) / pip_value_per_lot,
    /// capped so the required margin stays within the configured fraction of
    /// capital. Returns 0.0 when the stop sits at the entry — the caller must
    /// treat that as no-trade, never as a zero divisor.
    pub fn calculate_position_size(&self, entry: f64, stop: f64, risk_pct: f64) -> f64 {
        if entry <= 0.0 || risk_pct <= 0.0 {
            return 0.0;
        }
        let price_risk_pips = self.instrument.price_to_pips((entry - stop).abs());
        if price_risk_pips == 0.0 {
            return 0.0;
        }

        let risk_amount = self.state.capital * risk_pct;
        let risk_per_pip = risk_amount / price_risk_pips;
        let lots = risk_per_pip / self.instrument.pip_value_per_lot;

        // Margin cap: required margin may not exceed the configured slice of
        // capital at account leverage.
        let max_margin = self.state.capital * self.config.max_position_capital_pct;
        let max_lots =
            max_margin * self.instrument.leverage / (self.instrument.lot_units * entry);

        lots.min(max_lots)
    }

    /// Register a confirmed fill. The caller has already passed
    /// `can_open_position` and sized the trade.
    pub fn add_position(
        &mut self,
        signal: &Signal,
        size_lots: f64,
        risk_amount: f64,
        opened_at: DateTime<Utc>,
    ) -> PositionId {
        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        let position = Position::from_signal(id, signal, size_lots, risk_amount, opened_at);
        info!(
            strategy = %position.strategy,
            direction = %position.direction,
            size_lots,
            entry = position.entry_price,
            "position opened"
        );
        self.state.open_positions.push(position);
        self.state.daily_trade_count += 1;
        id
    }

    /// Close a position and apply its realized PnL to the books, then
    /// re-evaluate the circuit breakers. Returns the closed position.
    pub fn close_position(&mut self, id: PositionId, pnl: f64) -> Option<Position> {
        let index = self.state.open_positions.iter().position(|p| p.id == id)?;
        let position = self.state.open_positions.remove(index);

        self.state.capital += pnl;
        self.state.daily_pnl += pnl;
        if self.state.capital > self.state.peak_capital {
            self.state.peak_capital = self.state.capital;
        }

        if pnl < 0.0 {
            self.state.consecutive_losses += 1;
            warn!(
                pnl,
                consecutive = self.state.consecutive_losses,
                "losing trade closed"
            );
        } else {
            self.state.consecutive_losses = 0;
            info!(pnl, capital = self.state.capital, "winning trade closed");
        }

        self.check_circuit_breakers();
        Some(position)
    }

    /// Evaluate the halt conditions against current state. Idempotent; does
    /// nothing while already halted.
    pub fn check_circuit_breakers(&mut self) {
        if self.state.status.is_halted() {
            return;
        }
        if self.state.daily_pnl < -(self.state.capital * self.config.max_daily_loss) {
            self.halt(HaltReason::DailyLossLimit);
        } else if self.state.drawdown() >= self.config.max_drawdown {
            self.halt(HaltReason::MaxDrawdown);
        } else if self.state.consecutive_losses >= self.config.max_consecutive_losses {
            self.halt(HaltReason::ConsecutiveLosses);
        }
    }

    /// Force the halted state.
    pub fn halt(&mut self, reason: HaltReason) {
        if !self.state.status.is_halted() {
            error!(%reason, "TRADING HALTED");
            self.state.status = TradingStatus::Halted(reason);
        }
    }

    /// Resume after review. Clears the loss streak so the breaker does not
    /// immediately re-trip.
    pub fn resume(&mut self) {
        if self.state.status.is_halted() {
            info!("trading resumed");
            self.state.status = TradingStatus::Trading;
            self.state.consecutive_losses = 0;
        }
    }

    /// Reset daily counters. Invoked by the orchestrator at each UTC
    /// calendar-day boundary.
    pub fn reset_daily(&mut self) {
        self.state.daily_pnl = 0.0;
        self.state.daily_trade_count = 0;
    }

    /// Ratchet trailing stops on open positions toward the current price.
    /// Positions whose high-water touched tp1 get their stop moved to
    /// breakeven first (arming the trail).
    pub fn update_trailing_stops(&mut self, current_price: f64) {
        for position in &mut self.state.open_positions {
            if let Some(trailing) = position.trailing {
                if !trailing.active && position.price_move(current_price) >= 0.0 {
                    let tp1_reached = match position.direction {
                        crate::domain::Direction::Long => current_price >= position.take_profit_1,
                        crate::domain::Direction::Short => current_price <= position.take_profit_1,
                    };
                    if tp1_reached {
                        position.arm_breakeven();
                        position.partial_closed = true;
                        info!(id = position.id.0, "tp1 reached: stop to breakeven, trail armed");
                    }
                }
                if let Some(new_stop) = position.update_trailing_stop(current_price) {
                    info!(id = position.id.0, new_stop, "trailing stop updated");
                }
            }
        }
    }

    pub fn account_summary(&self) -> AccountSummary {
        let s = &self.state;
        AccountSummary {
            initial_capital: s.initial_capital,
            capital: s.capital,
            peak_capital: s.peak_capital,
            daily_pnl: s.daily_pnl,
            total_return: if s.initial_capital > 0.0 {
                (s.capital - s.initial_capital) / s.initial_capital
            } else {
                0.0
            },
            drawdown: s.drawdown(),
            open_positions: s.open_positions.len(),
            consecutive_losses: s.consecutive_losses,
            daily_trade_count: s.daily_trade_count,
            halted: s.status.is_halted(),
            halt_reason: s.status.halt_reason(),
        }
    }

    pub fn risk_metrics(&self) -> RiskMetrics {
        let s = &self.state;
        let total_open_risk = s.total_open_risk();
        RiskMetrics {
            total_open_risk,
            total_open_risk_pct: if s.capital > 0.0 {
                total_open_risk / s.capital
            } else {
                0.0
            },
            available_risk: s.capital * self.config.max_total_risk - total_open_risk,
            max_position_risk: s.capital * self.config.max_risk_per_trade,
            daily_loss_limit: s.capital * self.config.max_daily_loss,
            daily_loss_remaining: s.capital * self.config.max_daily_loss + s.daily_pnl,
        }
    }
}
