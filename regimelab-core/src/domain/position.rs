//! Open-position tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{Direction, Signal, StrategyKind};

/// Identifier for an open position, assigned by the risk manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

/// Trailing-stop state for a position. Armed at open (trend following),
/// activated once the first take-profit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trailing {
    /// Trail distance in price units.
    pub distance: f64,
    /// Trailing only ratchets after tp1 has been touched.
    pub active: bool,
}

/// An open position. Created when the risk manager accepts a signal,
/// mutated only by trailing-stop updates, destroyed on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry_price: f64,
    pub size_lots: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: Option<f64>,
    /// Dollar amount at risk, counted against the portfolio risk budget.
    pub risk_amount: f64,
    pub opened_at: DateTime<Utc>,
    /// Set once tp1 has filled half the position.
    pub partial_closed: bool,
    pub trailing: Option<Trailing>,
}

impl Position {
    pub fn from_signal(
        id: PositionId,
        signal: &Signal,
        size_lots: f64,
        risk_amount: f64,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            direction: signal.direction,
            strategy: signal.strategy,
            entry_price: signal.entry,
            size_lots,
            stop_loss: signal.stop_loss,
            take_profit_1: signal.take_profit_1,
            take_profit_2: signal.take_profit_2,
            risk_amount,
            opened_at,
            partial_closed: false,
            trailing: signal.trailing_stop_distance.map(|distance| Trailing {
                distance,
                active: false,
            }),
        }
    }

    /// Unrealized PnL in price units per unit of size (sign-adjusted).
    pub fn price_move(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.direction.sign()
    }

    /// Move the stop to breakeven and activate the trailing ratchet.
    /// Called when price first touches tp1.
    pub fn arm_breakeven(&mut self) {
        match self.direction {
            Direction::Long => self.stop_loss = self.stop_loss.max(self.entry_price),
            Direction::Short => self.stop_loss = self.stop_loss.min(self.entry_price),
        }
        if let Some(trailing) = &mut self.trailing {
            trailing.active = true;
        }
    }

    /// Ratchet the trailing stop toward price. The stop only ever tightens.
    /// Returns the new stop when it moved.
    pub fn update_trailing_stop(&mut self, current_price: f64) -> Option<f64> {
        let trailing = self.trailing.filter(|t| t.active)?;
        let candidate = current_price - trailing.distance * self.direction.sign();
        let improved = match self.direction {
            Direction::Long => candidate > self.stop_loss,
            Direction::Short => candidate < self.stop_loss,
        };
        if improved {
            self.stop_loss = candidate;
            Some(candidate)
        } else {
            None
        }
    }
}
