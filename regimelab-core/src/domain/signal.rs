//! Trade signals — the output of a strategy evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short. Used in PnL and level arithmetic.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// The closed set of strategy variants.
///
/// Regime-to-strategy dispatch goes through this enum rather than ad hoc
/// string matching, so adding a variant is a compile-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MeanReversion,
    TrendFollowing,
    Grid,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
            StrategyKind::TrendFollowing => write!(f, "trend_following"),
            StrategyKind::Grid => write!(f, "grid"),
        }
    }
}

/// Entry/exit levels for a candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: Option<f64>,
    /// Trailing-stop distance in price units, armed once tp1 is reached.
    pub trailing_stop_distance: Option<f64>,
}

impl ExitLevels {
    /// Distance from entry to stop in price units.
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    /// Reward/risk ratio to the first target. Zero when the stop sits at entry.
    pub fn reward_risk_1(&self) -> f64 {
        let risk = self.risk();
        if risk == 0.0 {
            return 0.0;
        }
        (self.take_profit_1 - self.entry).abs() / risk
    }
}

/// A fully specified trade candidate, produced at most once per evaluated bar.
///
/// Signals are immutable: risk gating and sizing read them, nothing writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: Option<f64>,
    /// Trailing distance in price units (trend following only).
    pub trailing_stop_distance: Option<f64>,
}

impl Signal {
    pub fn from_levels(direction: Direction, strategy: StrategyKind, levels: ExitLevels) -> Self {
        Self {
            direction,
            strategy,
            entry: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit_1: levels.take_profit_1,
            take_profit_2: levels.take_profit_2,
            trailing_stop_distance: levels.trailing_stop_distance,
        }
    }

    /// Distance from entry to stop in price units.
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
    }

    #[test]
    fn reward_risk_zero_when_stop_at_entry() {
        let levels = ExitLevels {
            entry: 1.45,
            stop_loss: 1.45,
            take_profit_1: 1.46,
            take_profit_2: None,
            trailing_stop_distance: None,
        };
        assert_eq!(levels.reward_risk_1(), 0.0);
    }

    #[test]
    fn reward_risk_basic() {
        let levels = ExitLevels {
            entry: 1.4500,
            stop_loss: 1.4480,
            take_profit_1: 1.4540,
            take_profit_2: None,
            trailing_stop_distance: None,
        };
        // 40 pips reward vs 20 pips risk
        assert!((levels.reward_risk_1() - 2.0).abs() < 1e-9);
    }
}
