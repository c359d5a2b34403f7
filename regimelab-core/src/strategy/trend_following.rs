//! Trend following — pullback entries during strong trends.
//!
//! Requires full EMA alignment and elevated ADX, then waits for price to pull
//! back to the fast EMA with momentum still intact. Wider stop (2.5x ATR),
//! staged targets at 2x and 4x ATR, stop to breakeven at tp1, then a 3x ATR
//! trailing ratchet for the remainder.

use crate::config::StrategyConfig;
use crate::domain::{Bar, Direction, ExitLevels, Signal, StrategyKind};
use crate::indicators::{IndicatorSnapshot, IndicatorTable};

use super::Strategy;

/// Trend-following entry thresholds and exit arithmetic.
#[derive(Debug, Clone)]
pub struct TrendFollowing {
    pub risk_per_trade: f64,
    pub stop_atr_multiple: f64,
    pub tp1_atr_multiple: f64,
    pub tp2_atr_multiple: f64,
    pub trailing_atr_multiple: f64,
    /// Pullback tolerance around the fast EMA (0.005 = 0.5%).
    pub pullback_band: f64,
    pub adx_floor: f64,
    pub volume_surge: f64,
    /// RSI window for longs; mirrored down 10 points for shorts.
    pub rsi_long_range: (f64, f64),
    pub rsi_short_range: (f64, f64),
}

impl TrendFollowing {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            risk_per_trade: config.trend_following_risk,
            stop_atr_multiple: config.trend_stop_atr_multiple,
            trailing_atr_multiple: config.trailing_stop_atr_multiple,
            ..Self::default()
        }
    }

    /// Check the entry confluence. Returns the candidate direction.
    pub fn entry_direction(&self, snap: &IndicatorSnapshot) -> Option<Direction> {
        if !snap.is_complete() {
            return None;
        }
        if snap.adx <= self.adx_floor {
            return None;
        }
        if snap.volume <= snap.volume_ma * self.volume_surge {
            return None;
        }

        let (rsi_long_lo, rsi_long_hi) = self.rsi_long_range;
        let long = snap.ema_aligned_up()
            && snap.close <= snap.ema_fast * (1.0 + self.pullback_band)
            && snap.close > snap.ema_medium
            && snap.rsi > rsi_long_lo
            && snap.rsi < rsi_long_hi
            && snap.macd > snap.macd_signal;

        let (rsi_short_lo, rsi_short_hi) = self.rsi_short_range;
        let short = snap.ema_aligned_down()
            && snap.close >= snap.ema_fast * (1.0 - self.pullback_band)
            && snap.close < snap.ema_medium
            && snap.rsi > rsi_short_lo
            && snap.rsi < rsi_short_hi
            && snap.macd < snap.macd_signal;

        match (long, short) {
            (true, false) => Some(Direction::Long),
            (false, true) => Some(Direction::Short),
            _ => None,
        }
    }

    /// Exit arithmetic: 2.5x ATR stop, targets at 2x and 4x ATR, 3x ATR
    /// trailing distance armed at tp1.
    pub fn levels_from_snapshot(
        &self,
        snap: &IndicatorSnapshot,
        direction: Direction,
    ) -> Option<ExitLevels> {
        if !snap.atr.is_finite() || snap.atr <= 0.0 {
            return None;
        }
        let entry = snap.close;
        let sign = direction.sign();
        Some(ExitLevels {
            entry,
            stop_loss: entry - sign * self.stop_atr_multiple * snap.atr,
            take_profit_1: entry + sign * self.tp1_atr_multiple * snap.atr,
            take_profit_2: Some(entry + sign * self.tp2_atr_multiple * snap.atr),
            trailing_stop_distance: Some(self.trailing_atr_multiple * snap.atr),
        })
    }
}

impl Default for TrendFollowing {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.015,
            stop_atr_multiple: 2.5,
            tp1_atr_multiple: 2.0,
            tp2_atr_multiple: 4.0,
            trailing_atr_multiple: 3.0,
            pullback_band: 0.005,
            adx_floor: 25.0,
            volume_surge: 1.1,
            rsi_long_range: (45.0, 65.0),
            rsi_short_range: (35.0, 55.0),
        }
    }
}

impl Strategy for TrendFollowing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendFollowing
    }

    fn risk_per_trade(&self) -> f64 {
        self.risk_per_trade
    }

    fn evaluate(&self, bars: &[Bar], index: usize, table: &IndicatorTable) -> Option<Signal> {
        let snap = table.snapshot(bars, index)?;
        let direction = self.entry_direction(&snap)?;
        let levels = self.levels_from_snapshot(&snap, direction)?;
        Some(Signal::from_levels(direction, self.kind(), levels))
    }

    fn exit_levels(
        &self,
        bars: &[Bar],
        index: usize,
        table: &IndicatorTable,
        direction: Direction,
    ) -> Option<ExitLevels> {
        let snap = table.snapshot(bars, index)?;
        self.levels_from_snapshot(&snap, direction)
    }
}
