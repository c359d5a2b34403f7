//! Mean reversion — the primary strategy for ranging markets.
//!
//! Enters at Bollinger extremes with oversold/overbought RSI, a turning MACD
//! histogram, and a volume surge; exits at the mean. Strict confluence: every
//! condition must hold on the evaluated bar.

use crate::domain::{Bar, Direction, ExitLevels, Signal, StrategyKind};
use crate::config::StrategyConfig;
use crate::indicators::{IndicatorSnapshot, IndicatorTable};

use super::Strategy;

/// Mean-reversion entry thresholds and exit arithmetic.
#[derive(Debug, Clone)]
pub struct MeanReversion {
    pub risk_per_trade: f64,
    pub stop_atr_multiple: f64,
    /// Candidates below this reward/risk to tp1 resolve to no-trade.
    pub min_reward_risk: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Volume must exceed this multiple of its average.
    pub volume_surge: f64,
    /// No entries against strong trends.
    pub adx_ceiling: f64,
    /// No entries into elevated volatility (news bars).
    pub atr_ceiling_multiple: f64,
}

impl MeanReversion {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            risk_per_trade: config.mean_reversion_risk,
            stop_atr_multiple: config.stop_loss_atr_multiple,
            min_reward_risk: config.min_reward_risk,
            ..Self::default()
        }
    }

    /// Check the entry confluence. Returns the candidate direction.
    pub fn entry_direction(&self, snap: &IndicatorSnapshot) -> Option<Direction> {
        if !snap.is_complete() {
            return None;
        }
        // Shared filters: don't fight strong trends, avoid volatility spikes
        if snap.adx >= self.adx_ceiling {
            return None;
        }
        if snap.atr >= snap.atr_avg * self.atr_ceiling_multiple {
            return None;
        }
        if snap.volume <= snap.volume_ma * self.volume_surge {
            return None;
        }

        let long = snap.close <= snap.bb_lower
            && snap.close < snap.ema_fast
            && snap.rsi < self.rsi_oversold
            && snap.macd_histogram < 0.0
            && snap.macd_histogram > snap.macd_histogram_prev; // early reversal

        let short = snap.close >= snap.bb_upper
            && snap.close > snap.ema_fast
            && snap.rsi > self.rsi_overbought
            && snap.macd_histogram > 0.0
            && snap.macd_histogram < snap.macd_histogram_prev;

        match (long, short) {
            (true, false) => Some(Direction::Long),
            (false, true) => Some(Direction::Short),
            _ => None,
        }
    }

    /// Exit arithmetic: stop at 2x ATR, tp1 at the mid band, tp2 at the
    /// opposite band. Candidates below the reward/risk floor are dropped.
    pub fn levels_from_snapshot(
        &self,
        snap: &IndicatorSnapshot,
        direction: Direction,
    ) -> Option<ExitLevels> {
        if !snap.atr.is_finite() || snap.atr <= 0.0 {
            return None;
        }
        let entry = snap.close;
        let stop_distance = self.stop_atr_multiple * snap.atr;
        let levels = match direction {
            Direction::Long => ExitLevels {
                entry,
                stop_loss: entry - stop_distance,
                take_profit_1: snap.bb_middle,
                take_profit_2: Some(snap.bb_upper),
                trailing_stop_distance: None,
            },
            Direction::Short => ExitLevels {
                entry,
                stop_loss: entry + stop_distance,
                take_profit_1: snap.bb_middle,
                take_profit_2: Some(snap.bb_lower),
                trailing_stop_distance: None,
            },
        };

        if levels.risk() == 0.0 || levels.reward_risk_1() < self.min_reward_risk {
            return None;
        }
        Some(levels)
    }
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.01,
            stop_atr_multiple: 2.0,
            min_reward_risk: 1.5,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            volume_surge: 1.3,
            adx_ceiling: 35.0,
            atr_ceiling_multiple: 1.5,
        }
    }
}

impl Strategy for MeanReversion {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::base_snapshot;

    /// Snapshot satisfying every long-entry condition.
    fn long_setup() -> crate::indicators::IndicatorSnapshot {
        let mut snap = base_snapshot();
        snap.close = 1.4435; // at/below lower band, below EMA20
        snap.prev_close = 1.4450;
        snap.rsi = 25.0;
        snap.macd_histogram = -0.0004;
        snap.macd_histogram_prev = -0.0006; // rising
        snap.volume = 1400.0; // > 1.3 * 1000
        snap.adx = 20.0;
        snap.atr = 0.0010;
        snap.atr_avg = 0.0010;
        snap
    }

    #[test]
    fn long_confluence_fires() {
        let strategy = MeanReversion::default();
        assert_eq!(
            strategy.entry_direction(&long_setup()),
            Some(Direction::Long)
        );
    }

    #[test]
    fn each_condition_is_required() {
        let strategy = MeanReversion::default();

        let mut snap = long_setup();
        snap.rsi = 35.0; // not oversold
        assert_eq!(strategy.entry_direction(&snap), None);

        let mut snap = long_setup();
        snap.volume = 1200.0; // no volume surge
        assert_eq!(strategy.entry_direction(&snap), None);

        let mut snap = long_setup();
        snap.adx = 40.0; // strong trend filter
        assert_eq!(strategy.entry_direction(&snap), None);

        let mut snap = long_setup();
        snap.atr = 0.0016; // volatility filter (>= 1.5x avg)
        assert_eq!(strategy.entry_direction(&snap), None);

        let mut snap = long_setup();
        snap.macd_histogram_prev = -0.0002; // histogram falling, not rising
        assert_eq!(strategy.entry_direction(&snap), None);
    }

    #[test]
    fn short_confluence_fires() {
        let strategy = MeanReversion::default();
        let mut snap = base_snapshot();
        snap.close = 1.4565; // at/above upper band, above EMA20
        snap.rsi = 75.0;
        snap.macd_histogram = 0.0004;
        snap.macd_histogram_prev = 0.0006; // falling
        snap.volume = 1400.0;
        assert_eq!(strategy.entry_direction(&snap), Some(Direction::Short));
    }

    #[test]
    fn long_levels_target_the_mean() {
        let strategy = MeanReversion::default();
        let snap = long_setup();
        let levels = strategy
            .levels_from_snapshot(&snap, Direction::Long)
            .unwrap();
        assert!((levels.entry - 1.4435).abs() < 1e-9);
        assert!((levels.stop_loss - (1.4435 - 0.0020)).abs() < 1e-9);
        assert!((levels.take_profit_1 - snap.bb_middle).abs() < 1e-9);
        assert_eq!(levels.take_profit_2, Some(snap.bb_upper));
        assert!(levels.trailing_stop_distance.is_none());
    }

    #[test]
    fn reward_risk_floor_drops_candidates() {
        let strategy = MeanReversion::default();
        let mut snap = long_setup();
        // Widen ATR so the stop is far and tp1 reward is thin:
        // risk = 2 * 0.0030 = 0.0060, reward = 1.4500 - 1.4435 = 0.0065 → 1.08 < 1.5
        snap.atr = 0.0030;
        snap.atr_avg = 0.0030;
        assert!(strategy
            .levels_from_snapshot(&snap, Direction::Long)
            .is_none());
    }

    #[test]
    fn zero_atr_means_no_trade() {
        let strategy = MeanReversion::default();
        let mut snap = long_setup();
        snap.atr = 0.0;
        assert!(strategy
            .levels_from_snapshot(&snap, Direction::Long)
            .is_none());
    }
}
