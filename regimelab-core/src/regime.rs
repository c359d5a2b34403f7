//! Market regime classification.
//!
//! Classifies the current market state from the indicator snapshot into one
//! of six regimes, with a strict precedence order (first match wins):
//! 1. ADX > 30 and EMAs monotonically ordered → StrongTrend
//! 2. ADX > 20 and same alignment → WeakTrend
//! 3. Narrow Bollinger width and compressed ATR → BreakoutPending
//! 4. ATR above 1.5x its rolling average → HighVolatility
//! 5. Bollinger width below 0.6x its rolling average → LowVolatility
//! 6. otherwise → Ranging
//!
//! With fewer than `MIN_HISTORY` bars the answer is Indeterminate and the
//! caller must not trade.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{IndicatorConfig, RegimeConfig};
use crate::domain::{Bar, StrategyKind};
use crate::indicators::{IndicatorSnapshot, IndicatorTable};

/// Minimum bars of history before classification is meaningful.
pub const MIN_HISTORY: usize = 200;

/// Classified market behavioral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    StrongTrend,
    WeakTrend,
    Ranging,
    BreakoutPending,
    HighVolatility,
    LowVolatility,
    Indeterminate,
}

impl Regime {
    /// The strategy variant this regime dispatches to. The table is closed:
    /// adding a regime or strategy forces this match to be revisited.
    pub fn strategy(self) -> Option<StrategyKind> {
        match self {
            Regime::StrongTrend => Some(StrategyKind::TrendFollowing),
            Regime::WeakTrend | Regime::Ranging | Regime::BreakoutPending => {
                Some(StrategyKind::MeanReversion)
            }
            Regime::LowVolatility => Some(StrategyKind::Grid),
            Regime::HighVolatility | Regime::Indeterminate => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Regime::StrongTrend => "strong directional trend with high ADX and aligned EMAs",
            Regime::WeakTrend => "moderate trend with some directional bias",
            Regime::Ranging => "sideways market with no clear direction",
            Regime::BreakoutPending => "low volatility consolidation, potential breakout",
            Regime::HighVolatility => "elevated volatility, staying out",
            Regime::LowVolatility => "very low volatility, suitable for grid trading",
            Regime::Indeterminate => "insufficient history for classification",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::StrongTrend => "STRONG_TREND",
            Regime::WeakTrend => "WEAK_TREND",
            Regime::Ranging => "RANGING",
            Regime::BreakoutPending => "BREAKOUT_PENDING",
            Regime::HighVolatility => "HIGH_VOLATILITY",
            Regime::LowVolatility => "LOW_VOLATILITY",
            Regime::Indeterminate => "INDETERMINATE",
        };
        write!(f, "{s}")
    }
}

/// Deterministic regime classifier: identical windows always yield identical
/// regimes. Holds only thresholds, no state.
#[derive(Debug, Clone, Default)]
pub struct RegimeDetector {
    config: RegimeConfig,
}

impl RegimeDetector {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    /// Classify the regime at the last bar of a window.
    pub fn classify_window(&self, bars: &[Bar], indicators: &IndicatorConfig) -> Regime {
        if bars.len() < MIN_HISTORY {
            return Regime::Indeterminate;
        }
        let table = IndicatorTable::compute(bars, indicators);
        self.classify(bars, &table, bars.len() - 1)
    }

    /// Classify at a bar index against a precomputed table.
    pub fn classify(&self, bars: &[Bar], table: &IndicatorTable, index: usize) -> Regime {
        if index + 1 < MIN_HISTORY {
            return Regime::Indeterminate;
        }
        match table.snapshot(bars, index) {
            Some(snap) => self.classify_snapshot(&snap),
            None => Regime::Indeterminate,
        }
    }

    /// Pure classification from a snapshot, in strict precedence order.
    pub fn classify_snapshot(&self, snap: &IndicatorSnapshot) -> Regime {
        let required = [
            snap.adx,
            snap.atr,
            snap.atr_avg,
            snap.bb_width,
            snap.bb_width_avg,
            snap.ema_fast,
            snap.ema_medium,
            snap.ema_slow,
        ];
        if required.iter().any(|v| !v.is_finite()) {
            return Regime::Indeterminate;
        }

        let aligned = snap.ema_aligned_up() || snap.ema_aligned_down();
        let c = &self.config;

        if snap.adx > c.adx_strong_trend && aligned {
            Regime::StrongTrend
        } else if snap.adx > c.adx_weak_trend && aligned {
            Regime::WeakTrend
        } else if snap.bb_width < snap.bb_width_avg * c.bb_width_breakout_multiplier
            && snap.atr < snap.atr_avg * c.atr_low_volatility_multiplier
        {
            Regime::BreakoutPending
        } else if snap.atr > snap.atr_avg * c.atr_high_volatility_multiplier {
            Regime::HighVolatility
        } else if snap.bb_width < snap.bb_width_avg * c.bb_width_low_vol_multiplier {
            Regime::LowVolatility
        } else {
            Regime::Ranging
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    /// Snapshot with neutral values; tests override the fields they exercise.
    fn base_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: 100.0,
            prev_close: 100.0,
            volume: 1000.0,
            ema_fast: 100.0,
            ema_medium: 100.0,
            ema_slow: 100.0,
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            macd_histogram_prev: 0.0,
            bb_upper: 102.0,
            bb_middle: 100.0,
            bb_lower: 98.0,
            bb_width: 0.04,
            bb_width_avg: 0.04,
            atr: 1.0,
            atr_avg: 1.0,
            atr_avg_slow: 1.0,
            adx: 15.0,
            volume_ma: 1000.0,
        }
    }

    #[test]
    fn strong_trend_needs_adx_and_alignment() {
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.adx = 35.0;
        snap.ema_fast = 102.0;
        snap.ema_medium = 101.0;
        snap.ema_slow = 100.0;
        assert_eq!(detector.classify_snapshot(&snap), Regime::StrongTrend);

        // Same ADX without alignment is not a trend
        snap.ema_medium = 103.0;
        assert_ne!(detector.classify_snapshot(&snap), Regime::StrongTrend);
    }

    #[test]
    fn weak_trend_between_thresholds() {
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.adx = 25.0;
        snap.ema_fast = 98.0;
        snap.ema_medium = 99.0;
        snap.ema_slow = 100.0; // aligned down
        assert_eq!(detector.classify_snapshot(&snap), Regime::WeakTrend);
    }

    #[test]
    fn breakout_pending_beats_low_volatility() {
        // Narrow bands AND compressed ATR: rule 3 fires before rule 5
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.bb_width = 0.02;
        snap.bb_width_avg = 0.04; // 0.5x < 0.7x
        snap.atr = 0.7;
        snap.atr_avg = 1.0; // 0.7 < 0.8x
        assert_eq!(detector.classify_snapshot(&snap), Regime::BreakoutPending);
    }

    #[test]
    fn high_volatility_on_atr_spike() {
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.atr = 1.6;
        snap.atr_avg = 1.0;
        assert_eq!(detector.classify_snapshot(&snap), Regime::HighVolatility);
    }

    #[test]
    fn low_volatility_on_narrow_bands_alone() {
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.bb_width = 0.02;
        snap.bb_width_avg = 0.04; // 0.5x < 0.6x, but ATR normal → not breakout
        assert_eq!(detector.classify_snapshot(&snap), Regime::LowVolatility);
    }

    #[test]
    fn ranging_is_the_fallback() {
        let detector = RegimeDetector::default();
        assert_eq!(detector.classify_snapshot(&base_snapshot()), Regime::Ranging);
    }

    #[test]
    fn strong_trend_takes_precedence_over_volatility() {
        let detector = RegimeDetector::default();
        let mut snap = base_snapshot();
        snap.adx = 40.0;
        snap.ema_fast = 102.0;
        snap.ema_medium = 101.0;
        snap.ema_slow = 100.0;
        snap.atr = 2.0; // would also be HighVolatility
        snap.atr_avg = 1.0;
        assert_eq!(detector.classify_snapshot(&snap), Regime::StrongTrend);
    }

    #[test]
    fn indeterminate_below_min_history() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + (i as f64 * 0.2).sin()).collect();
        let bars = make_bars(&closes);
        let detector = RegimeDetector::default();
        assert_eq!(
            detector.classify_window(&bars, &IndicatorConfig::default()),
            Regime::Indeterminate
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let closes: Vec<f64> = (0..240)
            .map(|i| 100.0 + (i as f64 * 0.13).sin() * 1.5)
            .collect();
        let bars = make_bars(&closes);
        let detector = RegimeDetector::default();
        let config = IndicatorConfig::default();
        let first = detector.classify_window(&bars, &config);
        for _ in 0..5 {
            assert_eq!(detector.classify_window(&bars, &config), first);
        }
    }

    #[test]
    fn uptrend_window_classifies_strong_trend() {
        // Steadily rising closes: aligned EMAs and persistent +DM
        let closes: Vec<f64> = (0..240).map(|i| 100.0 + i as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let detector = RegimeDetector::default();
        assert_eq!(
            detector.classify_window(&bars, &IndicatorConfig::default()),
            Regime::StrongTrend
        );
    }

    #[test]
    fn dispatch_table() {
        assert_eq!(
            Regime::StrongTrend.strategy(),
            Some(StrategyKind::TrendFollowing)
        );
        assert_eq!(
            Regime::Ranging.strategy(),
            Some(StrategyKind::MeanReversion)
        );
        assert_eq!(
            Regime::WeakTrend.strategy(),
            Some(StrategyKind::MeanReversion)
        );
        assert_eq!(
            Regime::BreakoutPending.strategy(),
            Some(StrategyKind::MeanReversion)
        );
        assert_eq!(Regime::LowVolatility.strategy(), Some(StrategyKind::Grid));
        assert_eq!(Regime::HighVolatility.strategy(), None);
        assert_eq!(Regime::Indeterminate.strategy(), None);
    }
}
