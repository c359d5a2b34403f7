//! Precomputed indicator table and per-bar snapshots.
//!
//! The table is computed once per evaluation window and queried by bar index.
//! Because every series is causal, `table.snapshot(i)` equals what a fresh
//! computation over `bars[..=i]` would produce, which is what lets the
//! backtest engine precompute instead of recomputing per prefix.

use crate::config::IndicatorConfig;
use crate::domain::Bar;

use super::{adx, atr, bollinger, ema, macd, rsi, sma};

/// All indicator series for a bar window, aligned by index.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    pub ema_fast: Vec<f64>,
    pub ema_medium: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_histogram: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_middle: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub bb_width: Vec<f64>,
    pub bb_width_avg: Vec<f64>,
    pub atr: Vec<f64>,
    pub atr_avg: Vec<f64>,
    pub atr_avg_slow: Vec<f64>,
    pub adx: Vec<f64>,
    pub volume_ma: Vec<f64>,
    len: usize,
}

impl IndicatorTable {
    /// Compute every series the pipeline consumes.
    pub fn compute(bars: &[Bar], config: &IndicatorConfig) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let bb = bollinger(&closes, config.bb_period, config.bb_std);
        let macd_series = macd(
            &closes,
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
        );
        let atr_series = atr(bars, config.atr_period);
        let atr_avg = sma(&atr_series, config.atr_avg_period);
        let atr_avg_slow = sma(&atr_series, config.atr_avg_slow_period);
        let bb_width_avg = sma(&bb.width, config.bb_width_avg_period);

        Self {
            ema_fast: ema(&closes, config.ema_fast),
            ema_medium: ema(&closes, config.ema_medium),
            ema_slow: ema(&closes, config.ema_slow),
            rsi: rsi(&closes, config.rsi_period),
            macd: macd_series.macd,
            macd_signal: macd_series.signal,
            macd_histogram: macd_series.histogram,
            bb_upper: bb.upper,
            bb_middle: bb.middle,
            bb_lower: bb.lower,
            bb_width: bb.width,
            bb_width_avg,
            atr: atr_series,
            atr_avg,
            atr_avg_slow,
            adx: adx(bars, config.adx_period),
            volume_ma: sma(&volumes, config.volume_ma_period),
            len: bars.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Snapshot of all values at a bar index. None for index 0 (no previous
    /// bar) or out of range.
    pub fn snapshot(&self, bars: &[Bar], index: usize) -> Option<IndicatorSnapshot> {
        if index == 0 || index >= self.len || index >= bars.len() {
            return None;
        }
        Some(IndicatorSnapshot {
            close: bars[index].close,
            prev_close: bars[index - 1].close,
            volume: bars[index].volume,
            ema_fast: self.ema_fast[index],
            ema_medium: self.ema_medium[index],
            ema_slow: self.ema_slow[index],
            rsi: self.rsi[index],
            macd: self.macd[index],
            macd_signal: self.macd_signal[index],
            macd_histogram: self.macd_histogram[index],
            macd_histogram_prev: self.macd_histogram[index - 1],
            bb_upper: self.bb_upper[index],
            bb_middle: self.bb_middle[index],
            bb_lower: self.bb_lower[index],
            bb_width: self.bb_width[index],
            bb_width_avg: self.bb_width_avg[index],
            atr: self.atr[index],
            atr_avg: self.atr_avg[index],
            atr_avg_slow: self.atr_avg_slow[index],
            adx: self.adx[index],
            volume_ma: self.volume_ma[index],
        })
    }
}

/// Derived per-bar view of the indicator set. Recomputed per evaluation,
/// never persisted.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub prev_close: f64,
    pub volume: f64,
    pub ema_fast: f64,
    pub ema_medium: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub macd_histogram_prev: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub bb_width: f64,
    pub bb_width_avg: f64,
    pub atr: f64,
    pub atr_avg: f64,
    pub atr_avg_slow: f64,
    pub adx: f64,
    pub volume_ma: f64,
}

impl IndicatorSnapshot {
    /// Compute a snapshot for the last bar of a window.
    pub fn from_window(bars: &[Bar], config: &IndicatorConfig) -> Option<Self> {
        if bars.len() < 2 {
            return None;
        }
        let table = IndicatorTable::compute(bars, config);
        table.snapshot(bars, bars.len() - 1)
    }

    /// True when every value the strategies and regime detector read is
    /// finite. The slow ATR average is excluded: it belongs to the emergency
    /// monitor, which checks it independently.
    pub fn is_complete(&self) -> bool {
        [
            self.close,
            self.prev_close,
            self.volume,
            self.ema_fast,
            self.ema_medium,
            self.ema_slow,
            self.rsi,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.macd_histogram_prev,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.bb_width,
            self.bb_width_avg,
            self.atr,
            self.atr_avg,
            self.adx,
            self.volume_ma,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Trend alignment: fast above medium above slow.
    pub fn ema_aligned_up(&self) -> bool {
        self.ema_fast > self.ema_medium && self.ema_medium > self.ema_slow
    }

    /// Trend alignment: fast below medium below slow.
    pub fn ema_aligned_down(&self) -> bool {
        self.ema_fast < self.ema_medium && self.ema_medium < self.ema_slow
    }
}

/// Neutral FX-scaled snapshot for tests; callers override what they exercise.
#[cfg(test)]
pub(crate) fn neutral_snapshot() -> IndicatorSnapshot {
    IndicatorSnapshot {
        close: 1.4500,
        prev_close: 1.4500,
        volume: 1000.0,
        ema_fast: 1.4500,
        ema_medium: 1.4500,
        ema_slow: 1.4500,
        rsi: 50.0,
        macd: 0.0,
        macd_signal: 0.0,
        macd_histogram: 0.0,
        macd_histogram_prev: 0.0,
        bb_upper: 1.4560,
        bb_middle: 1.4500,
        bb_lower: 1.4440,
        bb_width: 0.008,
        bb_width_avg: 0.008,
        atr: 0.0010,
        atr_avg: 0.0010,
        atr_avg_slow: 0.0010,
        adx: 20.0,
        volume_ma: 1000.0,
    }
}
