//! MACD — Moving Average Convergence Divergence.
//!
//! MACD line = EMA(fast) - EMA(slow); signal = EMA(signal_span) of the MACD
//! line; histogram = MACD - signal. The histogram's bar-over-bar change is
//! what the mean-reversion strategy reads as an early-reversal cue.

use crate::indicators::ema::ema;

/// The three MACD series, all aligned with the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD over closes.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    assert!(fast < slow, "MACD fast span must be shorter than slow span");
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_span);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(m, s)| m - s).collect();

    MacdSeries {
        macd: line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn macd_constant_input_is_zero() {
        let result = macd(&[100.0; 40], 12, 26, 9);
        for i in 0..40 {
            assert_approx(result.macd[i], 0.0, DEFAULT_EPSILON);
            assert_approx(result.signal[i], 0.0, DEFAULT_EPSILON);
            assert_approx(result.histogram[i], 0.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let result = macd(&closes, 12, 26, 9);
        let last = *result.macd.last().unwrap();
        assert!(last > 0.0, "MACD should be positive in an uptrend, got {last}");
        assert!(*result.signal.last().unwrap() > 0.0);
    }

    #[test]
    fn macd_negative_in_downtrend() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let result = macd(&closes, 12, 26, 9);
        assert!(*result.macd.last().unwrap() < 0.0);
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let result = macd(&closes, 12, 26, 9);
        for i in 0..closes.len() {
            assert_approx(
                result.histogram[i],
                result.macd[i] - result.signal[i],
                DEFAULT_EPSILON,
            );
        }
    }
}
