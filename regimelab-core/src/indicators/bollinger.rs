//! Bollinger Bands.
//!
//! Middle = SMA(period); upper/lower = middle ± k * rolling sample std.
//! Width = (upper - lower) / middle, the normalized envelope span used by
//! regime detection.

use crate::indicators::sma::{rolling_std, sma};

/// The Bollinger band series, all aligned with the input.
#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub width: Vec<f64>,
}

/// Compute Bollinger Bands over closes.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollingerSeries {
    assert!(period >= 2, "Bollinger period must be >= 2");
    assert!(k > 0.0, "Bollinger k must be > 0");

    let middle = sma(closes, period);
    let std = rolling_std(closes, period);

    let n = closes.len();
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut width = vec![f64::NAN; n];

    for i in 0..n {
        if middle[i].is_nan() || std[i].is_nan() {
            continue;
        }
        upper[i] = middle[i] + k * std[i];
        lower[i] = middle[i] - k * std[i];
        if middle[i] != 0.0 {
            width[i] = (upper[i] - lower[i]) / middle[i];
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
        width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn bollinger_constant_input_collapses() {
        let result = bollinger(&[100.0; 10], 5, 2.0);
        assert_approx(result.middle[9], 100.0, DEFAULT_EPSILON);
        assert_approx(result.upper[9], 100.0, DEFAULT_EPSILON);
        assert_approx(result.lower[9], 100.0, DEFAULT_EPSILON);
        assert_approx(result.width[9], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_known_window() {
        // Window [2, 4, 6]: mean 4, sample std 2 → upper 8, lower 0
        let result = bollinger(&[2.0, 4.0, 6.0], 3, 2.0);
        assert_approx(result.middle[2], 4.0, DEFAULT_EPSILON);
        assert_approx(result.upper[2], 8.0, DEFAULT_EPSILON);
        assert_approx(result.lower[2], 0.0, DEFAULT_EPSILON);
        assert_approx(result.width[2], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_warmup_is_nan() {
        let result = bollinger(&[1.0, 2.0, 3.0, 4.0], 3, 2.0);
        assert!(result.upper[0].is_nan());
        assert!(result.upper[1].is_nan());
        assert!(!result.upper[2].is_nan());
    }

    #[test]
    fn bands_bracket_middle() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let result = bollinger(&closes, 10, 2.0);
        for i in 9..closes.len() {
            assert!(result.upper[i] >= result.middle[i]);
            assert!(result.lower[i] <= result.middle[i]);
        }
    }
}
