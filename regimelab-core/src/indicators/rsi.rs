//! Relative Strength Index (RSI).
//!
//! Rolling-mean variant: average gain and average loss are simple moving
//! averages of the one-bar changes over the period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0;
//! both zero (flat window) → 50.

use crate::indicators::sma::sma;

/// RSI over closes with the given period. NaN until index `period`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if n < period + 1 {
        return out;
    }

    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change.is_nan() {
            continue;
        }
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let avg_gain = sma(&gains, period);
    let avg_loss = sma(&losses, period);

    for i in period..n {
        if avg_gain[i].is_nan() || avg_loss[i].is_nan() {
            continue;
        }
        out[i] = compute_rsi(avg_gain[i], avg_loss[i]);
    }
    out
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
