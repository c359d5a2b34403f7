//! Exponential moving average.
//!
//! Span parameterization: alpha = 2 / (span + 1), seeded with the first
//! value. Matches the recursive (non-adjusted) form used by the production
//! pipeline, so the series is defined from index 0.

/// Exponential moving average with the given span.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n == 0 {
        return out;
    }
    if values[0].is_nan() {
        return out;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = values[0];
    out[0] = prev;

    for i in 1..n {
        if values[i].is_nan() {
            // A hole in the input invalidates everything after it.
            return out;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}
