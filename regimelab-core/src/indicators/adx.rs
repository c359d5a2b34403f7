//! ADX — Average Directional Index.
//!
//! Rolling-mean formulation, matching the production pipeline:
//! 1. +DM[t] = max(high[t] - high[t-1], 0), -DM[t] = max(low[t-1] - low[t], 0)
//! 2. +DI = 100 * SMA(+DM) / SMA(TR), -DI likewise
//! 3. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 4. ADX = SMA(DX)
//!
//! Lookback: 2 * period (period for DI, then period for the DX average).

use crate::domain::Bar;
use crate::indicators::atr::true_range;
use crate::indicators::sma::sma;

/// ADX over bars with the given period.
pub fn adx(bars: &[Bar], period: usize) -> Vec<f64> {
    assert!(period >= 1, "ADX period must be >= 1");
    let n = bars.len();
    if n < 2 {
        return vec![f64::NAN; n];
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let high_diff = bars[i].high - bars[i - 1].high;
        let low_diff = bars[i - 1].low - bars[i].low;
        if high_diff.is_nan() || low_diff.is_nan() {
            continue;
        }
        plus_dm[i] = high_diff.max(0.0);
        minus_dm[i] = low_diff.max(0.0);
    }

    let smooth_tr = sma(&true_range(bars), period);
    let smooth_plus = sma(&plus_dm, period);
    let smooth_minus = sma(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan()
            || smooth_plus[i].is_nan()
            || smooth_minus[i].is_nan()
            || smooth_tr[i] == 0.0
        {
            continue;
        }
        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;
        if di_sum != 0.0 {
            dx[i] = 100.0 * (plus_di - minus_di).abs() / di_sum;
        }
    }

    sma(&dx, period)
}
