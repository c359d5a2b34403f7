//! Emergency stop — safety predicates evaluated every cycle.
//!
//! Runs independently of signal presence. Any true condition forces the risk
//! manager into the halted state. Error accounting: only the consecutive
//! fetch-error counter gates halting, and it resets to exactly zero on any
//! success; the total counter is informational and folds down to the
//! consecutive value once it exceeds the configured threshold, purely to
//! bound growth. Auto-resume fires only when a fetch succeeds while the
//! active halt reason is connectivity; every other halt requires an external
//! resume.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmergencyConfig;
use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;
use crate::risk::{HaltReason, RiskManager};

/// Which safety predicate fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyReason {
    /// Drawdown crossed the hard stop.
    ExcessiveDrawdown,
    /// ATR spiked above its slow rolling average.
    VolatilitySpike,
    /// Too many consecutive fetch failures.
    Connectivity,
    /// No successful data update within the staleness window.
    StaleData,
    /// Bar-to-bar close change beyond the gap threshold.
    PriceGap,
    /// Weekend, market closed.
    MarketClosed,
    /// Inside the configured news blackout window.
    NewsBlackout,
}

impl fmt::Display for EmergencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyReason::ExcessiveDrawdown => write!(f, "drawdown exceeded hard stop"),
            EmergencyReason::VolatilitySpike => write!(f, "extreme volatility detected"),
            EmergencyReason::Connectivity => write!(f, "multiple api errors"),
            EmergencyReason::StaleData => write!(f, "stale price data"),
            EmergencyReason::PriceGap => write!(f, "unexpected price gap"),
            EmergencyReason::MarketClosed => write!(f, "weekend, market closed"),
            EmergencyReason::NewsBlackout => write!(f, "major news window"),
        }
    }
}

/// Why the current cycle should not trade, short of an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionBlock {
    Weekend,
    OutsideHours,
}

/// Spread sanity failures when quoting an order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpreadViolation {
    #[error("invalid bid/ask prices")]
    InvalidQuote,
    #[error("excessive spread: {pips:.1} pips")]
    Excessive { pips: f64 },
}

/// Connectivity bookkeeping, owned by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EmergencyState {
    pub consecutive_api_errors: u32,
    pub total_api_errors: u64,
    pub last_successful_update: Option<DateTime<Utc>>,
}

/// Health snapshot for the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub consecutive_api_errors: u32,
    pub total_api_errors: u64,
    pub last_successful_update: Option<DateTime<Utc>>,
    pub halted: bool,
    pub halt_reason: Option<HaltReason>,
}

/// Evaluates the safety predicates and owns the connectivity counters.
#[derive(Debug, Clone)]
pub struct EmergencyStopMonitor {
    config: EmergencyConfig,
    state: EmergencyState,
}

impl EmergencyStopMonitor {
    pub fn new(config: EmergencyConfig) -> Self {
        Self {
            config,
            state: EmergencyState::default(),
        }
    }

    pub fn state(&self) -> &EmergencyState {
        &self.state
    }

    /// Record a failed data fetch. Halts the risk manager once the
    /// consecutive-error threshold is reached.
    pub fn record_api_error(&mut self, risk: &mut RiskManager) {
        self.state.consecutive_api_errors += 1;
        self.state.total_api_errors += 1;
        // The total counter never gates anything; fold it down once it
        // exceeds the threshold so it cannot grow without bound.
        if self.state.total_api_errors > self.config.total_error_fold_threshold {
            self.state.total_api_errors = self.state.consecutive_api_errors as u64;
        }
        warn!(
            consecutive = self.state.consecutive_api_errors,
            total = self.state.total_api_errors,
            "api error recorded"
        );
        if self.state.consecutive_api_errors >= self.config.max_consecutive_api_errors {
            risk.halt(HaltReason::Emergency(EmergencyReason::Connectivity));
        }
    }

    /// Record a successful data fetch. Resets the consecutive counter and
    /// auto-resumes only a connectivity-caused halt.
    pub fn record_success(&mut self, now: DateTime<Utc>, risk: &mut RiskManager) {
        if self.state.consecutive_api_errors > 0 {
            info!(
                from = self.state.consecutive_api_errors,
                "consecutive api errors reset"
            );
        }
        self.state.consecutive_api_errors = 0;
        self.state.last_successful_update = Some(now);

        if risk.state().status.halt_reason()
            == Some(HaltReason::Emergency(EmergencyReason::Connectivity))
        {
            info!("connection recovered, auto-resuming");
            risk.resume();
        }
    }

    /// Evaluate every emergency condition. Returns the first that holds.
    ///
    /// `snapshot` carries the latest ATR and its slow average; `drawdown` is
    /// the risk manager's current figure.
    pub fn check(
        &self,
        bars: &[Bar],
        snapshot: Option<&IndicatorSnapshot>,
        drawdown: f64,
        now: DateTime<Utc>,
    ) -> Option<EmergencyReason> {
        if drawdown >= self.config.halt_on_drawdown {
            return Some(EmergencyReason::ExcessiveDrawdown);
        }

        if let Some(snap) = snapshot {
            if snap.atr.is_finite()
                && snap.atr_avg_slow.is_finite()
                && snap.atr > snap.atr_avg_slow * self.config.atr_spike_multiplier
            {
                return Some(EmergencyReason::VolatilitySpike);
            }
        }

        if self.state.consecutive_api_errors >= self.config.max_consecutive_api_errors {
            return Some(EmergencyReason::Connectivity);
        }

        if let Some(last) = self.state.last_successful_update {
            if (now - last).num_seconds() > self.config.stale_data_secs {
                return Some(EmergencyReason::StaleData);
            }
        }

        if bars.len() >= 2 {
            let prev = bars[bars.len() - 2].close;
            let curr = bars[bars.len() - 1].close;
            if prev > 0.0 && ((curr - prev) / prev).abs() > self.config.max_price_gap {
                return Some(EmergencyReason::PriceGap);
            }
        }

        if self.config.avoid_weekends && is_weekend(now) {
            return Some(EmergencyReason::MarketClosed);
        }

        if self.config.news_blackout && in_news_blackout(now) {
            return Some(EmergencyReason::NewsBlackout);
        }

        None
    }

    /// Session gate: outside the configured UTC window the cycle is a no-op,
    /// not a halt.
    pub fn session_gate(&self, now: DateTime<Utc>) -> Option<SessionBlock> {
        if self.config.avoid_weekends && is_weekend(now) {
            return Some(SessionBlock::Weekend);
        }
        let hour = now.hour();
        if hour < self.config.trading_start_hour || hour >= self.config.trading_end_hour {
            return Some(SessionBlock::OutsideHours);
        }
        None
    }

    /// Spread sanity before order placement. `pip` is the instrument's pip
    /// size.
    pub fn check_spread(&self, bid: f64, ask: f64, pip: f64) -> Result<(), SpreadViolation> {
        if bid <= 0.0 || ask <= 0.0 || ask < bid {
            return Err(SpreadViolation::InvalidQuote);
        }
        let pips = (ask - bid) / pip;
        if pips > self.config.max_spread_pips {
            return Err(SpreadViolation::Excessive { pips });
        }
        if pips > 3.0 {
            warn!(pips, "wide spread detected");
        }
        Ok(())
    }

    pub fn system_health(&self, risk: &RiskManager) -> SystemHealth {
        SystemHealth {
            consecutive_api_errors: self.state.consecutive_api_errors,
            total_api_errors: self.state.total_api_errors,
            last_successful_update: self.state.last_successful_update,
            halted: risk.state().status.is_halted(),
            halt_reason: risk.state().status.halt_reason(),
        }
    }
}

fn is_weekend(now: DateTime<Utc>) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First Friday of the month, 08:00-10:59 UTC: the employment-report window.
fn in_news_blackout(now: DateTime<Utc>) -> bool {
    now.weekday() == Weekday::Fri && now.day() <= 7 && (8..=10).contains(&now.hour())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Instrument, RiskConfig};
    use chrono::TimeZone;

    fn snapshot_with_atr(atr: f64, atr_avg_slow: f64) -> IndicatorSnapshot {
        let mut snap = crate::indicators::snapshot::neutral_snapshot();
        snap.atr = atr;
        snap.atr_avg_slow = atr_avg_slow;
        snap
    }

    fn monitor() -> EmergencyStopMonitor {
        EmergencyStopMonitor::new(EmergencyConfig::default())
    }

    fn risk_manager() -> RiskManager {
        RiskManager::new(10_000.0, RiskConfig::default(), Instrument::default())
    }

    fn weekday_noon() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    // ── Error accounting ──

    #[test]
    fn consecutive_resets_to_zero_on_success() {
        let mut monitor = monitor();
        let mut rm = risk_manager();
        monitor.record_api_error(&mut rm);
        monitor.record_api_error(&mut rm);
        assert_eq!(monitor.state().consecutive_api_errors, 2);
        monitor.record_success(weekday_noon(), &mut rm);
        assert_eq!(monitor.state().consecutive_api_errors, 0);
        // Total survives the reset
        assert_eq!(monitor.state().total_api_errors, 2);
    }

    #[test]
    fn third_consecutive_error_halts() {
        let mut monitor = monitor();
        let mut rm = risk_manager();
        monitor.record_api_error(&mut rm);
        monitor.record_api_error(&mut rm);
        assert!(!rm.state().status.is_halted());
        monitor.record_api_error(&mut rm);
        assert_eq!(
            rm.state().status.halt_reason(),
            Some(HaltReason::Emergency(EmergencyReason::Connectivity))
        );
    }

    #[test]
    fn success_auto_resumes_connectivity_halt_only() {
        let mut monitor = monitor();
        let mut rm = risk_manager();
        for _ in 0..3 {
            monitor.record_api_error(&mut rm);
        }
        assert!(rm.state().status.is_halted());
        monitor.record_success(weekday_noon(), &mut rm);
        assert!(!rm.state().status.is_halted());

        // A drawdown halt does not auto-resume
        rm.halt(HaltReason::MaxDrawdown);
        monitor.record_success(weekday_noon(), &mut rm);
        assert!(rm.state().status.is_halted());
    }

    #[test]
    fn total_folds_down_past_threshold() {
        let mut monitor = monitor();
        let mut rm = risk_manager();
        for i in 0..100 {
            monitor.record_api_error(&mut rm);
            // keep consecutive low and the bot resumable
            if i % 2 == 1 {
                monitor.record_success(weekday_noon(), &mut rm);
            }
        }
        assert_eq!(monitor.state().total_api_errors, 100);
        // 101st error exceeds the threshold → folds to consecutive (1)
        monitor.record_api_error(&mut rm);
        assert_eq!(monitor.state().total_api_errors, 1);
        assert_eq!(monitor.state().consecutive_api_errors, 1);
    }

    // ── Predicates ──

    #[test]
    fn drawdown_hard_stop() {
        let monitor = monitor();
        assert_eq!(
            monitor.check(&[], None, 0.15, weekday_noon()),
            Some(EmergencyReason::ExcessiveDrawdown)
        );
        assert_eq!(monitor.check(&[], None, 0.10, weekday_noon()), None);
    }

    #[test]
    fn volatility_spike_at_2x_slow_average() {
        let monitor = monitor();
        let snap = snapshot_with_atr(0.0021, 0.0010);
        assert_eq!(
            monitor.check(&[], Some(&snap), 0.0, weekday_noon()),
            Some(EmergencyReason::VolatilitySpike)
        );
        let calm = snapshot_with_atr(0.0019, 0.0010);
        assert_eq!(monitor.check(&[], Some(&calm), 0.0, weekday_noon()), None);
    }

    #[test]
    fn stale_data_after_five_minutes() {
        let mut monitor = monitor();
        let mut rm = risk_manager();
        let t0 = weekday_noon();
        monitor.record_success(t0, &mut rm);
        assert_eq!(
            monitor.check(&[], None, 0.0, t0 + chrono::Duration::seconds(301)),
            Some(EmergencyReason::StaleData)
        );
        assert_eq!(
            monitor.check(&[], None, 0.0, t0 + chrono::Duration::seconds(299)),
            None
        );
    }

    #[test]
    fn price_gap_over_two_percent() {
        let monitor = monitor();
        let mut bars = crate::indicators::make_bars(&[1.4500, 1.4500]);
        bars[1].close = 1.4500 * 1.021;
        assert_eq!(
            monitor.check(&bars, None, 0.0, weekday_noon()),
            Some(EmergencyReason::PriceGap)
        );
    }

    #[test]
    fn weekend_is_market_closed() {
        let monitor = monitor();
        let saturday = Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap();
        assert_eq!(
            monitor.check(&[], None, 0.0, saturday),
            Some(EmergencyReason::MarketClosed)
        );
    }

    #[test]
    fn first_friday_morning_is_blackout() {
        let monitor = monitor();
        // 2024-01-05 is the first Friday of January
        let nfp = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(
            monitor.check(&[], None, 0.0, nfp),
            Some(EmergencyReason::NewsBlackout)
        );
        // Second Friday is clear
        let later = Utc.with_ymd_and_hms(2024, 1, 12, 9, 0, 0).unwrap();
        assert_eq!(monitor.check(&[], None, 0.0, later), None);
    }

    // ── Session & spread ──

    #[test]
    fn session_gate_window() {
        let monitor = monitor();
        let early = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        assert_eq!(monitor.session_gate(early), Some(SessionBlock::OutsideHours));
        assert_eq!(monitor.session_gate(weekday_noon()), None);
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 20, 0, 0).unwrap();
        assert_eq!(monitor.session_gate(late), Some(SessionBlock::OutsideHours));
        let saturday = Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap();
        assert_eq!(monitor.session_gate(saturday), Some(SessionBlock::Weekend));
    }

    #[test]
    fn spread_checks() {
        let monitor = monitor();
        let pip = 0.0001;
        assert!(monitor.check_spread(1.4500, 1.4501, pip).is_ok());
        assert!(matches!(
            monitor.check_spread(1.4500, 1.4512, pip),
            Err(SpreadViolation::Excessive { .. })
        ));
        assert!(matches!(
            monitor.check_spread(0.0, 1.45, pip),
            Err(SpreadViolation::InvalidQuote)
        ));
    }
}
