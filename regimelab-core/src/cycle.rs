//! Per-cycle orchestration contract.
//!
//! One `run_cycle` call takes a fetched bar window and the current time, and
//! fully completes classification, signal generation, risk gating, and the
//! emergency checks before returning — no internal concurrency, no partial
//! state on early return. The scheduling loop, data fetching, and order
//! placement live outside; they call `record_fetch_*`, `run_cycle`, and
//! `confirm_fill` in that order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{Bar, PositionId, Signal, StrategyKind};
use crate::emergency::{EmergencyStopMonitor, SessionBlock};
use crate::indicators::IndicatorTable;
use crate::market::FillConfirmation;
use crate::regime::{Regime, RegimeDetector, MIN_HISTORY};
use crate::risk::{AccountSummary, HaltReason, RiskManager, RiskViolation};
use crate::strategy::{
    GridInvalidation, GridPlan, GridTrading, MeanReversion, Strategy, TrendFollowing,
};

/// A sized, risk-approved order intent ready for the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub signal: Signal,
    pub size_lots: f64,
    pub risk_amount: f64,
}

/// Why a cycle did nothing, short of a halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleSkip {
    OutsideSession(SessionBlock),
    InsufficientHistory { got: usize },
}

/// Everything a cycle decided, for the scheduler and reporting collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub regime: Regime,
    pub strategy: Option<StrategyKind>,
    pub intent: Option<OrderIntent>,
    /// Ladder planned this cycle (grid dispatch only).
    pub grid: Option<GridPlan>,
    /// An active ladder was torn down this cycle.
    pub grid_invalidated: Option<GridInvalidation>,
    /// The signal that was produced but blocked by a risk limit.
    pub rejection: Option<RiskViolation>,
    pub skip: Option<CycleSkip>,
    pub halted: bool,
    pub halt_reason: Option<HaltReason>,
}

impl CycleReport {
    fn empty(regime: Regime) -> Self {
        Self {
            regime,
            strategy: None,
            intent: None,
            grid: None,
            grid_invalidated: None,
            rejection: None,
            skip: None,
            halted: false,
            halt_reason: None,
        }
    }
}

/// The decision pipeline, cycled by an external scheduler.
pub struct TradingCycle {
    config: Config,
    detector: RegimeDetector,
    mean_reversion: MeanReversion,
    trend_following: TrendFollowing,
    grid: GridTrading,
    risk: RiskManager,
    emergency: EmergencyStopMonitor,
    active_grid: Option<GridPlan>,
    last_reset_day: Option<NaiveDate>,
}

impl TradingCycle {
    pub fn new(initial_capital: f64, config: Config) -> Self {
        let risk = RiskManager::new(
            initial_capital,
            config.risk.clone(),
            config.instrument.clone(),
        );
        let emergency = EmergencyStopMonitor::new(config.emergency.clone());
        Self {
            detector: RegimeDetector::new(config.regime.clone()),
            mean_reversion: MeanReversion::new(&config.strategy),
            trend_following: TrendFollowing::new(&config.strategy),
            grid: GridTrading::new(&config.strategy),
            risk,
            emergency,
            active_grid: None,
            last_reset_day: None,
            config,
        }
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn emergency(&self) -> &EmergencyStopMonitor {
        &self.emergency
    }

    pub fn account_summary(&self) -> AccountSummary {
        self.risk.account_summary()
    }

    /// Forward a failed fetch to the connectivity accounting.
    pub fn record_fetch_error(&mut self) {
        self.emergency.record_api_error(&mut self.risk);
    }

    /// Forward a successful fetch; may auto-resume a connectivity halt.
    pub fn record_fetch_success(&mut self, now: DateTime<Utc>) {
        self.emergency.record_success(now, &mut self.risk);
    }

    /// Register a confirmed fill for a previously emitted intent.
    pub fn confirm_fill(&mut self, intent: &OrderIntent, fill: &FillConfirmation) -> PositionId {
        self.risk.add_position(
            &intent.signal,
            intent.size_lots,
            intent.risk_amount,
            fill.filled_at,
        )
    }

    /// Apply the realized PnL of a position reported closed by the broker.
    pub fn position_closed(&mut self, id: PositionId, pnl: f64) {
        self.risk.close_position(id, pnl);
    }

    /// Explicit operator resume after a non-connectivity halt.
    pub fn resume(&mut self) {
        self.risk.resume();
    }

    /// Execute one full decision cycle over the fetched window.
    pub fn run_cycle(&mut self, bars: &[Bar], now: DateTime<Utc>) -> CycleReport {
        self.reset_daily_if_needed(now);

        if let Some(block) = self.emergency.session_gate(now) {
            let mut report = CycleReport::empty(Regime::Indeterminate);
            report.skip = Some(CycleSkip::OutsideSession(block));
            return self.finish(report);
        }

        if bars.len() < MIN_HISTORY {
            warn!(got = bars.len(), need = MIN_HISTORY, "insufficient history");
            let mut report = CycleReport::empty(Regime::Indeterminate);
            report.skip = Some(CycleSkip::InsufficientHistory { got: bars.len() });
            return self.finish(report);
        }

        let table = IndicatorTable::compute(bars, &self.config.indicators);
        let last = bars.len() - 1;
        let snapshot = table.snapshot(bars, last);
        let regime = self.detector.classify(bars, &table, last);
        let mut report = CycleReport::empty(regime);

        // Safety monitor runs every cycle, signal or not.
        if let Some(reason) = self
            .emergency
            .check(bars, snapshot.as_ref(), self.risk.state().drawdown(), now)
        {
            warn!(%reason, "emergency stop triggered");
            self.risk.halt(HaltReason::Emergency(reason));
            return self.finish(report);
        }

        // Re-evaluate the capital-based breakers at the cycle boundary.
        self.risk.check_circuit_breakers();

        // An active ladder is torn down as soon as its conditions die.
        let invalidated = match (&self.active_grid, snapshot.as_ref()) {
            (Some(plan), Some(snap)) => self.grid.invalidation(snap, &plan.range),
            _ => None,
        };
        if let Some(invalidation) = invalidated {
            info!(?invalidation, "grid ladder invalidated");
            self.active_grid = None;
            report.grid_invalidated = Some(invalidation);
        }

        let Some(kind) = regime.strategy() else {
            info!(%regime, "staying out");
            return self.finish(report);
        };
        report.strategy = Some(kind);

        match kind {
            StrategyKind::Grid => {
                if self.active_grid.is_none() {
                    if let Some(snap) = snapshot.as_ref() {
                        match self.grid.plan(
                            bars,
                            snap,
                            self.risk.state().capital,
                            &self.config.instrument,
                        ) {
                            Ok(plan) => {
                                info!(levels = plan.levels.len(), "grid ladder planned");
                                self.active_grid = Some(plan.clone());
                                report.grid = Some(plan);
                            }
                            Err(veto) => info!(%veto, "grid not deployed"),
                        }
                    }
                }
            }
            StrategyKind::MeanReversion | StrategyKind::TrendFollowing => {
                let strategy: &dyn Strategy = match kind {
                    StrategyKind::MeanReversion => &self.mean_reversion,
                    _ => &self.trend_following,
                };
                let risk_pct = strategy.risk_per_trade();
                if let Some(signal) = strategy.evaluate(bars, last, &table) {
                    self.process_signal(signal, risk_pct, &mut report);
                }
            }
        }

        // Maintain trailing stops on whatever is open.
        if let Some(last_bar) = bars.last() {
            self.risk.update_trailing_stops(last_bar.close);
        }

        self.finish(report)
    }

    /// Size and gate a produced signal. No path may emit a zero-size intent
    /// or a stop at entry; both resolve to no-trade.
    fn process_signal(&mut self, signal: Signal, risk_pct: f64, report: &mut CycleReport) {
        let size_lots =
            self.risk
                .calculate_position_size(signal.entry, signal.stop_loss, risk_pct);
        if size_lots <= 0.0 {
            warn!("position size is zero, skipping trade");
            return;
        }
        let risk_amount = self.risk.state().capital * risk_pct;
        match self.risk.can_open_position(risk_amount) {
            Ok(()) => {
                info!(
                    strategy = %signal.strategy,
                    direction = %signal.direction,
                    size_lots,
                    "order intent emitted"
                );
                report.intent = Some(OrderIntent {
                    signal,
                    size_lots,
                    risk_amount,
                });
            }
            Err(violation) => {
                warn!(%violation, "position blocked");
                report.rejection = Some(violation);
            }
        }
    }

    fn reset_daily_if_needed(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.last_reset_day != Some(today) {
            if self.last_reset_day.is_some() {
                self.risk.reset_daily();
            }
            self.last_reset_day = Some(today);
        }
    }

    fn finish(&self, mut report: CycleReport) -> CycleReport {
        report.halted = self.risk.state().status.is_halted();
        report.halt_reason = self.risk.state().status.halt_reason();
        report
    }
}
