//! RegimeLab Core — the trading-decision and risk-control pipeline.
//!
//! This crate converts a rolling window of price bars into a bounded,
//! risk-gated trading decision:
//! - Domain types (bars, signals, positions)
//! - Pure indicator functions and the per-bar snapshot table
//! - Six-regime market classification with strict precedence
//! - Three strategy variants behind one signal-generation contract
//! - Risk manager with position sizing, limit gating, and circuit breakers
//! - Emergency-stop monitor with connectivity accounting and auto-resume
//! - Collaborator traits for the external market data & execution layer
//! - The per-cycle orchestration contract exposed to the scheduler

pub mod config;
pub mod cycle;
pub mod domain;
pub mod emergency;
pub mod indicators;
pub mod market;
pub mod regime;
pub mod risk;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types cross thread boundaries safely.
    /// Walk-forward evaluation runs windows in parallel, so everything a
    /// window owns must be Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();

        require_send::<config::Config>();
        require_sync::<config::Config>();

        require_send::<regime::RegimeDetector>();
        require_sync::<regime::RegimeDetector>();
        require_send::<indicators::IndicatorTable>();
        require_sync::<indicators::IndicatorTable>();

        require_send::<strategy::MeanReversion>();
        require_sync::<strategy::MeanReversion>();
        require_send::<strategy::TrendFollowing>();
        require_sync::<strategy::TrendFollowing>();
        require_send::<strategy::GridTrading>();
        require_sync::<strategy::GridTrading>();

        require_send::<risk::RiskManager>();
        require_sync::<risk::RiskManager>();
        require_send::<emergency::EmergencyStopMonitor>();
        require_sync::<emergency::EmergencyStopMonitor>();
        require_send::<cycle::TradingCycle>();
        require_sync::<cycle::TradingCycle>();
    }

    /// Architecture contract: strategies do NOT see portfolio state.
    ///
    /// `Strategy::evaluate` takes bars, an index, and indicator values — no
    /// risk state parameter. If someone adds one, the trait changes and all
    /// implementations break. This test documents the contract explicitly.
    #[test]
    fn strategy_trait_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            strategy: &dyn strategy::Strategy,
            bars: &[domain::Bar],
            table: &indicators::IndicatorTable,
        ) -> Option<domain::Signal> {
            strategy.evaluate(bars, 0, table)
        }
    }
}
