//! Strategy variants sharing one signal-generation contract.
//!
//! Strategies are regime-agnostic: which variant runs on a given cycle is an
//! orchestration concern (`Regime::strategy()`). Each variant reads an
//! indicator snapshot and either produces a fully specified `Signal` or
//! nothing. Strategies never see portfolio state — gating and sizing belong
//! to the risk manager.

pub mod grid;
pub mod mean_reversion;
pub mod trend_following;

pub use grid::{GridInvalidation, GridLevel, GridPlan, GridRange, GridTrading, GridVeto};
pub use mean_reversion::MeanReversion;
pub use trend_following::TrendFollowing;

use crate::config::IndicatorConfig;
use crate::domain::{Bar, Direction, ExitLevels, Signal, StrategyKind};
use crate::indicators::IndicatorTable;

/// Common contract for the strategy variants.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Risk fraction of capital this strategy commits per trade.
    fn risk_per_trade(&self) -> f64;

    /// Evaluate the bar at `index` against a precomputed indicator table.
    /// Returns a signal at most once per evaluated bar.
    fn evaluate(&self, bars: &[Bar], index: usize, table: &IndicatorTable) -> Option<Signal>;

    /// Entry/stop/target levels for a candidate in the given direction at
    /// `index`, independent of whether the entry conditions hold.
    fn exit_levels(
        &self,
        bars: &[Bar],
        index: usize,
        table: &IndicatorTable,
        direction: Direction,
    ) -> Option<ExitLevels>;

    /// Convenience entry point for a trailing window: compute indicators and
    /// evaluate the final bar.
    fn generate_signal(&self, bars: &[Bar], indicators: &IndicatorConfig) -> Option<Signal> {
        if bars.len() < 2 {
            return None;
        }
        let table = IndicatorTable::compute(bars, indicators);
        self.evaluate(bars, bars.len() - 1, &table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorSnapshot;

    /// Neutral snapshot for strategy condition tests; FX-scaled prices.
    pub(crate) fn base_snapshot() -> IndicatorSnapshot {
        crate::indicators::snapshot::neutral_snapshot()
    }

    #[test]
    fn generate_signal_matches_evaluate_on_last_bar() {
        use crate::indicators::{make_bars, IndicatorTable};
        let closes: Vec<f64> = (0..240)
            .map(|i| 1.45 + (i as f64 * 0.17).sin() * 0.003)
            .collect();
        let bars = make_bars(&closes);
        let config = IndicatorConfig::default();
        let table = IndicatorTable::compute(&bars, &config);

        let mean_reversion = MeanReversion::default();
        let trend_following = TrendFollowing::default();
        let strategies: [&dyn Strategy; 2] = [&mean_reversion, &trend_following];
        for strategy in strategies {
            assert_eq!(
                strategy.generate_signal(&bars, &config),
                strategy.evaluate(&bars, bars.len() - 1, &table)
            );
        }
    }

    #[test]
    fn exit_levels_defined_for_both_directions() {
        use crate::indicators::{make_bars, IndicatorTable};
        let closes: Vec<f64> = (0..240)
            .map(|i| 1.45 + (i as f64 * 0.17).sin() * 0.003)
            .collect();
        let bars = make_bars(&closes);
        let table = IndicatorTable::compute(&bars, &IndicatorConfig::default());
        let last = bars.len() - 1;

        let trend: &dyn Strategy = &TrendFollowing::default();
        for direction in [Direction::Long, Direction::Short] {
            let levels = trend.exit_levels(&bars, last, &table, direction).unwrap();
            assert_ne!(levels.stop_loss, levels.entry);
            assert!(levels.take_profit_2.is_some());
            assert!(levels.trailing_stop_distance.is_some());
        }

        // Grid has no per-trade exit levels
        let grid: &dyn Strategy = &GridTrading::default();
        assert!(grid
            .exit_levels(&bars, last, &table, Direction::Long)
            .is_none());
    }

    #[test]
    fn trait_objects_compose() {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(MeanReversion::default()),
            Box::new(TrendFollowing::default()),
            Box::new(GridTrading::default()),
        ];
        let kinds: Vec<StrategyKind> = strategies.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::MeanReversion,
                StrategyKind::TrendFollowing,
                StrategyKind::Grid
            ]
        );
    }
}
