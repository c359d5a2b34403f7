//! Grid trading — a symmetric ladder of resting orders for quiet markets.
//!
//! Grid is condition-based rather than signal-based: `evaluate` never yields
//! a per-bar entry. Instead the orchestrator asks for a `GridPlan` when the
//! regime dispatches here, and tears the ladder down when it invalidates
//! (trend forming, or price escaping the planned range).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Instrument, StrategyConfig};
use crate::domain::{Bar, Direction, ExitLevels, Signal, StrategyKind};
use crate::indicators::{IndicatorSnapshot, IndicatorTable};

use super::Strategy;

/// One resting order in the ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLevel {
    pub side: Direction,
    pub price: f64,
    /// Units of base currency allocated to this level.
    pub amount_units: f64,
    pub take_profit: f64,
    /// Two spacings beyond the level, on the losing side.
    pub stop_loss: f64,
    /// Negative below the anchor price, positive above.
    pub level: i32,
}

/// Price range the ladder is planned around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    pub top: f64,
    pub bottom: f64,
}

impl GridRange {
    pub fn size(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// A complete ladder ready to hand to the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPlan {
    pub levels: Vec<GridLevel>,
    pub range: GridRange,
    pub spacing_pips: f64,
}

/// Why a grid cannot be deployed right now.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridVeto {
    #[error("ADX {adx:.1} too high, trending market")]
    TrendingMarket { adx: f64 },
    #[error("volatility too high for grid trading (ATR {atr:.5} vs avg {atr_avg:.5})")]
    ElevatedVolatility { atr: f64, atr_avg: f64 },
    #[error("need {need} bars to estimate a grid range, have {got}")]
    InsufficientHistory { got: usize, need: usize },
}

/// Why a deployed ladder must be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridInvalidation {
    /// Strong trend forming (ADX above ceiling).
    TrendForming,
    /// Price broke above the planned range by more than 2x ATR.
    BrokeAbove,
    /// Price broke below the planned range by more than 2x ATR.
    BrokeBelow,
}

/// Grid strategy parameters.
#[derive(Debug, Clone)]
pub struct GridTrading {
    pub risk_per_trade: f64,
    /// Floor for the level spacing; widened to 0.5x ATR when volatility asks.
    pub spacing_pips: f64,
    pub num_levels: usize,
    /// Fraction of capital spread across the ladder.
    pub capital_allocation: f64,
    pub adx_ceiling: f64,
    pub atr_ceiling_multiple: f64,
    pub range_lookback: usize,
    /// Buffer added to each side of the observed range, as a fraction of it.
    pub range_buffer: f64,
}

impl GridTrading {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            risk_per_trade: config.grid_risk,
            spacing_pips: config.grid_spacing_pips,
            num_levels: config.grid_num_levels,
            capital_allocation: config.grid_capital_allocation,
            ..Self::default()
        }
    }

    /// Check whether current conditions allow deploying a ladder.
    pub fn suitability(&self, snap: &IndicatorSnapshot) -> Result<(), GridVeto> {
        if snap.adx > self.adx_ceiling {
            return Err(GridVeto::TrendingMarket { adx: snap.adx });
        }
        if snap.atr > snap.atr_avg * self.atr_ceiling_multiple {
            return Err(GridVeto::ElevatedVolatility {
                atr: snap.atr,
                atr_avg: snap.atr_avg,
            });
        }
        Ok(())
    }

    /// Estimate the trading range from recent highs/lows, with a buffer.
    pub fn grid_range(&self, bars: &[Bar]) -> Result<GridRange, GridVeto> {
        if bars.len() < self.range_lookback {
            return Err(GridVeto::InsufficientHistory {
                got: bars.len(),
                need: self.range_lookback,
            });
        }
        let recent = &bars[bars.len() - self.range_lookback..];
        let high = recent.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = recent.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let buffer = (high - low) * self.range_buffer;
        Ok(GridRange {
            top: high + buffer,
            bottom: low - buffer,
        })
    }

    /// Build the symmetric ladder around the current price.
    ///
    /// Spacing is the wider of the configured pip spacing and 0.5x ATR.
    /// Each level gets an equal share of the allocated capital; take-profit
    /// sits one spacing toward the anchor, stop two spacings away.
    pub fn build_ladder(
        &self,
        current_price: f64,
        atr: f64,
        capital: f64,
        instrument: &Instrument,
    ) -> Vec<GridLevel> {
        let dynamic_spacing_pips = self
            .spacing_pips
            .max(instrument.price_to_pips(atr) * 0.5);
        let spacing = instrument.pips_to_price(dynamic_spacing_pips);
        let capital_per_level = capital * self.capital_allocation / self.num_levels as f64;
        let half = self.num_levels / 2;

        let mut levels = Vec::with_capacity(half * 2);

        // Buy levels below the anchor
        for i in 1..=half {
            let price = current_price - spacing * i as f64;
            levels.push(GridLevel {
                side: Direction::Long,
                price,
                amount_units: capital_per_level / price,
                take_profit: price + spacing,
                stop_loss: price - spacing * 2.0,
                level: -(i as i32),
            });
        }

        // Sell levels above the anchor
        for i in 1..=half {
            let price = current_price + spacing * i as f64;
            levels.push(GridLevel {
                side: Direction::Short,
                price,
                amount_units: capital_per_level / price,
                take_profit: price - spacing,
                stop_loss: price + spacing * 2.0,
                level: i as i32,
            });
        }

        levels
    }

    /// Plan a full ladder: suitability gate, range estimate, level layout.
    pub fn plan(
        &self,
        bars: &[Bar],
        snap: &IndicatorSnapshot,
        capital: f64,
        instrument: &Instrument,
    ) -> Result<GridPlan, GridVeto> {
        self.suitability(snap)?;
        let range = self.grid_range(bars)?;
        let levels = self.build_ladder(snap.close, snap.atr, capital, instrument);
        let spacing_pips = self
            .spacing_pips
            .max(instrument.price_to_pips(snap.atr) * 0.5);
        Ok(GridPlan {
            levels,
            range,
            spacing_pips,
        })
    }

    /// Check whether a deployed ladder must be torn down.
    pub fn invalidation(
        &self,
        snap: &IndicatorSnapshot,
        range: &GridRange,
    ) -> Option<GridInvalidation> {
        if snap.adx > self.adx_ceiling {
            return Some(GridInvalidation::TrendForming);
        }
        if snap.close > range.top + 2.0 * snap.atr {
            return Some(GridInvalidation::BrokeAbove);
        }
        if snap.close < range.bottom - 2.0 * snap.atr {
            return Some(GridInvalidation::BrokeBelow);
        }
        None
    }
}

impl Default for GridTrading {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.008,
            spacing_pips: 10.0,
            num_levels: 10,
            capital_allocation: 0.7,
            adx_ceiling: 30.0,
            atr_ceiling_multiple: 1.3,
            range_lookback: 100,
            range_buffer: 0.05,
        }
    }
}

impl Strategy for GridTrading {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grid
    }

    fn risk_per_trade(&self) -> f64 {
        self.risk_per_trade
    }

    /// Grid places resting orders, not per-bar entries.
    fn evaluate(&self, _bars: &[Bar], _index: usize, _table: &IndicatorTable) -> Option<Signal> {
        None
    }

    fn exit_levels(
        &self,
        _bars: &[Bar],
        _index: usize,
        _table: &IndicatorTable,
        _direction: Direction,
    ) -> Option<ExitLevels> {
        None
    }
}
