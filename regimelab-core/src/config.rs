//! Typed configuration for the trading core.
//!
//! Every struct carries defaults matching the production EUR/CAD deployment
//! and deserializes from TOML, so a config file only needs to name the values
//! it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instrument parameters for a forex pair quoted to four decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instrument {
    pub symbol: String,
    /// Price increment of one pip (0.0001 for EUR/CAD).
    pub pip: f64,
    /// Units per standard lot.
    pub lot_units: f64,
    /// Dollar value of one pip per standard lot.
    pub pip_value_per_lot: f64,
    /// Account leverage used for the position-size margin cap.
    pub leverage: f64,
    /// Typical spread, informational.
    pub typical_spread_pips: f64,
    /// Round-trip commission in pips, charged per simulated trade.
    pub commission_pips: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            symbol: "EURCAD".to_string(),
            pip: 0.0001,
            lot_units: 100_000.0,
            pip_value_per_lot: 10.0,
            leverage: 100.0,
            typical_spread_pips: 0.6,
            commission_pips: 0.6,
        }
    }
}

impl Instrument {
    /// Convert a price distance to pips.
    pub fn price_to_pips(&self, distance: f64) -> f64 {
        distance / self.pip
    }

    /// Convert pips to a price distance.
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip
    }
}

/// Indicator periods. All trailing-window lengths in bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_medium: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub atr_period: usize,
    pub adx_period: usize,
    pub volume_ma_period: usize,
    /// Rolling average of ATR used by strategies and regime detection.
    pub atr_avg_period: usize,
    /// Slower rolling average of ATR used by the emergency monitor.
    pub atr_avg_slow_period: usize,
    /// Rolling average of Bollinger width used by regime detection.
    pub bb_width_avg_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_medium: 50,
            ema_slow: 200,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            atr_period: 14,
            adx_period: 14,
            volume_ma_period: 20,
            atr_avg_period: 20,
            atr_avg_slow_period: 50,
            bb_width_avg_period: 50,
        }
    }
}

/// Risk limits enforced by the risk manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Maximum fraction of capital at risk on a single trade.
    pub max_risk_per_trade: f64,
    /// Drawdown fraction at which trading halts.
    pub max_drawdown: f64,
    /// Daily loss fraction at which trading halts.
    pub max_daily_loss: f64,
    pub max_concurrent_positions: usize,
    pub max_daily_trades: u32,
    /// Maximum summed open risk as a fraction of capital.
    pub max_total_risk: f64,
    pub max_consecutive_losses: u32,
    /// Position cap: required margin may not exceed this fraction of capital.
    pub max_position_capital_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: 0.01,
            max_drawdown: 0.12,
            max_daily_loss: 0.03,
            max_concurrent_positions: 3,
            max_daily_trades: 10,
            max_total_risk: 0.05,
            max_consecutive_losses: 5,
            max_position_capital_pct: 0.10,
        }
    }
}

/// Emergency-stop thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Hard drawdown stop, independent of the risk manager's softer limit.
    pub halt_on_drawdown: f64,
    /// ATR above this multiple of its slow average is a volatility spike.
    pub atr_spike_multiplier: f64,
    pub max_consecutive_api_errors: u32,
    /// Seconds without a successful data update before the feed is stale.
    pub stale_data_secs: i64,
    /// Bar-to-bar close change above this fraction is a price gap.
    pub max_price_gap: f64,
    pub avoid_weekends: bool,
    /// First-Friday employment-report blackout window.
    pub news_blackout: bool,
    /// UTC session window, inclusive start / exclusive end.
    pub trading_start_hour: u32,
    pub trading_end_hour: u32,
    /// Once the informational total-error counter exceeds this, it folds
    /// down to the consecutive value to bound growth.
    pub total_error_fold_threshold: u64,
    /// Spread wider than this many pips blocks order placement.
    pub max_spread_pips: f64,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            halt_on_drawdown: 0.15,
            atr_spike_multiplier: 2.0,
            max_consecutive_api_errors: 3,
            stale_data_secs: 300,
            max_price_gap: 0.02,
            avoid_weekends: true,
            news_blackout: true,
            trading_start_hour: 8,
            trading_end_hour: 20,
            total_error_fold_threshold: 100,
            max_spread_pips: 10.0,
        }
    }
}

/// Regime classification thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub adx_strong_trend: f64,
    pub adx_weak_trend: f64,
    pub atr_high_volatility_multiplier: f64,
    pub atr_low_volatility_multiplier: f64,
    pub bb_width_breakout_multiplier: f64,
    pub bb_width_low_vol_multiplier: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            adx_strong_trend: 30.0,
            adx_weak_trend: 20.0,
            atr_high_volatility_multiplier: 1.5,
            atr_low_volatility_multiplier: 0.8,
            bb_width_breakout_multiplier: 0.7,
            bb_width_low_vol_multiplier: 0.6,
        }
    }
}

/// Per-strategy risk fractions and tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub mean_reversion_risk: f64,
    pub trend_following_risk: f64,
    pub grid_risk: f64,
    /// Candidates below this reward/risk to tp1 resolve to no-trade
    /// (mean reversion only).
    pub min_reward_risk: f64,
    pub stop_loss_atr_multiple: f64,
    pub trend_stop_atr_multiple: f64,
    pub trailing_stop_atr_multiple: f64,
    pub grid_spacing_pips: f64,
    pub grid_num_levels: usize,
    pub grid_capital_allocation: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mean_reversion_risk: 0.01,
            trend_following_risk: 0.015,
            grid_risk: 0.008,
            min_reward_risk: 1.5,
            stop_loss_atr_multiple: 2.0,
            trend_stop_atr_multiple: 2.5,
            trailing_stop_atr_multiple: 3.0,
            grid_spacing_pips: 10.0,
            grid_num_levels: 10,
            grid_capital_allocation: 0.7,
        }
    }
}

/// Complete core configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instrument: Instrument,
    pub indicators: IndicatorConfig,
    pub risk: RiskConfig,
    pub emergency: EmergencyConfig,
    pub regime: RegimeConfig,
    pub strategy: StrategyConfig,
}

/// Errors when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Parse from a TOML string. Missing sections fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Reject configurations that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.pip <= 0.0 {
            return Err(ConfigError::Invalid("instrument.pip must be > 0".into()));
        }
        if self.risk.max_risk_per_trade <= 0.0 || self.risk.max_risk_per_trade >= 1.0 {
            return Err(ConfigError::Invalid(
                "risk.max_risk_per_trade must be in (0, 1)".into(),
            ));
        }
        if self.risk.max_total_risk < self.risk.max_risk_per_trade {
            return Err(ConfigError::Invalid(
                "risk.max_total_risk must be >= max_risk_per_trade".into(),
            ));
        }
        if self.emergency.trading_start_hour >= self.emergency.trading_end_hour {
            return Err(ConfigError::Invalid(
                "emergency.trading_start_hour must precede trading_end_hour".into(),
            ));
        }
        if self.indicators.ema_fast >= self.indicators.ema_slow {
            return Err(ConfigError::Invalid(
                "indicators.ema_fast must be shorter than ema_slow".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.risk.max_concurrent_positions, 3);
        assert_eq!(config.risk.max_daily_trades, 10);
        assert_eq!(config.risk.max_consecutive_losses, 5);
        assert_eq!(config.emergency.total_error_fold_threshold, 100);
        assert_eq!(config.indicators.ema_slow, 200);
        assert!((config.instrument.pip - 0.0001).abs() < 1e-12);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            [risk]
            max_daily_trades = 4

            [instrument]
            symbol = "EURUSD"
            "#,
        )
        .unwrap();
        assert_eq!(config.risk.max_daily_trades, 4);
        assert_eq!(config.instrument.symbol, "EURUSD");
        // untouched sections keep defaults
        assert_eq!(config.risk.max_concurrent_positions, 3);
    }

    #[test]
    fn invalid_risk_rejected() {
        let err = Config::from_toml_str(
            r#"
            [risk]
            max_risk_per_trade = 1.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn pip_conversions() {
        let instrument = Instrument::default();
        assert!((instrument.price_to_pips(0.0020) - 20.0).abs() < 1e-9);
        assert!((instrument.pips_to_price(20.0) - 0.0020).abs() < 1e-12);
    }
}
