//! Serializable backtest configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::config::Config;
use regimelab_core::regime::MIN_HISTORY;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Everything needed to reproduce a backtest run: capital, costs, holding
/// limits, and the full core pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Round-trip commission charged per simulated trade, in pips.
    pub commission_pips: f64,
    /// Bars skipped before the first evaluation.
    pub warmup_bars: usize,
    /// Time-exit: positions held strictly longer than this close at market.
    pub max_holding_bars: usize,
    pub core: Config,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission_pips: 0.6,
            warmup_bars: MIN_HISTORY,
            max_holding_bars: 48,
            core: Config::default(),
        }
    }
}

/// Errors when loading a backtest configuration.
#[derive(Debug, Error)]
pub enum BacktestConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("core config: {0}")]
    Core(#[from] regimelab_core::config::ConfigError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl BacktestConfig {
    /// Deterministic hash ID for this configuration. Two runs with identical
    /// configs share a RunId and can share cached artifacts.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Parse from a TOML string. Missing sections fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, BacktestConfigError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, BacktestConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), BacktestConfigError> {
        self.core.validate()?;
        if self.initial_capital <= 0.0 {
            return Err(BacktestConfigError::Invalid(
                "initial_capital must be > 0".into(),
            ));
        }
        if self.warmup_bars < MIN_HISTORY {
            return Err(BacktestConfigError::Invalid(format!(
                "warmup_bars must be >= {MIN_HISTORY} for regime classification"
            )));
        }
        if self.max_holding_bars == 0 {
            return Err(BacktestConfigError::Invalid(
                "max_holding_bars must be > 0".into(),
            ));
        }
        Ok(())
    }
}
