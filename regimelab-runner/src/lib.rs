//! RegimeLab Runner — offline replay of the decision pipeline.
//!
//! Builds on `regimelab-core` to provide:
//! - Deterministic single-run backtests with trade extraction and metrics
//! - Walk-forward analysis (the required validation protocol)
//! - Serializable backtest configuration with content-addressed run ids
//! - CSV/JSON artifact export for the reporting collaborator
//! - Seeded synthetic bar generators for tests and benches

pub mod config;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod synthetic;
pub mod walk_forward;

pub use config::{BacktestConfig, BacktestConfigError, RunId};
pub use engine::{run_backtest, BacktestError, BacktestResult, ExitReason, SimTrade};
pub use export::{export_result_json, export_trades_csv};
pub use metrics::PerformanceMetrics;
pub use walk_forward::{
    create_windows, run_walk_forward, AggregateMetrics, WalkForwardConfig, WalkForwardError,
    WalkForwardResult, WindowResult, WindowSpec,
};
