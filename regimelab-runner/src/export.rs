//! Artifact export for the reporting collaborator — CSV trade ledger and
//! JSON metrics.

use std::fs::File;
use std::path::Path;

use anyhow::Context;

use crate::engine::{BacktestResult, SimTrade};

/// Write the ordered trade ledger as CSV.
pub fn export_trades_csv(path: &Path, trades: &[SimTrade]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating trade ledger at {}", path.display()))?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full backtest result (metrics, ledger, equity curve) as JSON.
pub fn export_result_json(path: &Path, result: &BacktestResult) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating result file at {}", path.display()))?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}
