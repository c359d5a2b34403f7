//! Collaborator traits for market data and execution.
//!
//! The core never talks to a broker directly. It consumes this trait and
//! observes only success or failure with a reason; reconnection and backoff
//! live entirely inside the implementing collaborator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Direction};

/// Data-side failures, surfaced to the emergency monitor as state rather
/// than propagated as panics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("connection failure: {0}")]
    Connectivity(String),
    #[error("no data returned")]
    NoData,
    #[error("insufficient history: got {got} bars, need {need}")]
    InsufficientHistory { got: usize, need: usize },
}

/// Execution-side failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("connection failure: {0}")]
    Connectivity(String),
}

/// An order intent handed to the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub direction: Direction,
    pub size_lots: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: Option<f64>,
}

/// Confirmed fill returned by the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillConfirmation {
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}

/// The market data & execution collaborator.
pub trait MarketGateway {
    /// Fetch an ascending-timestamp bar history covering `duration` at the
    /// given bar interval.
    fn fetch_history(&mut self, duration: Duration, bar_size: Duration)
        -> Result<Vec<Bar>, FetchError>;

    /// Cheap liveness probe.
    fn check_connection_health(&self) -> bool;

    /// Place a bracket order (entry + stop + targets).
    fn place_order(&mut self, request: &OrderRequest) -> Result<FillConfirmation, OrderError>;
}
