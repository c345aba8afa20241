use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-fatal condition encountered during data alignment or order execution.
///
/// Unlike [`crate::error::BacktestError`], a warning never aborts the run; it is recorded here
/// in addition to being logged via `tracing::warn!` at the point it occurred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    /// A symbol's raw bar had a timestamp absent from the benchmark timeline and was dropped
    /// during [`crate::data::feed::DataFeedBuilder::build`].
    BarOutsideBenchmark {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    /// An order was dropped outright during [`crate::execution::engine::ExecutionEngine::drain_and_execute`].
    OrderDropped { symbol: String, reason: String },
    /// A sell order was clamped down to the shares actually available rather than dropped.
    OrderDownsized {
        symbol: String,
        requested: u64,
        filled: u64,
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BarOutsideBenchmark { symbol, timestamp } => {
                write!(f, "{symbol}: bar at {timestamp} outside benchmark timeline, dropped")
            }
            Warning::OrderDropped { symbol, reason } => {
                write!(f, "{symbol}: order dropped ({reason})")
            }
            Warning::OrderDownsized {
                symbol,
                requested,
                filled,
                reason,
            } => write!(
                f,
                "{symbol}: order downsized from {requested} to {filled} shares ({reason})"
            ),
        }
    }
}

/// Append-only collection of [`Warning`]s gathered over the course of a run and surfaced in
/// [`crate::metrics::stats::RunOutput`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Warning>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.0.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merges `other`'s warnings into `self`, in order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }
}
