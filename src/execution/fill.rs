use crate::execution::error::ExecutionError;
use crate::execution::order::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one executed trade leg, emitted by the
/// [`ExecutionEngine`](crate::execution::engine::ExecutionEngine) and forwarded to
/// [`PortfolioState`](crate::portfolio::state::PortfolioState) and
/// [`MetricsRecorder`](crate::metrics::MetricsRecorder).
#[derive(Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub shares: u64,
    pub price: f64,
    pub gross_amount: f64,
    pub commission: f64,
    pub stamp_tax: f64,
    pub net_cash_delta: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Returns a [`FillBuilder`] instance.
    pub fn builder() -> FillBuilder {
        FillBuilder::new()
    }
}

/// Builder to construct [`Fill`] instances.
#[derive(Debug, Default)]
pub struct FillBuilder {
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub shares: Option<u64>,
    pub price: Option<f64>,
    pub gross_amount: Option<f64>,
    pub commission: Option<f64>,
    pub stamp_tax: Option<f64>,
    pub net_cash_delta: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FillBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(self, value: impl Into<String>) -> Self {
        Self {
            symbol: Some(value.into()),
            ..self
        }
    }

    pub fn side(self, value: Side) -> Self {
        Self {
            side: Some(value),
            ..self
        }
    }

    pub fn shares(self, value: u64) -> Self {
        Self {
            shares: Some(value),
            ..self
        }
    }

    pub fn price(self, value: f64) -> Self {
        Self {
            price: Some(value),
            ..self
        }
    }

    pub fn gross_amount(self, value: f64) -> Self {
        Self {
            gross_amount: Some(value),
            ..self
        }
    }

    pub fn commission(self, value: f64) -> Self {
        Self {
            commission: Some(value),
            ..self
        }
    }

    pub fn stamp_tax(self, value: f64) -> Self {
        Self {
            stamp_tax: Some(value),
            ..self
        }
    }

    pub fn net_cash_delta(self, value: f64) -> Self {
        Self {
            net_cash_delta: Some(value),
            ..self
        }
    }

    pub fn timestamp(self, value: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(value),
            ..self
        }
    }

    pub fn build(self) -> Result<Fill, ExecutionError> {
        Ok(Fill {
            symbol: self.symbol.ok_or(ExecutionError::BuilderIncomplete)?,
            side: self.side.ok_or(ExecutionError::BuilderIncomplete)?,
            shares: self.shares.ok_or(ExecutionError::BuilderIncomplete)?,
            price: self.price.ok_or(ExecutionError::BuilderIncomplete)?,
            gross_amount: self.gross_amount.ok_or(ExecutionError::BuilderIncomplete)?,
            commission: self.commission.ok_or(ExecutionError::BuilderIncomplete)?,
            stamp_tax: self.stamp_tax.ok_or(ExecutionError::BuilderIncomplete)?,
            net_cash_delta: self
                .net_cash_delta
                .ok_or(ExecutionError::BuilderIncomplete)?,
            timestamp: self.timestamp.ok_or(ExecutionError::BuilderIncomplete)?,
        })
    }
}
