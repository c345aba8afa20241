use crate::data::error::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV observation for one symbol over one time interval.
///
/// `low <= open, close <= high` is trusted input and is not validated here; the engine never
/// reads from fields it doesn't need, so a malformed bar only affects the symbol that carries it.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: Option<f64>,
    pub pre_close: Option<f64>,
    pub suspended: bool,
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 0.0,
            amount: None,
            pre_close: None,
            suspended: false,
        }
    }
}

impl Bar {
    /// Returns a [`BarBuilder`] instance.
    pub fn builder() -> BarBuilder {
        BarBuilder::new()
    }

    /// The reference price for a given [`crate::config::ExecutionMode`].
    pub fn reference_price(&self, mode: crate::config::ExecutionMode) -> f64 {
        use crate::config::ExecutionMode;
        match mode {
            ExecutionMode::Close => self.close,
            ExecutionMode::Open => self.open,
            ExecutionMode::Vwap => match self.amount {
                Some(amount) if self.volume > 0.0 => amount / self.volume,
                _ => self.close,
            },
        }
    }

    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
        }
    }
}

/// A named OHLCV column, used by indicator definitions to select their input series.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Builder to construct [`Bar`] instances.
#[derive(Debug, Default)]
pub struct BarBuilder {
    pub timestamp: Option<DateTime<Utc>>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
    pub pre_close: Option<f64>,
    pub suspended: bool,
}

impl BarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(self, value: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(value),
            ..self
        }
    }

    pub fn open(self, value: f64) -> Self {
        Self {
            open: Some(value),
            ..self
        }
    }

    pub fn high(self, value: f64) -> Self {
        Self {
            high: Some(value),
            ..self
        }
    }

    pub fn low(self, value: f64) -> Self {
        Self {
            low: Some(value),
            ..self
        }
    }

    pub fn close(self, value: f64) -> Self {
        Self {
            close: Some(value),
            ..self
        }
    }

    pub fn volume(self, value: f64) -> Self {
        Self {
            volume: Some(value),
            ..self
        }
    }

    pub fn amount(self, value: f64) -> Self {
        Self {
            amount: Some(value),
            ..self
        }
    }

    pub fn pre_close(self, value: f64) -> Self {
        Self {
            pre_close: Some(value),
            ..self
        }
    }

    pub fn suspended(self, value: bool) -> Self {
        Self {
            suspended: value,
            ..self
        }
    }

    pub fn build(self) -> Result<Bar, DataError> {
        let timestamp = self.timestamp.ok_or(DataError::BuilderIncomplete)?;
        let open = self.open.ok_or(DataError::BuilderIncomplete)?;
        let high = self.high.ok_or(DataError::BuilderIncomplete)?;
        let low = self.low.ok_or(DataError::BuilderIncomplete)?;
        let close = self.close.ok_or(DataError::BuilderIncomplete)?;
        let volume = self.volume.ok_or(DataError::BuilderIncomplete)?;

        Ok(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            amount: self.amount,
            pre_close: self.pre_close,
            suspended: self.suspended,
        })
    }
}
