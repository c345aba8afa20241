use crate::data::error::DataError;
use chrono::{DateTime, Utc};

/// The master simulation clock. Every benchmark timestamp is one simulation step; no other
/// component advances independently of it.
#[derive(Clone, Debug)]
pub struct BenchmarkTimeline {
    timestamps: Vec<DateTime<Utc>>,
}

impl BenchmarkTimeline {
    /// Builds a [`BenchmarkTimeline`] from a strictly increasing, non-empty sequence of
    /// timestamps.
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self, DataError> {
        if timestamps.is_empty() {
            return Err(DataError::InvalidBenchmark);
        }
        if !timestamps.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(DataError::InvalidBenchmark);
        }
        Ok(Self { timestamps })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<DateTime<Utc>> {
        self.timestamps.get(index).copied()
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }
}
