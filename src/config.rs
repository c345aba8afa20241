use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reference price a bar contributes to order pricing.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Close,
    Open,
    Vwap,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Close
    }
}

/// Number of shares making up one trading lot. Fixed at 100 for the A-share market.
pub const LOT_SIZE: u64 = 100;

/// Top level configuration for a backtest run.
///
/// Deserializable with [`serde`] so callers can load it from the same config file format
/// (TOML/JSON/YAML) they use elsewhere; [`Config::default`] matches the documented defaults and
/// [`Config::validate`] turns misconfiguration into a [`BacktestError::Config`] before the main
/// loop starts.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Inclusive lower bound used to clip the benchmark timeline before the run starts; `None`
    /// is unbounded. Applied by [`crate::engine::run`] via [`crate::data::feed::DataFeed::clip`].
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound, same semantics as `start`.
    pub end: Option<DateTime<Utc>>,
    pub cash: f64,
    pub commission_rate: f64,
    pub min_commission: f64,
    pub stamp_tax_rate: f64,
    pub slippage_bps: f64,
    pub execution_mode: ExecutionMode,
    pub t0_symbols: HashSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            cash: 1e5,
            commission_rate: 5e-4,
            min_commission: 5.0,
            stamp_tax_rate: 1e-3,
            slippage_bps: 0.0,
            execution_mode: ExecutionMode::Close,
            t0_symbols: HashSet::new(),
        }
    }
}

impl Config {
    /// Validates the configuration, returning a [`BacktestError::Config`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.cash < 0.0 {
            return Err(BacktestError::Config("cash must be non-negative".into()));
        }
        if self.commission_rate < 0.0 {
            return Err(BacktestError::Config(
                "commission_rate must be non-negative".into(),
            ));
        }
        if self.min_commission < 0.0 {
            return Err(BacktestError::Config(
                "min_commission must be non-negative".into(),
            ));
        }
        if self.stamp_tax_rate < 0.0 {
            return Err(BacktestError::Config(
                "stamp_tax_rate must be non-negative".into(),
            ));
        }
        if self.slippage_bps < 0.0 {
            return Err(BacktestError::Config(
                "slippage_bps must be non-negative".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(BacktestError::Config("start must be <= end".into()));
            }
        }
        Ok(())
    }

    /// Rounds a raw share count down to the nearest whole lot. Negative inputs floor to zero.
    pub fn floor_to_lot(shares: f64) -> u64 {
        if shares <= 0.0 {
            return 0;
        }
        (shares / LOT_SIZE as f64).floor() as u64 * LOT_SIZE
    }

    pub fn is_t0(&self, symbol: &str) -> bool {
        self.t0_symbols.contains(symbol)
    }
}
