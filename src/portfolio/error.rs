use thiserror::Error;

/// All errors generated in the portfolio module.
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("insufficient cash: needed {needed}, have {available}")]
    InsufficientCash { needed: f64, available: f64 },

    #[error("insufficient available shares for {symbol}: needed {needed}, have {available}")]
    InsufficientShares {
        symbol: String,
        needed: u64,
        available: u64,
    },

    #[error("portfolio invariant violated: {0}")]
    InvariantViolation(String),
}
