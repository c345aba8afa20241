use crate::data::error::DataError;
use crate::execution::error::ExecutionError;
use crate::indicator::error::IndicatorError;
use crate::metrics::error::MetricsError;
use crate::portfolio::error::PortfolioError;
use thiserror::Error;

/// All errors generated by the top-level backtest engine, aggregating every component error.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("strategy callback failed at bar {bar_index} ({symbol:?}): {message}")]
    Strategy {
        bar_index: usize,
        symbol: Option<String>,
        message: String,
    },
}
