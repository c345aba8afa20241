use thiserror::Error;

/// All errors generated in the metrics module.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("finalize() called with an empty equity curve")]
    EmptyEquityCurve,
}
