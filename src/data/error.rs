use thiserror::Error;

/// All errors generated in the data module.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("benchmark timeline must be non-empty and strictly increasing")]
    InvalidBenchmark,

    #[error("get_bars count must be >= 1, got {0}")]
    InvalidCount(usize),

    #[error("failed to build struct due to missing attributes")]
    BuilderIncomplete,
}
