use thiserror::Error;

/// All errors generated in the indicator module.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("indicator '{0}' is already registered")]
    DuplicateName(String),

    #[error("indicator '{0}' was never registered")]
    UnknownIndicator(String),

    #[error("precompute() must be called exactly once, before the main loop starts")]
    AlreadyPrecomputed,

    #[error("set_cursor()/get_value() called before precompute()")]
    NotPrecomputed,
}
