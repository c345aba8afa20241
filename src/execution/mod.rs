/// Errors generated in the execution module.
pub mod error;

/// [`order::Order`] and its [`order::Side`]/[`order::QuantityType`] tags.
pub mod order;

/// [`fill::Fill`]: the record of one executed trade leg.
pub mod fill;

/// [`engine::ExecutionEngine`]: converts queued orders to lot-rounded fills and commits them to
/// the portfolio.
pub mod engine;
