//! # ashare-backtest
//! A single-threaded, deterministic bar-by-bar backtest engine for A-share equity trading
//! strategies. It is:
//! * **Deterministic**: every run over the same inputs produces byte-identical fills and equity
//! curves — no wall-clock time, no thread races, no randomness anywhere in the simulation path.
//! * **Historical-only**: the [`indicator`] and [`data`] modules only ever expose bars and
//! indicator values up to the current benchmark step, so a strategy cannot accidentally read the
//! future.
//! * **A-share aware**: T+1 settlement, 100-share lots, sell-side stamp tax, and commission floors
//! are first-class, not bolted on.
//!
//! ## Overview
//! At a high level, the engine provides several de-coupled components that interact through the
//! single-threaded main loop in [`engine::run`]:
//!
//! * **Data**: [`data::feed::DataFeed`] aligns every symbol's bars onto a shared
//! [`data::timeline::BenchmarkTimeline`] and serves historical-only slices as the simulation
//! clock advances.
//! * **Indicator**: [`indicator::IndicatorEngine`] precomputes every registered indicator's value
//! at every benchmark step in one pass, then serves reads through a cursor that can never look
//! past the current bar.
//! * **Portfolio**: [`portfolio::state::PortfolioState`] is the authoritative ledger — cash,
//! positions, and T+1 settlement buckets — mutated only by applying [`execution::fill::Fill`]s.
//! * **Execution**: [`execution::engine::ExecutionEngine`] converts queued
//! [`execution::order::Order`]s into lot-rounded fills under the configured pricing, slippage and
//! fee rules, sells before buys within a bar.
//! * **Strategy**: the [`strategy::Strategy`] trait's default no-op callbacks let a strategy
//! implement only the hooks it needs, reading the bar through a [`context::BarContext`] and
//! queuing orders through its [`context::OrderHelper`].
//! * **Metrics**: [`metrics::MetricsRecorder`] accumulates the equity curve and fill log over a
//! run and computes the terminal [`metrics::stats::Stats`] summary (total/annualized return, max
//! drawdown, Sharpe, win rate, profit/loss ratio).
//! * **Diagnostics**: non-fatal conditions (a bar outside the benchmark timeline, an order
//! dropped or downsized) are logged via `tracing::warn!` and also collected into a
//! [`diagnostics::Diagnostics`] sink returned on [`metrics::stats::RunOutput`].
//!
//! ## Getting Started
//! ```
//! use ashare_backtest::config::Config;
//! use ashare_backtest::context::BarContext;
//! use ashare_backtest::data::bar::{Bar, Field};
//! use ashare_backtest::data::feed::DataFeed;
//! use ashare_backtest::engine;
//! use ashare_backtest::execution::order::QuantityType;
//! use ashare_backtest::indicator::builtin::BuiltinKind;
//! use ashare_backtest::indicator::{IndicatorDef, IndicatorEngine};
//! use ashare_backtest::strategy::Strategy;
//! use chrono::{TimeZone, Utc};
//!
//! struct BuyAndHold;
//!
//! impl Strategy for BuyAndHold {
//!     fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
//!         if ctx.position("600000.SH").is_none() && ctx.is_tradable("600000.SH") {
//!             ctx.order().buy("600000.SH", 1.0, QuantityType::Weight);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn bar(day: u32, close: f64) -> Bar {
//!     Bar::builder()
//!         .timestamp(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
//!         .open(close)
//!         .high(close)
//!         .low(close)
//!         .close(close)
//!         .volume(10_000.0)
//!         .build()
//!         .unwrap()
//! }
//!
//! let bars = vec![bar(1, 10.0), bar(2, 10.5), bar(3, 11.0)];
//!
//! let data = DataFeed::builder()
//!     .benchmark(bars.clone())
//!     .add_market_data("600000.SH", bars.clone())
//!     .build()
//!     .unwrap();
//!
//! let mut indicators = IndicatorEngine::new();
//! indicators
//!     .register(
//!         "sma5",
//!         IndicatorDef::Builtin(BuiltinKind::Sma { period: 5, field: Field::Close }),
//!     )
//!     .unwrap();
//!
//! let config = Config::default();
//! let output = engine::run(&mut BuyAndHold, data, indicators, &bars, &config).unwrap();
//! output.stats.print();
//! ```

#![warn(
// missing_debug_implementations,
missing_copy_implementations,
// rust_2018_idioms,
// missing_docs
)]

/// Run configuration: cash, fees, execution mode, lot size, T+0 symbol overrides.
pub mod config;

/// [`context::BarContext`], the read surface a [`strategy::Strategy`] sees each bar, and
/// [`context::OrderHelper`], its order-queuing handle.
pub mod context;

/// [`data::bar::Bar`], [`data::timeline::BenchmarkTimeline`], and [`data::feed::DataFeed`], the
/// aligned historical-only bar feed that drives the simulation clock.
pub mod data;

/// [`diagnostics::Diagnostics`] and [`diagnostics::Warning`] — the non-fatal warning sink
/// surfaced alongside a run's [`metrics::stats::RunOutput`].
pub mod diagnostics;

/// The single-threaded main loop: [`engine::run`].
pub mod engine;

/// [`error::BacktestError`], the top-level error aggregating every component's errors.
pub mod error;

/// [`execution::engine::ExecutionEngine`], [`execution::order::Order`], and
/// [`execution::fill::Fill`] — order queuing, pricing, fees, and fill generation.
pub mod execution;

/// [`indicator::IndicatorEngine`] and its builtin/user-callable indicator definitions.
pub mod indicator;

/// Accumulates the equity curve and fill log over a run, and computes the terminal performance
/// summary.
pub mod metrics;

/// [`portfolio::state::PortfolioState`], the authoritative cash/position/settlement ledger.
pub mod portfolio;

/// [`strategy::Strategy`], the trait a trading strategy implements.
pub mod strategy;

#[macro_use]
extern crate prettytable;
