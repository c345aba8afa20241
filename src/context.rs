use crate::data::bar::Bar;
use crate::data::error::DataError;
use crate::data::feed::DataFeed;
use crate::execution::engine::ExecutionEngine;
use crate::execution::order::{QuantityType, Side};
use crate::indicator::error::IndicatorError;
use crate::indicator::{IndicatorDef, IndicatorEngine};
use crate::portfolio::state::PortfolioState;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::cell::RefCell;

/// A read-only snapshot of one held position, scaled to the bar's reference prices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionView {
    pub quantity: u64,
    pub available: u64,
    pub avg_cost: f64,
    pub market_value: f64,
    pub weight: f64,
}

/// The sole surface exposed to user strategy code during one bar.
///
/// A non-owning view: it borrows the engine's components for the duration of one strategy
/// callback and does not retain them afterwards. [`BarContext::order`] hands out an
/// [`OrderHelper`] that enqueues into the [`ExecutionEngine`] through a shared reference, so
/// orders can be queued without ever needing a mutable borrow of the context itself.
pub struct BarContext<'a> {
    timestamp: DateTime<Utc>,
    data: &'a DataFeed,
    indicators: &'a IndicatorEngine,
    portfolio: &'a PortfolioState,
    execution: &'a ExecutionEngine,
    prices: IndexMap<String, f64>,
    scratch: &'a mut IndexMap<String, serde_json::Value>,
    pending_indicators: &'a RefCell<Vec<(String, IndicatorDef)>>,
}

impl<'a> BarContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        timestamp: DateTime<Utc>,
        data: &'a DataFeed,
        indicators: &'a IndicatorEngine,
        portfolio: &'a PortfolioState,
        execution: &'a ExecutionEngine,
        prices: IndexMap<String, f64>,
        scratch: &'a mut IndexMap<String, serde_json::Value>,
        pending_indicators: &'a RefCell<Vec<(String, IndicatorDef)>>,
    ) -> Self {
        Self {
            timestamp,
            data,
            indicators,
            portfolio,
            execution,
            prices,
            scratch,
            pending_indicators,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.data.symbols()
    }

    pub fn cash(&self) -> f64 {
        self.portfolio.cash()
    }

    pub fn equity(&self) -> f64 {
        self.portfolio.equity_at(&self.prices)
    }

    pub fn is_tradable(&self, symbol: &str) -> bool {
        self.data.is_tradable(symbol)
    }

    /// Up to `count` most recent present bars for `symbol`, oldest first, ending at the current
    /// bar.
    pub fn bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        self.data.get_bars(symbol, count)
    }

    /// A read-only view of `symbol`'s current position, or `None` if it is flat.
    pub fn position(&self, symbol: &str) -> Option<PositionView> {
        let position = self.portfolio.position(symbol)?;
        let price = self.prices.get(symbol).copied().unwrap_or(position.avg_cost);
        let market_value = position.market_value(price);
        let equity = self.equity();
        Some(PositionView {
            quantity: position.quantity_shares,
            available: position.available_shares,
            avg_cost: position.avg_cost,
            market_value,
            weight: if equity > 0.0 { market_value / equity } else { 0.0 },
        })
    }

    /// The most recent value of a registered indicator for `symbol`, as of the current bar.
    pub fn indicator(&self, name: &str, symbol: &str) -> Result<Option<f64>, IndicatorError> {
        self.indicators.get(name, symbol)
    }

    /// Up to `count` most recent values of a registered indicator for `symbol`, oldest first.
    pub fn indicator_series(
        &self,
        name: &str,
        symbol: &str,
        count: usize,
    ) -> Result<Vec<Option<f64>>, IndicatorError> {
        self.indicators.get_series(name, symbol, count)
    }

    /// Queues an indicator for registration. Only takes effect when called from
    /// [`crate::strategy::Strategy::on_start`]: the main loop precomputes every queued
    /// definition right after `on_start` returns, before the first bar is processed. Calling
    /// this once bars are already running returns [`IndicatorError::AlreadyPrecomputed`].
    pub fn register_indicator(
        &self,
        name: impl Into<String>,
        def: IndicatorDef,
    ) -> Result<(), IndicatorError> {
        if self.indicators.is_precomputed() {
            return Err(IndicatorError::AlreadyPrecomputed);
        }
        self.pending_indicators.borrow_mut().push((name.into(), def));
        Ok(())
    }

    /// Scratch key-value store that persists across bars, for strategy-local state.
    pub fn scratch(&mut self) -> &mut IndexMap<String, serde_json::Value> {
        self.scratch
    }

    /// Returns an [`OrderHelper`] for enqueueing orders this bar.
    pub fn order(&self) -> OrderHelper<'_> {
        OrderHelper {
            execution: self.execution,
            portfolio: self.portfolio,
            prices: &self.prices,
        }
    }
}

/// Stateless wrapper around the [`ExecutionEngine`]'s order queue. Orders enqueued here are not
/// executed until the strategy's bar callback returns.
pub struct OrderHelper<'a> {
    execution: &'a ExecutionEngine,
    portfolio: &'a PortfolioState,
    prices: &'a IndexMap<String, f64>,
}

impl<'a> OrderHelper<'a> {
    pub fn buy(&self, symbol: impl Into<String>, quantity: f64, quantity_type: QuantityType) {
        self.execution.enqueue(symbol, Side::Buy, quantity_type, quantity);
    }

    /// Enqueues a sell. With `quantity_type = Weight`, `quantity` is interpreted as the target
    /// weight to reduce down to (not the weight's worth of cash to raise) — use
    /// `quantity_type = Cash` for the latter.
    pub fn sell(&self, symbol: impl Into<String>, quantity: f64, quantity_type: QuantityType) {
        self.execution.enqueue(symbol, Side::Sell, quantity_type, quantity);
    }

    /// Rebalances every `(symbol, target_weight)` pair towards its target weight, skipping any
    /// symbol already within one lot's worth of its target.
    pub fn target(&self, weights: &IndexMap<String, f64>) {
        let equity = self.portfolio.equity_at(self.prices);
        if equity <= 0.0 {
            return;
        }

        for (symbol, &target_weight) in weights {
            let Some(&price) = self.prices.get(symbol) else {
                continue;
            };
            if price <= 0.0 {
                continue;
            }

            let market_value = self
                .portfolio
                .position(symbol)
                .map(|position| position.market_value(price))
                .unwrap_or(0.0);
            let current_weight = market_value / equity;

            let one_lot_weight = crate::config::LOT_SIZE as f64 * price / equity;
            if (target_weight - current_weight).abs() <= one_lot_weight {
                continue;
            }

            if target_weight > current_weight {
                self.execution
                    .enqueue(symbol.clone(), Side::Buy, QuantityType::Weight, target_weight);
            } else {
                self.execution
                    .enqueue(symbol.clone(), Side::Sell, QuantityType::Weight, target_weight);
            }
        }
    }
}
