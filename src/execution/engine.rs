use crate::config::{Config, LOT_SIZE};
use crate::data::bar::Bar;
use crate::diagnostics::{Diagnostics, Warning};
use crate::execution::fill::Fill;
use crate::execution::order::{Order, QuantityType, Side};
use crate::portfolio::error::PortfolioError;
use crate::portfolio::state::PortfolioState;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use tracing::warn;

/// Consumes orders queued by [`crate::context::OrderHelper`] during the strategy callback,
/// converts them to lot-rounded fills under the configured pricing/fee/settlement rules, and
/// commits them to the [`PortfolioState`].
///
/// The order queue lives behind a [`RefCell`] so [`crate::context::OrderHelper`] can enqueue
/// through a shared reference while the rest of [`crate::context::BarContext`] holds ordinary
/// immutable borrows into the same engine for the duration of one strategy callback.
#[derive(Default)]
pub struct ExecutionEngine {
    queue: RefCell<Vec<Order>>,
    next_seq: Cell<u64>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an order with a fresh `enqueue_seq`. Takes `&self` so it can be called from
    /// [`crate::context::OrderHelper`] while other immutable borrows into the bar context are
    /// live.
    pub fn enqueue(&self, symbol: impl Into<String>, side: Side, qty_type: QuantityType, qty_value: f64) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.queue.borrow_mut().push(Order {
            symbol: symbol.into(),
            side,
            qty_type,
            qty_value,
            enqueue_seq: seq,
        });
    }

    /// Drains the queue, executes sells then buys (stable, preserving `enqueue_seq` within each
    /// group), and commits every resulting fill to `portfolio`. Returns the fills in execution
    /// order.
    pub fn drain_and_execute(
        &self,
        current_bars: &IndexMap<String, Bar>,
        portfolio: &mut PortfolioState,
        config: &Config,
        trade_day: NaiveDate,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Fill>, PortfolioError> {
        let mut orders: Vec<Order> = self.queue.borrow_mut().drain(..).collect();
        orders.sort_by_key(|order| matches!(order.side, Side::Buy));

        let prices: IndexMap<String, f64> = current_bars
            .iter()
            .map(|(symbol, bar)| (symbol.clone(), bar.reference_price(config.execution_mode)))
            .collect();

        let mut fills = Vec::with_capacity(orders.len());
        for order in orders {
            let Some(bar) = current_bars.get(&order.symbol) else {
                warn!(symbol = %order.symbol, "dropping order: symbol not tradable this bar");
                diagnostics.push(Warning::OrderDropped {
                    symbol: order.symbol.clone(),
                    reason: "symbol not tradable this bar".into(),
                });
                continue;
            };
            if bar.suspended {
                warn!(symbol = %order.symbol, "dropping order: symbol suspended this bar");
                diagnostics.push(Warning::OrderDropped {
                    symbol: order.symbol.clone(),
                    reason: "symbol suspended this bar".into(),
                });
                continue;
            }

            let price_ref = bar.reference_price(config.execution_mode);
            let fill_price = apply_slippage(price_ref, order.side, config.slippage_bps);

            let equity = portfolio.equity_at(&prices);
            let market_value = portfolio
                .position(&order.symbol)
                .map(|position| position.market_value(price_ref))
                .unwrap_or(0.0);

            let mut shares = convert_to_shares(&order, price_ref, equity, market_value);
            if shares == 0 {
                warn!(symbol = %order.symbol, "dropping order: rounds to zero lots");
                diagnostics.push(Warning::OrderDropped {
                    symbol: order.symbol.clone(),
                    reason: "rounds to zero lots".into(),
                });
                continue;
            }

            match order.side {
                Side::Sell => {
                    let available = portfolio
                        .position(&order.symbol)
                        .map(|position| position.available_shares)
                        .unwrap_or(0);
                    if shares > available {
                        warn!(
                            symbol = %order.symbol,
                            requested = shares,
                            available,
                            "clamping sell order to available shares"
                        );
                        diagnostics.push(Warning::OrderDownsized {
                            symbol: order.symbol.clone(),
                            requested: shares,
                            filled: available,
                            reason: "insufficient available shares".into(),
                        });
                        shares = available;
                    }
                    if shares == 0 {
                        warn!(symbol = %order.symbol, "dropping sell order: no available shares");
                        diagnostics.push(Warning::OrderDropped {
                            symbol: order.symbol.clone(),
                            reason: "no available shares".into(),
                        });
                        continue;
                    }

                    let gross = shares as f64 * fill_price;
                    let commission = commission_for(gross, config);
                    let stamp_tax = gross * config.stamp_tax_rate;

                    let fill = Fill::builder()
                        .symbol(order.symbol.clone())
                        .side(Side::Sell)
                        .shares(shares)
                        .price(fill_price)
                        .gross_amount(gross)
                        .commission(commission)
                        .stamp_tax(stamp_tax)
                        .net_cash_delta(gross - commission - stamp_tax)
                        .timestamp(bar.timestamp)
                        .build()
                        .expect("all required fields set above");

                    portfolio.apply_sell(&fill)?;
                    fills.push(fill);
                }
                Side::Buy => {
                    let requested = shares;
                    shares = fit_to_cash(shares, fill_price, portfolio.cash(), config);
                    if shares == 0 {
                        warn!(symbol = %order.symbol, "dropping buy order: insufficient cash for one lot");
                        diagnostics.push(Warning::OrderDropped {
                            symbol: order.symbol.clone(),
                            reason: "insufficient cash for one lot".into(),
                        });
                        continue;
                    }
                    if shares < requested {
                        diagnostics.push(Warning::OrderDownsized {
                            symbol: order.symbol.clone(),
                            requested,
                            filled: shares,
                            reason: "insufficient cash".into(),
                        });
                    }

                    let gross = shares as f64 * fill_price;
                    let commission = commission_for(gross, config);

                    let fill = Fill::builder()
                        .symbol(order.symbol.clone())
                        .side(Side::Buy)
                        .shares(shares)
                        .price(fill_price)
                        .gross_amount(gross)
                        .commission(commission)
                        .stamp_tax(0.0)
                        .net_cash_delta(-(gross + commission))
                        .timestamp(bar.timestamp)
                        .build()
                        .expect("all required fields set above");

                    portfolio.apply_buy(&fill, trade_day)?;
                    fills.push(fill);
                }
            }
        }

        Ok(fills)
    }
}

fn apply_slippage(price_ref: f64, side: Side, slippage_bps: f64) -> f64 {
    let adjustment = slippage_bps / 10_000.0;
    match side {
        Side::Buy => price_ref * (1.0 + adjustment),
        Side::Sell => price_ref * (1.0 - adjustment),
    }
}

fn commission_for(gross: f64, config: &Config) -> f64 {
    (gross * config.commission_rate).max(config.min_commission)
}

/// Converts an order's `(qty_type, qty_value)` into a lot-rounded share count. Pure function of
/// the order and the reference price/equity/market value snapshot passed in.
fn convert_to_shares(order: &Order, price: f64, equity: f64, current_market_value: f64) -> u64 {
    if price <= 0.0 {
        return 0;
    }
    match order.qty_type {
        QuantityType::Count => Config::floor_to_lot(order.qty_value),
        QuantityType::Cash => Config::floor_to_lot(order.qty_value / price),
        QuantityType::Weight => {
            let desired_value = order.qty_value * equity;
            let delta = (desired_value - current_market_value).abs();
            Config::floor_to_lot(delta / price)
        }
    }
}

/// Reduces a buy's share count by whole lots until its total cost fits within available cash.
fn fit_to_cash(mut shares: u64, fill_price: f64, cash: f64, config: &Config) -> u64 {
    while shares > 0 {
        let gross = shares as f64 * fill_price;
        let total_cost = gross + commission_for(gross, config);
        if total_cost <= cash + 1e-9 {
            return shares;
        }
        shares = shares.saturating_sub(LOT_SIZE);
    }
    0
}
