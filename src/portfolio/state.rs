use crate::execution::fill::Fill;
use crate::execution::order::Side;
use crate::portfolio::error::PortfolioError;
use crate::portfolio::settlement::SettlementBucket;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

const TOLERANCE: f64 = 1e-6;

/// A held position in one symbol.
///
/// `quantity_shares` is always a non-negative multiple of the lot size; `available_shares` is
/// the portion not locked by T+1 settlement, and is always `<= quantity_shares`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub quantity_shares: u64,
    pub avg_cost: f64,
    pub available_shares: u64,
}

impl Position {
    fn flat() -> Self {
        Self {
            quantity_shares: 0,
            avg_cost: 0.0,
            available_shares: 0,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity_shares as f64 * price
    }
}

/// The authoritative account ledger: cash, positions, settlement buckets, and fill log.
///
/// Mutated only by [`crate::execution::engine::ExecutionEngine`] (via
/// [`PortfolioState::apply_buy`]/[`PortfolioState::apply_sell`]) and by the main loop's daily
/// settlement roll.
#[derive(Debug)]
pub struct PortfolioState {
    cash: f64,
    positions: IndexMap<String, Position>,
    buckets: IndexMap<String, SettlementBucket>,
    t0_symbols: HashSet<String>,
    fills: Vec<Fill>,
    current_day: Option<NaiveDate>,
}

impl PortfolioState {
    pub fn new(initial_cash: f64, t0_symbols: HashSet<String>) -> Self {
        Self {
            cash: initial_cash,
            positions: IndexMap::new(),
            buckets: IndexMap::new(),
            t0_symbols,
            fills: Vec::new(),
            current_day: None,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &IndexMap<String, Position> {
        &self.positions
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    fn is_t0(&self, symbol: &str) -> bool {
        self.t0_symbols.contains(symbol)
    }

    /// Total account equity given a map of current prices. Symbols with no current price (e.g.
    /// suspended this bar) fall back to the position's average cost.
    pub fn equity_at(&self, prices: &IndexMap<String, f64>) -> f64 {
        let positions_value: f64 = self
            .positions
            .iter()
            .map(|(symbol, position)| {
                let price = prices
                    .get(symbol)
                    .copied()
                    .unwrap_or(position.avg_cost);
                position.market_value(price)
            })
            .sum();
        self.cash + positions_value
    }

    /// Applies a buy fill: debits cash, amortizes commission into the position's average cost,
    /// and records the purchase in the symbol's settlement bucket.
    pub fn apply_buy(&mut self, fill: &Fill, trade_day: NaiveDate) -> Result<(), PortfolioError> {
        debug_assert_eq!(fill.side, Side::Buy);

        let total_cost = fill.gross_amount + fill.commission;
        let new_cash = self.cash - total_cost;
        if new_cash < -TOLERANCE {
            return Err(PortfolioError::InvariantViolation(format!(
                "buy of {} shares of {} would drive cash negative: {new_cash}",
                fill.shares, fill.symbol
            )));
        }
        self.cash = new_cash.max(0.0);

        let position = self
            .positions
            .entry(fill.symbol.clone())
            .or_insert_with(Position::flat);
        let new_qty = position.quantity_shares + fill.shares;
        position.avg_cost = (position.quantity_shares as f64 * position.avg_cost
            + fill.shares as f64 * fill.price
            + fill.commission)
            / new_qty as f64;
        position.quantity_shares = new_qty;

        let is_t0 = self.is_t0(&fill.symbol);
        if is_t0 {
            position.available_shares += fill.shares;
        }

        self.buckets
            .entry(fill.symbol.clone())
            .or_insert_with(|| SettlementBucket::new(is_t0))
            .record_purchase(trade_day, fill.shares);

        debug!(symbol = %fill.symbol, shares = fill.shares, price = fill.price, "applied buy fill");
        self.fills.push(fill.clone());
        Ok(())
    }

    /// Applies a sell fill: requires `shares <= available_shares`, credits cash net of
    /// commission and stamp tax, and draws down the settlement bucket's audit trail.
    pub fn apply_sell(&mut self, fill: &Fill) -> Result<(), PortfolioError> {
        debug_assert_eq!(fill.side, Side::Sell);

        let position = self
            .positions
            .get_mut(&fill.symbol)
            .filter(|position| position.available_shares >= fill.shares)
            .ok_or_else(|| PortfolioError::InsufficientShares {
                symbol: fill.symbol.clone(),
                needed: fill.shares,
                available: self
                    .positions
                    .get(&fill.symbol)
                    .map(|position| position.available_shares)
                    .unwrap_or(0),
            })?;

        self.cash += fill.gross_amount - fill.commission - fill.stamp_tax;
        position.quantity_shares -= fill.shares;
        position.available_shares -= fill.shares;
        if position.quantity_shares == 0 {
            position.avg_cost = 0.0;
        }

        debug!(symbol = %fill.symbol, shares = fill.shares, price = fill.price, "applied sell fill");
        self.fills.push(fill.clone());
        Ok(())
    }

    /// Ages every symbol's settlement bucket past `new_day`, releasing previously-locked shares
    /// into `available_shares`. Called by the main loop whenever the current bar's day differs
    /// from the previous one.
    pub fn roll_day(&mut self, new_day: NaiveDate) {
        for (symbol, bucket) in self.buckets.iter_mut() {
            let released = bucket.roll(new_day);
            if released > 0 {
                if let Some(position) = self.positions.get_mut(symbol) {
                    position.available_shares =
                        (position.available_shares + released).min(position.quantity_shares);
                }
            }
        }
        self.current_day = Some(new_day);
    }

    pub fn current_day(&self) -> Option<NaiveDate> {
        self.current_day
    }

    /// Checks the invariants documented on [`PortfolioState`]; used by tests and by the main
    /// loop in debug builds after every bar.
    pub fn check_invariants(&self) -> Result<(), PortfolioError> {
        if self.cash < -TOLERANCE {
            return Err(PortfolioError::InvariantViolation(format!(
                "cash went negative: {}",
                self.cash
            )));
        }
        for (symbol, position) in &self.positions {
            if position.quantity_shares % crate::config::LOT_SIZE != 0 {
                return Err(PortfolioError::InvariantViolation(format!(
                    "{symbol} quantity_shares {} is not lot-aligned",
                    position.quantity_shares
                )));
            }
            if position.available_shares > position.quantity_shares {
                return Err(PortfolioError::InvariantViolation(format!(
                    "{symbol} available_shares {} exceeds quantity_shares {}",
                    position.available_shares, position.quantity_shares
                )));
            }
            if position.quantity_shares == 0 && position.avg_cost != 0.0 {
                return Err(PortfolioError::InvariantViolation(format!(
                    "{symbol} has zero quantity but non-zero avg_cost {}",
                    position.avg_cost
                )));
            }
            let locked = self
                .buckets
                .get(symbol)
                .map(|bucket| bucket.locked_shares())
                .unwrap_or(0);
            if locked != position.quantity_shares - position.available_shares {
                return Err(PortfolioError::InvariantViolation(format!(
                    "{symbol} bucket locked_shares {} does not match quantity_shares - available_shares {}",
                    locked,
                    position.quantity_shares - position.available_shares
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::order::Side;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap().date_naive()
    }

    fn ts(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn buy_fill(symbol: &str, shares: u64, price: f64, commission: f64, d: u32) -> Fill {
        Fill::builder()
            .symbol(symbol)
            .side(Side::Buy)
            .shares(shares)
            .price(price)
            .gross_amount(shares as f64 * price)
            .commission(commission)
            .stamp_tax(0.0)
            .net_cash_delta(-(shares as f64 * price + commission))
            .timestamp(ts(d))
            .build()
            .unwrap()
    }

    fn sell_fill(
        symbol: &str,
        shares: u64,
        price: f64,
        commission: f64,
        stamp_tax: f64,
        d: u32,
    ) -> Fill {
        let gross = shares as f64 * price;
        Fill::builder()
            .symbol(symbol)
            .side(Side::Sell)
            .shares(shares)
            .price(price)
            .gross_amount(gross)
            .commission(commission)
            .stamp_tax(stamp_tax)
            .net_cash_delta(gross - commission - stamp_tax)
            .timestamp(ts(d))
            .build()
            .unwrap()
    }

    #[test]
    fn should_apply_buy_fill_amortizing_commission_into_avg_cost() {
        let mut portfolio = PortfolioState::new(100000.0, HashSet::new());
        let fill = buy_fill("600000.SH", 100, 10.00, 5.0, 1);
        portfolio.apply_buy(&fill, day(1)).unwrap();

        assert_eq!(portfolio.cash(), 100000.0 - 1000.0 - 5.0);
        let position = portfolio.position("600000.SH").unwrap();
        assert_eq!(position.quantity_shares, 100);
        assert!((position.avg_cost - 10.05).abs() < TOLERANCE);
        assert_eq!(position.available_shares, 0);
    }

    #[test]
    fn should_lock_t1_shares_until_settlement_roll() {
        let mut portfolio = PortfolioState::new(100000.0, HashSet::new());
        let fill = buy_fill("600000.SH", 100, 10.00, 5.0, 1);
        portfolio.apply_buy(&fill, day(1)).unwrap();

        let sell_attempt = sell_fill("600000.SH", 100, 11.0, 5.0, 1.1, 1);
        assert!(portfolio.apply_sell(&sell_attempt).is_err());

        portfolio.roll_day(day(2));
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 100);
        portfolio.apply_sell(&sell_attempt).unwrap();
        assert_eq!(portfolio.position("600000.SH").unwrap().quantity_shares, 0);
    }

    #[test]
    fn should_make_t0_shares_available_immediately() {
        let mut t0 = HashSet::new();
        t0.insert("600000.SH".to_string());
        let mut portfolio = PortfolioState::new(100000.0, t0);

        let fill = buy_fill("600000.SH", 100, 10.00, 5.0, 1);
        portfolio.apply_buy(&fill, day(1)).unwrap();
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 100);

        let sell = sell_fill("600000.SH", 100, 11.0, 5.0, 1.1, 1);
        assert!(portfolio.apply_sell(&sell).is_ok());
    }

    #[test]
    fn should_complete_single_lot_round_trip_with_expected_cash() {
        let mut portfolio = PortfolioState::new(100000.0, HashSet::new());
        let buy = buy_fill("600000.SH", 100, 10.00, 5.0, 1);
        portfolio.apply_buy(&buy, day(1)).unwrap();
        portfolio.roll_day(day(2));

        let sell = sell_fill("600000.SH", 100, 11.00, 5.0, 1.1, 2);
        portfolio.apply_sell(&sell).unwrap();

        assert!((portfolio.cash() - 96088.9).abs() < 1e-6);
        assert_eq!(portfolio.position("600000.SH").unwrap().quantity_shares, 0);
        assert_eq!(portfolio.position("600000.SH").unwrap().avg_cost, 0.0);
    }

    #[test]
    fn should_reject_sell_exceeding_available_shares() {
        let mut portfolio = PortfolioState::new(100000.0, HashSet::new());
        let sell = sell_fill("600000.SH", 100, 11.0, 5.0, 1.1, 1);
        assert!(portfolio.apply_sell(&sell).is_err());
    }

    #[test]
    fn should_release_later_purchase_after_selling_already_available_shares() {
        let mut portfolio = PortfolioState::new(1_000_000.0, HashSet::new());
        let buy_day1 = buy_fill("600000.SH", 200, 10.00, 5.0, 1);
        portfolio.apply_buy(&buy_day1, day(1)).unwrap();
        portfolio.roll_day(day(2));
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 200);

        let buy_day2 = buy_fill("600000.SH", 100, 10.00, 5.0, 2);
        portfolio.apply_buy(&buy_day2, day(2)).unwrap();
        assert_eq!(portfolio.position("600000.SH").unwrap().quantity_shares, 300);
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 200);

        let sell = sell_fill("600000.SH", 200, 11.0, 5.0, 2.2, 2);
        portfolio.apply_sell(&sell).unwrap();
        assert_eq!(portfolio.position("600000.SH").unwrap().quantity_shares, 100);
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 0);
        portfolio.check_invariants().unwrap();

        portfolio.roll_day(day(3));
        assert_eq!(portfolio.position("600000.SH").unwrap().available_shares, 100);
        portfolio.check_invariants().unwrap();
    }

    #[test]
    fn should_pass_invariant_check_after_round_trip() {
        let mut portfolio = PortfolioState::new(100000.0, HashSet::new());
        let buy = buy_fill("600000.SH", 100, 10.00, 5.0, 1);
        portfolio.apply_buy(&buy, day(1)).unwrap();
        portfolio.roll_day(day(2));
        let sell = sell_fill("600000.SH", 100, 11.00, 5.0, 1.1, 2);
        portfolio.apply_sell(&sell).unwrap();

        assert!(portfolio.check_invariants().is_ok());
    }
}
