use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// How an order's `qty_value` should be interpreted when converted to a lot-rounded share
/// count.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum QuantityType {
    /// `qty_value` is already a share count.
    Count,
    /// `qty_value` is a cash amount to spend (buy) or raise (sell).
    Cash,
    /// `qty_value` is a target portfolio weight in `[0, 1]`.
    Weight,
}

/// An order queued by [`crate::context::OrderHelper`] during a strategy callback, awaiting the
/// [`crate::execution::engine::ExecutionEngine`]'s end-of-bar drain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub qty_type: QuantityType,
    pub qty_value: f64,
    /// Monotonically increasing intra-bar counter, used to break ties within a side after the
    /// sell-then-buy stable sort.
    pub enqueue_seq: u64,
}
