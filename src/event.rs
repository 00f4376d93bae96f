//! Queue events and engine outputs.
//!
//! [`OrderEvent`] is the element type of the SPSC queue; it is a plain
//! `Copy` record so queue transfer is a memcpy. [`Trade`] is the output of
//! the matching loop and [`OrderResponse`] the per-operation result.

use crate::time::now_ns;
use crate::types::{
    OrderId, OrderResult, OrderType, Price, Qty, Side, INVALID_TRADER_ID, TraderId,
};

/// An order event submitted to the matching engine queue.
///
/// For `Cancel` and `Modify`, `trader_id` and `side` are unused and carry
/// sentinels. For `Modify`, `qty` is the new quantity and `price` the new
/// price, where `Price(0)` means "price unchanged".
#[derive(Clone, Copy, Debug)]
pub struct OrderEvent {
    pub r#type: OrderType,
    pub order_id: OrderId,
    pub trader_id: TraderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    /// Monotonic ns at enqueue, for end-to-end latency measurement.
    pub enqueue_time: u64,
}

impl OrderEvent {
    /// New limit order.
    #[inline]
    pub fn new_limit(id: OrderId, trader: TraderId, side: Side, price: Price, qty: Qty) -> Self {
        Self {
            r#type: OrderType::NewLimit,
            order_id: id,
            trader_id: trader,
            side,
            price,
            qty,
            enqueue_time: now_ns(),
        }
    }

    /// New market order (no price).
    #[inline]
    pub fn new_market(id: OrderId, trader: TraderId, side: Side, qty: Qty) -> Self {
        Self {
            r#type: OrderType::NewMarket,
            order_id: id,
            trader_id: trader,
            side,
            price: Price(0),
            qty,
            enqueue_time: now_ns(),
        }
    }

    /// Cancel an existing order.
    #[inline]
    pub fn cancel(id: OrderId) -> Self {
        Self {
            r#type: OrderType::Cancel,
            order_id: id,
            trader_id: INVALID_TRADER_ID,
            side: Side::Buy,
            price: Price(0),
            qty: Qty(0),
            enqueue_time: now_ns(),
        }
    }

    /// Modify an existing order. `new_price = Price(0)` leaves the price
    /// unchanged.
    #[inline]
    pub fn modify(id: OrderId, new_qty: Qty, new_price: Price) -> Self {
        Self {
            r#type: OrderType::Modify,
            order_id: id,
            trader_id: INVALID_TRADER_ID,
            side: Side::Buy,
            price: new_price,
            qty: new_qty,
            enqueue_time: now_ns(),
        }
    }
}

/// Trade execution report.
///
/// The price is always the maker's resting price, never the taker's limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trade {
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_trader_id: TraderId,
    pub taker_trader_id: TraderId,
    pub price: Price,
    pub qty: Qty,
    pub taker_side: Side,
    pub timestamp: u64,
}

impl Trade {
    pub fn new(
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_trader_id: TraderId,
        taker_trader_id: TraderId,
        price: Price,
        qty: Qty,
        taker_side: Side,
    ) -> Self {
        Self {
            maker_order_id,
            taker_order_id,
            maker_trader_id,
            taker_trader_id,
            price,
            qty,
            taker_side,
            timestamp: now_ns(),
        }
    }
}

/// Result of a single book operation.
#[derive(Clone, Copy, Debug)]
pub struct OrderResponse {
    pub result: OrderResult,
    pub order_id: OrderId,
    pub qty_filled: Qty,
    pub qty_remaining: Qty,
    /// Number of trades this operation generated.
    pub trade_count: usize,
}

impl OrderResponse {
    #[inline]
    pub fn new(order_id: OrderId) -> Self {
        Self {
            result: OrderResult::Rejected,
            order_id,
            qty_filled: Qty(0),
            qty_remaining: Qty(0),
            trade_count: 0,
        }
    }

    /// True unless the operation was rejected or targeted an unknown order.
    #[inline]
    pub fn success(&self) -> bool {
        self.result != OrderResult::Rejected && self.result != OrderResult::NotFound
    }
}
