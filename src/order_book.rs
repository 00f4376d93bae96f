//! The central limit order book: sorted level arrays, order-id index,
//! and the price-time-priority matching loop.
//!
//! Levels live in two dense sorted vectors (bids descending, asks
//! ascending) rather than a tree, so the best level is always index 0 and
//! a multi-level sweep is a linear walk. Orders live in the fixed
//! [`OrderPool`]; levels and the order-id index store handles only.
//!
//! Single-writer: the engine thread is the unique mutator. Out-of-thread
//! observers consume [`BookSnapshot`] values instead of touching the live
//! book.

use rustc_hash::FxHashMap;

use crate::event::{OrderResponse, Trade};
use crate::pool::{Order, OrderPool};
use crate::price_level::PriceLevel;
use crate::types::{
    OrderId, OrderResult, PoolIndex, Price, Qty, Side, TraderId, DEFAULT_MAX_ORDERS,
    DEFAULT_MAX_PRICE_LEVELS,
};

/// Observer hook invoked synchronously for each trade, from inside the
/// matching loop, before the maker's slot is freed.
pub type TradeCallback = Box<dyn FnMut(&Trade) + Send>;

/// Compact, immutable view of the book for out-of-thread readers.
#[derive(Clone, Debug, Default)]
pub struct BookSnapshot {
    /// (price, total_qty, order_count) best-first.
    pub bids: Vec<(Price, Qty, u32)>,
    pub asks: Vec<(Price, Qty, u32)>,
}

/// Cache-aware limit order book with price-time priority.
pub struct OrderBook {
    pool: OrderPool,
    /// order_id -> pool index; contains exactly the live (linked) orders.
    order_map: FxHashMap<OrderId, PoolIndex>,
    /// Descending by price; no empty levels.
    bids: Vec<PriceLevel>,
    /// Ascending by price; no empty levels.
    asks: Vec<PriceLevel>,
    trade_callback: Option<TradeCallback>,
    total_trades: u64,
    total_volume: u64,
}

impl OrderBook {
    /// Book with default pool and level capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ORDERS, DEFAULT_MAX_PRICE_LEVELS)
    }

    /// Book with reserved capacity: `max_orders` pool slots and
    /// `max_levels` reserved level slots per side.
    pub fn with_capacity(max_orders: u32, max_levels: usize) -> Self {
        Self {
            pool: OrderPool::new(max_orders),
            order_map: FxHashMap::with_capacity_and_hasher(max_orders as usize, Default::default()),
            bids: Vec::with_capacity(max_levels),
            asks: Vec::with_capacity(max_levels),
            trade_callback: None,
            total_trades: 0,
            total_volume: 0,
        }
    }

    /// Install the trade observer.
    pub fn set_trade_callback(&mut self, callback: TradeCallback) {
        self.trade_callback = Some(callback);
    }

    // ========================================================================
    // Order Operations
    // ========================================================================

    /// Add a new limit order: match against the opposite side, then rest
    /// any remainder.
    ///
    /// Duplicate order ids are rejected before matching. Pool exhaustion
    /// when resting the remainder is rejected after matching; committed
    /// trades stand.
    pub fn add_limit(
        &mut self,
        order_id: OrderId,
        trader_id: TraderId,
        side: Side,
        price: Price,
        qty: Qty,
    ) -> OrderResponse {
        let mut response = OrderResponse::new(order_id);

        if self.order_map.contains_key(&order_id) {
            response.result = OrderResult::Rejected;
            return response;
        }

        let (remaining, trades) =
            self.match_order(order_id, trader_id, side, price, qty, false);
        response.trade_count = trades;
        response.qty_filled = qty - remaining;
        response.qty_remaining = remaining;

        if remaining.get() <= 0 {
            response.result = OrderResult::FullyFilled;
            return response;
        }

        // Rest the remainder.
        let pool_idx = self
            .pool
            .allocate(Order::new(order_id, trader_id, side, price, remaining));
        if !pool_idx.is_valid() {
            response.result = OrderResult::Rejected;
            return response;
        }

        self.order_map.insert(order_id, pool_idx);

        let is_bid = side == Side::Buy;
        let levels = if is_bid { &mut self.bids } else { &mut self.asks };
        let pos = Self::find_or_create_level(levels, price, is_bid);
        levels[pos].push_back(&mut self.pool, pool_idx);

        response.result = if trades > 0 {
            OrderResult::PartiallyFilled
        } else {
            OrderResult::Accepted
        };
        response
    }

    /// Add a market order. Matches immediately and never rests; if the
    /// opposite side empties first the unfilled remainder is dropped.
    pub fn add_market(
        &mut self,
        order_id: OrderId,
        trader_id: TraderId,
        side: Side,
        qty: Qty,
    ) -> OrderResponse {
        let mut response = OrderResponse::new(order_id);

        let (remaining, trades) =
            self.match_order(order_id, trader_id, side, Price(0), qty, true);
        response.trade_count = trades;
        response.qty_filled = qty - remaining;
        response.qty_remaining = remaining;
        response.result = if remaining.get() <= 0 {
            OrderResult::FullyFilled
        } else {
            OrderResult::PartiallyFilled
        };

        response
    }

    /// Cancel a resting order.
    pub fn cancel(&mut self, order_id: OrderId) -> OrderResponse {
        let mut response = OrderResponse::new(order_id);

        let Some(&pool_idx) = self.order_map.get(&order_id) else {
            response.result = OrderResult::NotFound;
            return response;
        };

        response.qty_remaining = self.pool.get(pool_idx).qty_remaining;

        self.unlink_order(pool_idx);
        self.order_map.remove(&order_id);

        response.result = OrderResult::Cancelled;
        response
    }

    /// Modify a resting order.
    ///
    /// `new_price = Price(0)` means "price unchanged". A pure quantity
    /// reduction is applied in place and preserves time priority; a price
    /// change or a quantity increase is cancel + re-add and loses priority
    /// (and may match on re-entry).
    pub fn modify(&mut self, order_id: OrderId, new_qty: Qty, new_price: Price) -> OrderResponse {
        let mut response = OrderResponse::new(order_id);

        let Some(&pool_idx) = self.order_map.get(&order_id) else {
            response.result = OrderResult::NotFound;
            return response;
        };

        let order = *self.pool.get(pool_idx);

        // Price change: cancel + new at the new price.
        if new_price.get() != 0 && new_price != order.price {
            self.unlink_order(pool_idx);
            self.order_map.remove(&order_id);
            return self.add_limit(order_id, order.trader_id, order.side, new_price, new_qty);
        }

        if new_qty < order.qty_remaining {
            // Pure reduction keeps the order at its list position.
            let is_bid = order.side == Side::Buy;
            let levels = if is_bid { &mut self.bids } else { &mut self.asks };
            if let Some(pos) = Self::find_level(levels, order.price, is_bid) {
                levels[pos].reduce_qty(order.qty_remaining - new_qty);
            }

            self.pool.get_mut(pool_idx).qty_remaining = new_qty;
            response.qty_remaining = new_qty;
            response.result = OrderResult::Modified;
            response
        } else {
            // Size increase (or no-op size): re-queue at the tail.
            self.unlink_order(pool_idx);
            self.order_map.remove(&order_id);
            self.add_limit(order_id, order.trader_id, order.side, order.price, new_qty)
        }
    }

    // ========================================================================
    // Matching Core
    // ========================================================================

    /// Walk the opposite side best-first and fill against resting makers.
    ///
    /// Returns `(remaining, trade_count)`. Emits the trade callback for
    /// every fill while the maker is still valid in the pool.
    fn match_order(
        &mut self,
        taker_order_id: OrderId,
        taker_trader_id: TraderId,
        side: Side,
        price: Price,
        qty: Qty,
        is_market: bool,
    ) -> (Qty, usize) {
        let mut remaining = qty;
        let mut trades = 0usize;

        let levels = match side {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        };

        let mut i = 0;
        while i < levels.len() && remaining.get() > 0 {
            let level_price = levels[i].price;

            // Limit crossing check: stop at the first non-crossing level.
            if !is_market {
                if side == Side::Buy && level_price > price {
                    break;
                }
                if side == Side::Sell && level_price < price {
                    break;
                }
            }

            while remaining.get() > 0 && !levels[i].is_empty() {
                let maker_idx = levels[i].front();
                let maker = self.pool.get(maker_idx);
                let fill = remaining.min(maker.qty_remaining);

                let trade = Trade::new(
                    maker.order_id,
                    taker_order_id,
                    maker.trader_id,
                    taker_trader_id,
                    maker.price,
                    fill,
                    side,
                );
                let maker_order_id = maker.order_id;

                self.pool.get_mut(maker_idx).qty_remaining -= fill;
                levels[i].reduce_qty(fill);
                remaining -= fill;

                // Observer sees the maker before its slot can be freed.
                if let Some(cb) = self.trade_callback.as_mut() {
                    cb(&trade);
                }
                trades += 1;
                self.total_trades += 1;
                self.total_volume += fill.get() as u64;

                if self.pool.get(maker_idx).is_filled() {
                    levels[i].remove(&mut self.pool, maker_idx);
                    self.order_map.remove(&maker_order_id);
                    self.pool.deallocate(maker_idx);
                }
            }

            if levels[i].is_empty() {
                levels.remove(i);
            } else {
                i += 1;
            }
        }

        (remaining, trades)
    }

    /// Lower-bound search in the sorted level array; inserts a fresh empty
    /// level when the price is absent. Returns the level's position.
    fn find_or_create_level(levels: &mut Vec<PriceLevel>, price: Price, is_bid: bool) -> usize {
        let pos = levels.partition_point(|level| {
            if is_bid {
                level.price > price
            } else {
                level.price < price
            }
        });

        if pos < levels.len() && levels[pos].price == price {
            return pos;
        }

        levels.insert(pos, PriceLevel::new(price));
        pos
    }

    /// Lower-bound search without insertion.
    fn find_level(levels: &[PriceLevel], price: Price, is_bid: bool) -> Option<usize> {
        let pos = levels.partition_point(|level| {
            if is_bid {
                level.price > price
            } else {
                level.price < price
            }
        });

        (pos < levels.len() && levels[pos].price == price).then_some(pos)
    }

    /// Unlink an order from its level, erase the level if it emptied, and
    /// free the slot.
    fn unlink_order(&mut self, pool_idx: PoolIndex) {
        let order = *self.pool.get(pool_idx);
        let is_bid = order.side == Side::Buy;
        let levels = if is_bid { &mut self.bids } else { &mut self.asks };

        if let Some(pos) = Self::find_level(levels, order.price, is_bid) {
            levels[pos].remove(&mut self.pool, pool_idx);
            if levels[pos].is_empty() {
                levels.remove(pos);
            }
        }

        self.pool.deallocate(pool_idx);
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Highest resting bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    /// Lowest resting ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// Midpoint of best bid and ask.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.get() as f64 + ask.get() as f64) / 2.0),
            _ => None,
        }
    }

    /// `best_ask - best_bid`, when both sides exist.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.get() - bid.get()),
            _ => None,
        }
    }

    /// Total quantity resting at the best bid.
    pub fn best_bid_qty(&self) -> Qty {
        self.bids.first().map_or(Qty(0), |level| level.total_qty)
    }

    /// Total quantity resting at the best ask.
    pub fn best_ask_qty(&self) -> Qty {
        self.asks.first().map_or(Qty(0), |level| level.total_qty)
    }

    /// Number of live resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_map.len()
    }

    #[inline]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    #[inline]
    pub fn trade_count(&self) -> u64 {
        self.total_trades
    }

    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    #[inline]
    pub fn has_order(&self, order_id: OrderId) -> bool {
        self.order_map.contains_key(&order_id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// Pool slots currently allocated (equals `order_count`).
    #[inline]
    pub fn pool_live(&self) -> u32 {
        self.pool.live()
    }

    /// Remove every order and reset the trade counters.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.order_map.clear();
        self.bids.clear();
        self.asks.clear();
        self.total_trades = 0;
        self.total_volume = 0;
    }

    /// Pre-fault the pool pages.
    pub fn warm_up(&mut self) {
        self.pool.warm_up();
    }

    /// Copy the top `depth` levels per side for out-of-thread readers.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let take = |levels: &[PriceLevel]| {
            levels
                .iter()
                .take(depth)
                .map(|l| (l.price, l.total_qty, l.order_count))
                .collect()
        };
        BookSnapshot {
            bids: take(&self.bids),
            asks: take(&self.asks),
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.order_map.len())
            .finish()
    }
}
