//! Price level: FIFO queue of pool indices at a single price.
//!
//! The level owns a doubly linked intrusive list threaded through the
//! orders' `prev_idx`/`next_idx` fields. All operations are O(1). The list
//! from head to tail reflects arrival order, which is the time-priority
//! order the matcher consumes.

use crate::pool::OrderPool;
use crate::types::{PoolIndex, Price, Qty, INVALID_POOL_INDEX};

/// One price level of the book.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    pub price: Price,
    /// Sum of `qty_remaining` over linked orders.
    pub total_qty: Qty,
    pub order_count: u32,
    pub head_idx: PoolIndex,
    pub tail_idx: PoolIndex,
}

impl PriceLevel {
    #[inline]
    pub const fn new(price: Price) -> Self {
        Self {
            price,
            total_qty: Qty(0),
            order_count: 0,
            head_idx: INVALID_POOL_INDEX,
            tail_idx: INVALID_POOL_INDEX,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Append an order at the tail (lowest time priority).
    pub fn push_back(&mut self, pool: &mut OrderPool, idx: PoolIndex) {
        let qty = {
            let order = pool.get_mut(idx);
            order.prev_idx = self.tail_idx;
            order.next_idx = INVALID_POOL_INDEX;
            order.qty_remaining
        };

        if self.tail_idx.is_valid() {
            pool.get_mut(self.tail_idx).next_idx = idx;
        } else {
            debug_assert!(!self.head_idx.is_valid());
            self.head_idx = idx;
        }

        self.tail_idx = idx;
        self.total_qty += qty;
        self.order_count += 1;
    }

    /// Unlink an order from anywhere in the queue.
    ///
    /// Handles the endpoint cases (only node, head, tail) by patching the
    /// level's head/tail, and the middle case by patching neighbours. The
    /// slot is NOT freed; the caller owns deallocation.
    pub fn remove(&mut self, pool: &mut OrderPool, idx: PoolIndex) {
        let (prev, next, qty) = {
            let order = pool.get(idx);
            (order.prev_idx, order.next_idx, order.qty_remaining)
        };

        if prev.is_valid() {
            pool.get_mut(prev).next_idx = next;
        } else {
            debug_assert_eq!(self.head_idx, idx);
            self.head_idx = next;
        }

        if next.is_valid() {
            pool.get_mut(next).prev_idx = prev;
        } else {
            debug_assert_eq!(self.tail_idx, idx);
            self.tail_idx = prev;
        }

        self.total_qty -= qty;
        self.order_count -= 1;

        let order = pool.get_mut(idx);
        order.prev_idx = INVALID_POOL_INDEX;
        order.next_idx = INVALID_POOL_INDEX;
    }

    /// Index of the highest-priority order, or the invalid sentinel.
    #[inline]
    pub const fn front(&self) -> PoolIndex {
        self.head_idx
    }

    /// Subtract a partial fill from the aggregate without relinking.
    #[inline]
    pub fn reduce_qty(&mut self, delta: Qty) {
        debug_assert!(self.total_qty >= delta);
        self.total_qty -= delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Order;
    use crate::types::{OrderId, Side, TraderId};

    fn setup(pool: &mut OrderPool, count: u32) -> Vec<PoolIndex> {
        (0..count)
            .map(|i| {
                pool.allocate(Order::new(
                    OrderId(i as u64),
                    TraderId(1),
                    Side::Sell,
                    Price(100),
                    Qty(10),
                ))
            })
            .collect()
    }

    #[test]
    fn test_empty_level() {
        let level = PriceLevel::new(Price(100));
        assert!(level.is_empty());
        assert_eq!(level.total_qty, Qty(0));
        assert_eq!(level.front(), INVALID_POOL_INDEX);
    }

    #[test]
    fn test_push_back_fifo_linkage() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 3);

        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        assert_eq!(level.order_count, 3);
        assert_eq!(level.total_qty, Qty(30));
        assert_eq!(level.head_idx, idx[0]);
        assert_eq!(level.tail_idx, idx[2]);

        assert_eq!(pool.get(idx[0]).next_idx, idx[1]);
        assert_eq!(pool.get(idx[1]).prev_idx, idx[0]);
        assert_eq!(pool.get(idx[1]).next_idx, idx[2]);
        assert_eq!(pool.get(idx[2]).prev_idx, idx[1]);
        assert_eq!(pool.get(idx[2]).next_idx, INVALID_POOL_INDEX);
    }

    #[test]
    fn test_remove_only_node() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 1);

        level.push_back(&mut pool, idx[0]);
        level.remove(&mut pool, idx[0]);

        assert!(level.is_empty());
        assert_eq!(level.head_idx, INVALID_POOL_INDEX);
        assert_eq!(level.tail_idx, INVALID_POOL_INDEX);
        assert_eq!(level.total_qty, Qty(0));
    }

    #[test]
    fn test_remove_head() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        level.remove(&mut pool, idx[0]);

        assert_eq!(level.order_count, 2);
        assert_eq!(level.head_idx, idx[1]);
        assert_eq!(pool.get(idx[1]).prev_idx, INVALID_POOL_INDEX);
    }

    #[test]
    fn test_remove_tail() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        level.remove(&mut pool, idx[2]);

        assert_eq!(level.tail_idx, idx[1]);
        assert_eq!(pool.get(idx[1]).next_idx, INVALID_POOL_INDEX);
    }

    #[test]
    fn test_remove_middle() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        level.remove(&mut pool, idx[1]);

        assert_eq!(level.order_count, 2);
        assert_eq!(pool.get(idx[0]).next_idx, idx[2]);
        assert_eq!(pool.get(idx[2]).prev_idx, idx[0]);
        assert_eq!(level.total_qty, Qty(20));
    }

    #[test]
    fn test_reduce_qty() {
        let mut pool = OrderPool::new(10);
        let mut level = PriceLevel::new(Price(100));
        let idx = setup(&mut pool, 1);
        level.push_back(&mut pool, idx[0]);

        level.reduce_qty(Qty(4));
        assert_eq!(level.total_qty, Qty(6));
        // Aggregate changes; the order stays linked at its position.
        assert_eq!(level.front(), idx[0]);
    }
}
