//! Differential test against a naive reference implementation.
//!
//! The reference book keeps price levels in `BTreeMap`s and orders in
//! `Vec`s; slow but obviously correct. The optimized book must agree with
//! it on best prices, order counts and traded volume at every step.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use tickforge::{OrderBook, OrderId, Price, Qty, Side, TraderId};

/// Naive but correct price-time-priority book.
struct ReferenceBook {
    bids: BTreeMap<i64, Vec<(u64, i64)>>, // price -> [(order_id, qty)]
    asks: BTreeMap<i64, Vec<(u64, i64)>>,
    orders: HashMap<u64, (Side, i64)>,
}

impl ReferenceBook {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    fn place(&mut self, order_id: u64, side: Side, price: i64, mut qty: i64) -> i64 {
        let mut traded = 0i64;

        match side {
            Side::Buy => {
                let prices: Vec<i64> = self.asks.keys().copied().collect();
                for ask_price in prices {
                    if ask_price > price || qty == 0 {
                        break;
                    }
                    let orders = self.asks.get_mut(&ask_price).unwrap();
                    while !orders.is_empty() && qty > 0 {
                        let fill = orders[0].1.min(qty);
                        orders[0].1 -= fill;
                        qty -= fill;
                        traded += fill;
                        if orders[0].1 == 0 {
                            let (maker_id, _) = orders.remove(0);
                            self.orders.remove(&maker_id);
                        }
                    }
                    if orders.is_empty() {
                        self.asks.remove(&ask_price);
                    }
                }
                if qty > 0 {
                    self.bids.entry(price).or_default().push((order_id, qty));
                    self.orders.insert(order_id, (Side::Buy, price));
                }
            }
            Side::Sell => {
                let prices: Vec<i64> = self.bids.keys().rev().copied().collect();
                for bid_price in prices {
                    if bid_price < price || qty == 0 {
                        break;
                    }
                    let orders = self.bids.get_mut(&bid_price).unwrap();
                    while !orders.is_empty() && qty > 0 {
                        let fill = orders[0].1.min(qty);
                        orders[0].1 -= fill;
                        qty -= fill;
                        traded += fill;
                        if orders[0].1 == 0 {
                            let (maker_id, _) = orders.remove(0);
                            self.orders.remove(&maker_id);
                        }
                    }
                    if orders.is_empty() {
                        self.bids.remove(&bid_price);
                    }
                }
                if qty > 0 {
                    self.asks.entry(price).or_default().push((order_id, qty));
                    self.orders.insert(order_id, (Side::Sell, price));
                }
            }
        }

        traded
    }

    fn cancel(&mut self, order_id: u64) -> bool {
        let Some((side, price)) = self.orders.remove(&order_id) else {
            return false;
        };
        let book = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(orders) = book.get_mut(&price) {
            orders.retain(|(id, _)| *id != order_id);
            if orders.is_empty() {
                book.remove(&price);
            }
        }
        true
    }

    fn order_count(&self) -> usize {
        self.orders.len()
    }
}

struct Generated {
    order_id: u64,
    side: Side,
    price: i64,
    qty: i64,
}

fn generate(rng: &mut ChaCha8Rng, order_id: u64) -> Generated {
    Generated {
        order_id,
        side: if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
        price: rng.gen_range(9_800..10_200),
        qty: rng.gen_range(1..200),
    }
}

#[test]
fn test_fuzz_best_prices_match_reference() {
    const SEED: u64 = 0xFEED_FACE;
    const OPS: usize = 10_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut book = OrderBook::with_capacity(100_000, 2048);
    let mut reference = ReferenceBook::new();

    let mut next_order_id = 1u64;
    let mut active: Vec<u64> = Vec::new();

    for i in 0..OPS {
        if active.is_empty() || rng.gen_bool(0.7) {
            let g = generate(&mut rng, next_order_id);
            next_order_id += 1;

            book.add_limit(
                OrderId(g.order_id),
                TraderId(1),
                g.side,
                Price(g.price),
                Qty(g.qty),
            );
            reference.place(g.order_id, g.side, g.price, g.qty);
            active.push(g.order_id);
        } else {
            let idx = rng.gen_range(0..active.len());
            let order_id = active.swap_remove(idx);

            book.cancel(OrderId(order_id));
            reference.cancel(order_id);
        }

        assert_eq!(
            book.best_bid().map(Price::get),
            reference.best_bid(),
            "best bid mismatch at op {i}"
        );
        assert_eq!(
            book.best_ask().map(Price::get),
            reference.best_ask(),
            "best ask mismatch at op {i}"
        );
    }
}

#[test]
fn test_fuzz_order_count_matches_reference() {
    const SEED: u64 = 0xBAD_C0DE;
    const OPS: usize = 5_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut book = OrderBook::with_capacity(100_000, 2048);
    let mut reference = ReferenceBook::new();

    let mut next_order_id = 1u64;
    let mut active: Vec<u64> = Vec::new();

    for i in 0..OPS {
        if active.is_empty() || rng.gen_bool(0.6) {
            let g = generate(&mut rng, next_order_id);
            next_order_id += 1;

            let resp = book.add_limit(
                OrderId(g.order_id),
                TraderId(1),
                g.side,
                Price(g.price),
                Qty(g.qty),
            );
            reference.place(g.order_id, g.side, g.price, g.qty);

            if resp.qty_remaining.get() > 0 {
                active.push(g.order_id);
            }
        } else {
            let idx = rng.gen_range(0..active.len());
            let order_id = active.swap_remove(idx);

            book.cancel(OrderId(order_id));
            reference.cancel(order_id);
        }

        if i % 100 == 0 {
            assert_eq!(
                book.order_count(),
                reference.order_count(),
                "order count mismatch at op {i}"
            );
        }
    }

    assert_eq!(book.order_count(), reference.order_count());
}

#[test]
fn test_fuzz_traded_volume_matches_reference() {
    const SEED: u64 = 0x1234_5678;
    const OPS: usize = 5_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut book = OrderBook::with_capacity(100_000, 2048);
    let mut reference = ReferenceBook::new();

    let engine_traded = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&engine_traded);
    book.set_trade_callback(Box::new(move |t| {
        sink.fetch_add(t.qty.get() as u64, Ordering::Relaxed);
    }));

    let mut reference_traded = 0u64;

    for i in 0..OPS {
        let g = generate(&mut rng, i as u64 + 1);

        book.add_limit(
            OrderId(g.order_id),
            TraderId(1),
            g.side,
            Price(g.price),
            Qty(g.qty),
        );
        reference_traded += reference.place(g.order_id, g.side, g.price, g.qty) as u64;
    }

    assert_eq!(engine_traded.load(Ordering::Relaxed), reference_traded);
    assert_eq!(book.total_volume(), reference_traded);
}
