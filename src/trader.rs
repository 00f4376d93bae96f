//! Synthetic order generator: the queue producer.
//!
//! Generates a seeded random mix of limit/market/cancel/modify events
//! around a base price. Rate limiting is a leaky bucket: each burst earns
//! a monotonic deadline and the producer sleeps until it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::event::OrderEvent;
use crate::spsc::Producer;
use crate::types::{OrderId, Price, Qty, Side, TraderId};

/// Generator configuration.
#[derive(Clone, Debug)]
pub struct TraderConfig {
    pub trader_id: TraderId,
    pub seed: u64,
    pub orders_to_generate: u64,

    /// Center of the price window.
    pub base_price: Price,
    /// Prices are drawn from `base_price ± price_range`.
    pub price_range: i64,

    pub min_qty: Qty,
    pub max_qty: Qty,

    pub prob_buy: f64,
    /// Probability a new order is a limit (vs. market).
    pub prob_limit: f64,
    pub prob_cancel: f64,
    pub prob_modify: f64,

    /// 0 disables rate limiting.
    pub orders_per_second: u64,
    pub burst_size: u64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            trader_id: TraderId(0),
            seed: 12345,
            orders_to_generate: 1000,
            base_price: Price(10_000),
            price_range: 100,
            min_qty: Qty(1),
            max_qty: Qty(100),
            prob_buy: 0.5,
            prob_limit: 0.95,
            prob_cancel: 0.1,
            prob_modify: 0.05,
            orders_per_second: 0,
            burst_size: 10,
        }
    }
}

/// One synthetic trader identity. Several traders can share a single
/// producer thread (see [`run_traders`]); the queue itself stays strictly
/// single-producer.
pub struct Trader {
    config: TraderConfig,
    rng: ChaCha8Rng,
    sent_order_ids: Vec<OrderId>,
    next_order_id: u64,
    generated: u64,
}

impl Trader {
    /// `starting_order_id` must give each trader a disjoint id range.
    pub fn new(config: TraderConfig, starting_order_id: u64) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let reserve = config.orders_to_generate.min(1 << 20) as usize;
        Self {
            config,
            rng,
            sent_order_ids: Vec::with_capacity(reserve),
            next_order_id: starting_order_id,
            generated: 0,
        }
    }

    #[inline]
    pub fn trader_id(&self) -> TraderId {
        self.config.trader_id
    }

    #[inline]
    pub fn orders_generated(&self) -> u64 {
        self.generated
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.generated >= self.config.orders_to_generate
    }

    /// Generate the next event, or `None` once the quota is reached.
    pub fn next_event(&mut self) -> Option<OrderEvent> {
        if self.is_done() {
            return None;
        }
        self.generated += 1;

        let cfg = &self.config;
        let r: f64 = self.rng.gen();

        let has_sent = !self.sent_order_ids.is_empty();
        let is_cancel = r < cfg.prob_cancel && has_sent;
        let is_modify = !is_cancel && r < cfg.prob_cancel + cfg.prob_modify && has_sent;

        if is_cancel {
            let idx = self.rng.gen_range(0..self.sent_order_ids.len());
            return Some(OrderEvent::cancel(self.sent_order_ids[idx]));
        }

        if is_modify {
            let idx = self.rng.gen_range(0..self.sent_order_ids.len());
            let id = self.sent_order_ids[idx];
            let new_qty = Qty(self.rng.gen_range(cfg.min_qty.get()..=cfg.max_qty.get()));
            let new_price = Price(self.rng.gen_range(
                cfg.base_price.get() - cfg.price_range..=cfg.base_price.get() + cfg.price_range,
            ));
            return Some(OrderEvent::modify(id, new_qty, new_price));
        }

        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.sent_order_ids.push(order_id);

        let side = if self.rng.gen_bool(cfg.prob_buy) {
            Side::Buy
        } else {
            Side::Sell
        };
        let qty = Qty(self.rng.gen_range(cfg.min_qty.get()..=cfg.max_qty.get()));

        if self.rng.gen_bool(cfg.prob_limit) {
            let price = Price(self.rng.gen_range(
                cfg.base_price.get() - cfg.price_range..=cfg.base_price.get() + cfg.price_range,
            ));
            Some(OrderEvent::new_limit(order_id, cfg.trader_id, side, price, qty))
        } else {
            Some(OrderEvent::new_market(order_id, cfg.trader_id, side, qty))
        }
    }
}

/// Leaky-bucket pacing: after each burst, sleep until the burst's
/// monotonic deadline.
struct BurstLimiter {
    ns_per_order: u64,
    burst_size: u64,
    burst_count: u64,
    deadline: Instant,
}

impl BurstLimiter {
    fn new(orders_per_second: u64, burst_size: u64) -> Option<Self> {
        if orders_per_second == 0 {
            return None;
        }
        let ns_per_order = 1_000_000_000 / orders_per_second;
        Some(Self {
            ns_per_order,
            burst_size: burst_size.max(1),
            burst_count: 0,
            deadline: Instant::now(),
        })
    }

    fn on_send(&mut self) {
        self.burst_count += 1;
        if self.burst_count >= self.burst_size {
            self.deadline += Duration::from_nanos(self.ns_per_order * self.burst_size);
            let now = Instant::now();
            if self.deadline > now {
                std::thread::sleep(self.deadline - now);
            } else {
                // Fell behind; restart the bucket from now.
                self.deadline = now;
            }
            self.burst_count = 0;
        }
    }
}

/// Drive a set of traders round-robin over one producer handle.
///
/// Returns the number of events pushed. The producer observes `stop`
/// between enqueues; an in-flight blocking push on a full queue is only
/// unblocked by the consumer, so stop the producer before the engine.
pub fn run_traders(
    mut traders: Vec<Trader>,
    events: &mut Producer<OrderEvent>,
    stop: &AtomicBool,
) -> u64 {
    let mut limiter = traders
        .first()
        .and_then(|t| BurstLimiter::new(t.config.orders_per_second, t.config.burst_size));

    let mut sent = 0u64;
    let mut any_active = true;

    while any_active && !stop.load(Ordering::Acquire) {
        any_active = false;
        for trader in traders.iter_mut() {
            if stop.load(Ordering::Acquire) {
                break;
            }
            let Some(event) = trader.next_event() else {
                continue;
            };
            any_active = true;

            events.push(event);
            sent += 1;

            if let Some(limiter) = limiter.as_mut() {
                limiter.on_send();
            }
        }
    }

    sent
}
