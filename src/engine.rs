//! Engine loop: the queue consumer.
//!
//! Drains the SPSC queue, gates every event through risk, dispatches to
//! the book, and applies resulting trades to the account table through the
//! book's synchronous trade callback. The engine thread is the unique
//! mutator of the book and pool; accounts and stats expose atomics for
//! concurrent readers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::accounts::Accounts;
use crate::event::{OrderEvent, OrderResponse};
use crate::logger::LogHandle;
use crate::order_book::OrderBook;
use crate::pinning;
use crate::risk::{RiskConfig, RiskGate, RiskResult};
use crate::spsc::Consumer;
use crate::stats::EngineStats;
use crate::time::now_ns;
use crate::types::{OrderResult, OrderType, DEFAULT_MAX_ORDERS, DEFAULT_MAX_PRICE_LEVELS};

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub max_orders: u32,
    pub max_price_levels: usize,
    pub max_traders: usize,
    /// Balance granted to lazily created accounts.
    pub initial_balance: i64,
    pub risk: RiskConfig,
    pub pin_to_core: Option<usize>,
    /// Bounded dequeue timeout; also the worst-case shutdown latency.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_orders: DEFAULT_MAX_ORDERS,
            max_price_levels: DEFAULT_MAX_PRICE_LEVELS,
            max_traders: 1000,
            initial_balance: 1_000_000_000,
            risk: RiskConfig::default(),
            pin_to_core: None,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// The queue consumer. Owns the book; shares accounts and stats with
/// reader threads via `Arc`.
pub struct MatchingEngine {
    book: OrderBook,
    accounts: Arc<Accounts>,
    risk: RiskGate,
    stats: Arc<EngineStats>,
    config: EngineConfig,
    running: AtomicBool,
    events_processed: AtomicU64,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_logger(config, None)
    }

    /// Engine with an optional hot-path log handle; trades are appended to
    /// the log from inside the trade callback.
    pub fn with_logger(config: EngineConfig, logger: Option<LogHandle>) -> Self {
        let accounts = Arc::new(Accounts::new(config.max_traders));
        let stats = Arc::new(EngineStats::new());

        let mut book = OrderBook::with_capacity(config.max_orders, config.max_price_levels);

        // Trade callback: account updates first, then counters, then the
        // optional log line. Runs on the engine thread for every fill.
        let cb_accounts = Arc::clone(&accounts);
        let cb_stats = Arc::clone(&stats);
        book.set_trade_callback(Box::new(move |trade| {
            cb_accounts.apply_trade(
                trade.maker_trader_id,
                trade.taker_trader_id,
                trade.taker_side,
                trade.price,
                trade.qty,
            );
            cb_stats.trade_count.fetch_add(1, Ordering::Relaxed);
            cb_stats
                .volume
                .fetch_add(trade.qty.get() as u64, Ordering::Relaxed);
            if let Some(log) = &logger {
                log.log(format_args!(
                    "trade {} @ {} maker={} taker={}",
                    trade.qty, trade.price, trade.maker_trader_id, trade.taker_trader_id
                ));
            }
        }));

        Self {
            book,
            accounts,
            risk: RiskGate::new(config.risk),
            stats,
            config,
            running: AtomicBool::new(false),
            events_processed: AtomicU64::new(0),
        }
    }

    /// Consume events until `stop` is raised, then drain the queue and
    /// return.
    ///
    /// The bounded-timeout dequeue guarantees the stop signal is observed
    /// within `poll_interval` even on an empty queue.
    pub fn run(&mut self, events: &mut Consumer<OrderEvent>, stop: &AtomicBool) {
        self.running.store(true, Ordering::Release);

        if let Some(core) = self.config.pin_to_core {
            if !pinning::pin_to_core(core) {
                tracing::warn!(core, "failed to pin engine thread");
            }
        }

        while !stop.load(Ordering::Acquire) {
            let Some(event) = events.try_pop_for(self.config.poll_interval) else {
                continue;
            };
            self.process_event(&event);
        }

        // Shutdown drains whatever was already enqueued.
        while let Some(event) = events.try_pop() {
            self.process_event(&event);
        }

        self.running.store(false, Ordering::Release);
    }

    /// Process a single event. Exposed for tests and the replay tool.
    pub fn process_event(&mut self, event: &OrderEvent) {
        let process_start = now_ns();

        self.stats.orders_received.fetch_add(1, Ordering::Relaxed);

        // Accounts are created lazily on the first non-cancel event.
        if event.r#type != OrderType::Cancel {
            self.accounts
                .get_or_create(event.trader_id, self.config.initial_balance);
        }

        let risk_result = self.risk.check(event, &self.accounts);
        if risk_result != RiskResult::Passed {
            self.stats.rejected_count.fetch_add(1, Ordering::Relaxed);
            self.events_processed.fetch_add(1, Ordering::Relaxed);
            self.record_latency(event.enqueue_time, process_start);
            return;
        }

        let response: OrderResponse = match event.r#type {
            OrderType::NewLimit => self.book.add_limit(
                event.order_id,
                event.trader_id,
                event.side,
                event.price,
                event.qty,
            ),
            OrderType::NewMarket => {
                self.book
                    .add_market(event.order_id, event.trader_id, event.side, event.qty)
            }
            OrderType::Cancel => self.book.cancel(event.order_id),
            OrderType::Modify => self.book.modify(event.order_id, event.qty, event.price),
        };

        self.events_processed.fetch_add(1, Ordering::Relaxed);

        match response.result {
            OrderResult::Accepted | OrderResult::PartiallyFilled | OrderResult::FullyFilled => {
                self.stats.orders_accepted.fetch_add(1, Ordering::Relaxed);
            }
            OrderResult::Cancelled => {
                self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            OrderResult::Modified => {
                self.stats.orders_modified.fetch_add(1, Ordering::Relaxed);
            }
            OrderResult::Rejected | OrderResult::NotFound => {
                self.stats.rejected_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        if response.success() && response.qty_filled.get() > 0 {
            self.stats
                .filled_qty
                .fetch_add(response.qty_filled.get() as u64, Ordering::Relaxed);
        }

        self.record_latency(event.enqueue_time, process_start);
    }

    #[inline]
    fn record_latency(&self, enqueue_time: u64, process_start: u64) {
        let now = now_ns();
        self.stats.latency.record(now.saturating_sub(enqueue_time));
        self.stats
            .engine_latency
            .record(now.saturating_sub(process_start));
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    #[inline]
    pub fn book_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }

    #[inline]
    pub fn accounts(&self) -> &Arc<Accounts> {
        &self.accounts
    }

    #[inline]
    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    #[inline]
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Pre-fault the book's pool pages before the hot loop starts.
    pub fn warm_up(&mut self) {
        self.book.warm_up();
    }
}
