//! # Tickforge
//!
//! An in-memory limit-order-book matching engine simulator with
//! price-time priority.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one engine thread owns the book and pool
//!   exclusively; readers consume snapshots and atomics
//! - **O(1) Hot Path**: pool allocation, level FIFO ops and cancels are
//!   constant time; matching walks levels best-first
//! - **No Heap Churn**: orders live in a fixed-capacity pool allocated at
//!   startup
//! - **Bounded Queues Everywhere**: the event queue blocks, the log ring
//!   drops and counts
//!
//! ## Architecture
//!
//! ```text
//! [Producer Thread] --> [SPSC Semaphore Queue] --> [Engine Thread]
//!                                                    |  risk gate
//!                                                    |  order book
//!                                                    v
//!                                        [Accounts] [Stats] [Async Log]
//! ```

pub mod accounts;
pub mod engine;
pub mod event;
pub mod logger;
pub mod order_book;
pub mod pinning;
pub mod pool;
pub mod price_level;
pub mod replay;
pub mod risk;
pub mod spsc;
pub mod stats;
pub mod time;
pub mod trader;
pub mod types;

// Re-exports for convenience
pub use accounts::{Account, Accounts};
pub use engine::{EngineConfig, MatchingEngine};
pub use event::{OrderEvent, OrderResponse, Trade};
pub use logger::{AsyncLogger, LogHandle};
pub use order_book::{BookSnapshot, OrderBook};
pub use pool::{Order, OrderPool};
pub use price_level::PriceLevel;
pub use risk::{RiskConfig, RiskGate, RiskResult};
pub use stats::{EngineStats, LatencyHistogram, LatencyStats, StatsSnapshot};
pub use trader::{Trader, TraderConfig};
pub use types::{
    OrderId, OrderResult, OrderType, PoolIndex, Price, Qty, Side, TraderId,
    INVALID_POOL_INDEX,
};
