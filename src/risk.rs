//! Pre-trade risk gate.
//!
//! A pure check over the incoming event: price band, quantity cap,
//! notional cap, and (optionally) a balance check for buys. Failures are
//! values, never panics; rejected orders never reach the book.

use std::fmt;

use crate::accounts::Accounts;
use crate::event::OrderEvent;
use crate::types::{OrderType, Price, Qty, Side};

/// Risk limits.
#[derive(Clone, Copy, Debug)]
pub struct RiskConfig {
    /// Max notional (price * qty) per order.
    pub max_order_value: i64,
    /// Max position size (reserved; position gating is not enforced yet).
    pub max_position: i64,
    /// Max quantity per order.
    pub max_order_qty: Qty,
    pub max_price: Price,
    pub min_price: Price,
    /// Require sufficient balance for the notional of a buy.
    pub check_balance: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_order_value: 1_000_000_000,
            max_position: 1_000_000,
            max_order_qty: Qty(100_000),
            max_price: Price(1_000_000),
            min_price: Price(1),
            check_balance: true,
        }
    }
}

/// Outcome of a risk check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RiskResult {
    Passed = 0,
    InvalidPrice = 1,
    InvalidQty = 2,
    ExceedsMaxOrderValue = 3,
    ExceedsMaxPosition = 4,
    InsufficientBalance = 5,
    UnknownTrader = 6,
}

impl RiskResult {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            RiskResult::Passed => "Passed",
            RiskResult::InvalidPrice => "InvalidPrice",
            RiskResult::InvalidQty => "InvalidQty",
            RiskResult::ExceedsMaxOrderValue => "ExceedsMaxOrderValue",
            RiskResult::ExceedsMaxPosition => "ExceedsMaxPosition",
            RiskResult::InsufficientBalance => "InsufficientBalance",
            RiskResult::UnknownTrader => "UnknownTrader",
        }
    }
}

impl fmt::Display for RiskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless validator applied to every event before dispatch.
#[derive(Clone, Copy, Debug, Default)]
pub struct RiskGate {
    config: RiskConfig,
}

impl RiskGate {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Validate an event. Cancels always pass.
    pub fn check(&self, event: &OrderEvent, accounts: &Accounts) -> RiskResult {
        if event.r#type == OrderType::Cancel {
            return RiskResult::Passed;
        }

        // Price band. Market orders carry no price; a Modify with the
        // Price(0) sentinel leaves the price unchanged, so neither is
        // banded here.
        let price_banded = match event.r#type {
            OrderType::NewLimit => true,
            OrderType::Modify => event.price.get() != 0,
            _ => false,
        };
        if price_banded
            && (event.price < self.config.min_price || event.price > self.config.max_price)
        {
            return RiskResult::InvalidPrice;
        }

        if event.qty.get() <= 0 || event.qty > self.config.max_order_qty {
            return RiskResult::InvalidQty;
        }

        let notional = event.price.get() * event.qty.get();
        if notional > self.config.max_order_value {
            return RiskResult::ExceedsMaxOrderValue;
        }

        // Balance gate applies to new buy orders only; cancel/modify carry
        // no meaningful side.
        if self.config.check_balance
            && event.side == Side::Buy
            && matches!(event.r#type, OrderType::NewLimit | OrderType::NewMarket)
            && !accounts.has_sufficient_balance(event.trader_id, notional)
        {
            return RiskResult::InsufficientBalance;
        }

        RiskResult::Passed
    }
}
