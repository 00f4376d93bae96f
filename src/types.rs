//! Core value types: strongly-typed price, quantity and identifier wrappers.
//!
//! Each wrapper is a distinct nominal type so that a `Price` can never be
//! added to a `Qty` by accident. All wrappers are `Copy` and totally ordered.

use std::fmt;

/// Price in integer ticks (e.g. cents or basis points).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub i64);

/// Quantity in units (shares, contracts, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qty(pub i64);

/// Unique order identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u64);

/// Trader/account identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraderId(pub u32);

/// Index of a slot in the order pool ("compressed pointer").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolIndex(pub u32);

/// Sentinel marking end-of-list and unused slots.
pub const INVALID_POOL_INDEX: PoolIndex = PoolIndex(u32::MAX);

/// Sentinel order id for vacant pool slots.
pub const INVALID_ORDER_ID: OrderId = OrderId(u64::MAX);

/// Sentinel trader id for events that carry none (cancel/modify).
pub const INVALID_TRADER_ID: TraderId = TraderId(u32::MAX);

impl Price {
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Qty {
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Smaller of two quantities (fill size computation).
    #[inline]
    pub fn min(self, other: Qty) -> Qty {
        Qty(self.0.min(other.0))
    }
}

impl OrderId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl TraderId {
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl PoolIndex {
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl std::ops::Add for Price {
    type Output = Price;
    #[inline]
    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Price {
    type Output = Price;
    #[inline]
    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl std::ops::Add for Qty {
    type Output = Qty;
    #[inline]
    fn add(self, rhs: Qty) -> Qty {
        Qty(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Qty {
    type Output = Qty;
    #[inline]
    fn sub(self, rhs: Qty) -> Qty {
        Qty(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Qty {
    #[inline]
    fn add_assign(&mut self, rhs: Qty) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Qty {
    #[inline]
    fn sub_assign(&mut self, rhs: Qty) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Side / OrderType
// ============================================================================

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type carried on the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderType {
    NewLimit = 0,
    NewMarket = 1,
    Cancel = 2,
    Modify = 3,
}

impl OrderType {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderType::NewLimit => "NewLimit",
            OrderType::NewMarket => "NewMarket",
            OrderType::Cancel => "Cancel",
            OrderType::Modify => "Modify",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Result Codes
// ============================================================================

/// Outcome of a book operation, reported through [`crate::event::OrderResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderResult {
    /// Nothing matched and the remainder rested.
    Accepted = 0,
    /// Some quantity matched; for limits the rest rested.
    PartiallyFilled = 1,
    /// The full quantity matched.
    FullyFilled = 2,
    /// Successful cancel.
    Cancelled = 3,
    /// In-place quantity reduction.
    Modified = 4,
    /// Duplicate order id or pool exhaustion.
    Rejected = 5,
    /// Cancel/modify of an unknown order id.
    NotFound = 6,
}

impl OrderResult {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderResult::Accepted => "Accepted",
            OrderResult::PartiallyFilled => "PartiallyFilled",
            OrderResult::FullyFilled => "FullyFilled",
            OrderResult::Cancelled => "Cancelled",
            OrderResult::Modified => "Modified",
            OrderResult::Rejected => "Rejected",
            OrderResult::NotFound => "NotFound",
        }
    }
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Defaults
// ============================================================================

/// Default maximum resting orders in the pool.
pub const DEFAULT_MAX_ORDERS: u32 = 1_000_000;

/// Default reserved price levels per side.
pub const DEFAULT_MAX_PRICE_LEVELS: usize = 1024;

/// Default event queue capacity (power of two).
pub const DEFAULT_QUEUE_CAPACITY: usize = 65536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_pool_index_sentinel() {
        assert!(!INVALID_POOL_INDEX.is_valid());
        assert!(PoolIndex(0).is_valid());
        assert!(PoolIndex(u32::MAX - 1).is_valid());
    }

    #[test]
    fn test_qty_arithmetic() {
        let mut q = Qty(10);
        q -= Qty(3);
        assert_eq!(q, Qty(7));
        q += Qty(5);
        assert_eq!(q, Qty(12));
        assert_eq!(Qty(4).min(Qty(9)), Qty(4));
    }

    #[test]
    fn test_price_ordering() {
        assert!(Price(100) < Price(101));
        assert_eq!(Price(101) - Price(100), Price(1));
    }

    #[test]
    fn test_result_strings() {
        assert_eq!(OrderResult::Accepted.as_str(), "Accepted");
        assert_eq!(OrderResult::NotFound.as_str(), "NotFound");
        assert_eq!(OrderType::NewMarket.as_str(), "NewMarket");
    }
}
