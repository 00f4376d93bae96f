//! Striped-lock account table with atomic balance/position fields.
//!
//! Accounts are created lazily on a trader's first order and live until an
//! explicit reset. Creation is serialised per stripe (`trader_id mod S`);
//! field updates are plain atomics, so concurrent readers observe
//! eventually-consistent totals without taking any lock.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::types::{Price, Qty, Side, TraderId};

/// Per-trader account state. All fields are atomics; a trade touches the
/// maker/taker pair without any cross-account transaction.
#[derive(Debug)]
pub struct Account {
    pub trader_id: TraderId,
    balance: AtomicI64,
    /// Net position, positive = long.
    position: AtomicI64,
    trade_count: AtomicU64,
    volume: AtomicU64,
}

impl Account {
    fn new(trader_id: TraderId, initial_balance: i64) -> Self {
        Self {
            trader_id,
            balance: AtomicI64::new(initial_balance),
            position: AtomicI64::new(0),
            trade_count: AtomicU64::new(0),
            volume: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn balance(&self) -> i64 {
        self.balance.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn trade_count(&self) -> u64 {
        self.trade_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn volume(&self) -> u64 {
        self.volume.load(Ordering::Relaxed)
    }
}

/// Account table: a growable vector of accounts plus a stripe of
/// independent creation locks.
pub struct Accounts {
    accounts: RwLock<Vec<Arc<Account>>>,
    stripes: Vec<Mutex<()>>,
    max_traders: usize,
}

impl Accounts {
    /// Default number of stripe locks (power of two).
    pub const DEFAULT_STRIPE_COUNT: usize = 16;

    pub fn new(max_traders: usize) -> Self {
        Self::with_stripes(max_traders, Self::DEFAULT_STRIPE_COUNT)
    }

    pub fn with_stripes(max_traders: usize, stripe_count: usize) -> Self {
        assert!(stripe_count.is_power_of_two(), "stripe count must be a power of two");
        Self {
            accounts: RwLock::new(Vec::with_capacity(max_traders)),
            stripes: (0..stripe_count).map(|_| Mutex::new(())).collect(),
            max_traders,
        }
    }

    #[inline]
    fn stripe(&self, trader_id: TraderId) -> &Mutex<()> {
        &self.stripes[trader_id.get() as usize & (self.stripes.len() - 1)]
    }

    /// Look up an existing account.
    pub fn get(&self, trader_id: TraderId) -> Option<Arc<Account>> {
        self.accounts
            .read()
            .iter()
            .find(|acc| acc.trader_id == trader_id)
            .cloned()
    }

    /// Look up an account, creating it with `initial_balance` if absent.
    ///
    /// Scans first without the stripe lock, then locks the trader's stripe,
    /// rechecks and appends. Returns `None` only at the trader cap.
    pub fn get_or_create(&self, trader_id: TraderId, initial_balance: i64) -> Option<Arc<Account>> {
        if let Some(acc) = self.get(trader_id) {
            return Some(acc);
        }

        let _guard = self.stripe(trader_id).lock();

        // Recheck under the stripe lock: another creator may have won.
        if let Some(acc) = self.get(trader_id) {
            return Some(acc);
        }

        let mut accounts = self.accounts.write();
        if accounts.len() >= self.max_traders {
            return None;
        }

        let acc = Arc::new(Account::new(trader_id, initial_balance));
        accounts.push(Arc::clone(&acc));
        Some(acc)
    }

    /// Apply a trade atomically to the maker/taker pair.
    ///
    /// The taker side determines the signs: a buying taker pays the
    /// notional and goes long; the maker mirrors both deltas, so position
    /// and balance deltas sum to zero across the pair.
    pub fn apply_trade(
        &self,
        maker_id: TraderId,
        taker_id: TraderId,
        taker_side: Side,
        price: Price,
        qty: Qty,
    ) {
        let (Some(maker), Some(taker)) = (self.get(maker_id), self.get(taker_id)) else {
            return;
        };

        let notional = price.get() * qty.get();
        let qty_val = qty.get();

        match taker_side {
            Side::Buy => {
                taker.balance.fetch_sub(notional, Ordering::Relaxed);
                taker.position.fetch_add(qty_val, Ordering::Relaxed);
                maker.balance.fetch_add(notional, Ordering::Relaxed);
                maker.position.fetch_sub(qty_val, Ordering::Relaxed);
            }
            Side::Sell => {
                taker.balance.fetch_add(notional, Ordering::Relaxed);
                taker.position.fetch_sub(qty_val, Ordering::Relaxed);
                maker.balance.fetch_sub(notional, Ordering::Relaxed);
                maker.position.fetch_add(qty_val, Ordering::Relaxed);
            }
        }

        maker.trade_count.fetch_add(1, Ordering::Relaxed);
        maker.volume.fetch_add(qty_val as u64, Ordering::Relaxed);
        taker.trade_count.fetch_add(1, Ordering::Relaxed);
        taker.volume.fetch_add(qty_val as u64, Ordering::Relaxed);
    }

    /// Deposit or withdraw. Returns false for an unknown trader.
    pub fn adjust_balance(&self, trader_id: TraderId, amount: i64) -> bool {
        match self.get(trader_id) {
            Some(acc) => {
                acc.balance.fetch_add(amount, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// True if the trader exists and holds at least `required`.
    pub fn has_sufficient_balance(&self, trader_id: TraderId, required: i64) -> bool {
        self.get(trader_id)
            .map_or(false, |acc| acc.balance() >= required)
    }

    pub fn balance_of(&self, trader_id: TraderId) -> i64 {
        self.get(trader_id).map_or(0, |acc| acc.balance())
    }

    pub fn position_of(&self, trader_id: TraderId) -> i64 {
        self.get(trader_id).map_or(0, |acc| acc.position())
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every account. Takes all stripe locks in index order so no
    /// creation can interleave with the wipe.
    pub fn clear(&self) {
        let _guards: Vec<_> = self.stripes.iter().map(|m| m.lock()).collect();
        self.accounts.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let accounts = Accounts::new(100);
        assert!(accounts.get(TraderId(1)).is_none());

        let acc = accounts.get_or_create(TraderId(1), 1_000).unwrap();
        assert_eq!(acc.trader_id, TraderId(1));
        assert_eq!(acc.balance(), 1_000);
        assert_eq!(accounts.len(), 1);

        // Second call returns the same account, balance untouched.
        let again = accounts.get_or_create(TraderId(1), 9_999).unwrap();
        assert_eq!(again.balance(), 1_000);
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_trader_cap() {
        let accounts = Accounts::new(2);
        assert!(accounts.get_or_create(TraderId(1), 0).is_some());
        assert!(accounts.get_or_create(TraderId(2), 0).is_some());
        assert!(accounts.get_or_create(TraderId(3), 0).is_none());
    }

    #[test]
    fn test_apply_trade_taker_buys() {
        let accounts = Accounts::new(10);
        accounts.get_or_create(TraderId(0), 10_000).unwrap();
        accounts.get_or_create(TraderId(1), 10_000).unwrap();

        // Maker 0 sold to taker 1: 10 @ 100.
        accounts.apply_trade(TraderId(0), TraderId(1), Side::Buy, Price(100), Qty(10));

        assert_eq!(accounts.balance_of(TraderId(1)), 10_000 - 1_000);
        assert_eq!(accounts.position_of(TraderId(1)), 10);
        assert_eq!(accounts.balance_of(TraderId(0)), 10_000 + 1_000);
        assert_eq!(accounts.position_of(TraderId(0)), -10);

        let maker = accounts.get(TraderId(0)).unwrap();
        assert_eq!(maker.trade_count(), 1);
        assert_eq!(maker.volume(), 10);
    }

    #[test]
    fn test_apply_trade_taker_sells() {
        let accounts = Accounts::new(10);
        accounts.get_or_create(TraderId(0), 0).unwrap();
        accounts.get_or_create(TraderId(1), 0).unwrap();

        accounts.apply_trade(TraderId(0), TraderId(1), Side::Sell, Price(50), Qty(4));

        assert_eq!(accounts.balance_of(TraderId(1)), 200);
        assert_eq!(accounts.position_of(TraderId(1)), -4);
        assert_eq!(accounts.balance_of(TraderId(0)), -200);
        assert_eq!(accounts.position_of(TraderId(0)), 4);
    }

    #[test]
    fn test_conservation_across_random_trades() {
        let accounts = Accounts::new(10);
        for id in 0..4 {
            accounts.get_or_create(TraderId(id), 100_000).unwrap();
        }

        let trades = [
            (0u32, 1u32, Side::Buy, 100i64, 5i64),
            (2, 3, Side::Sell, 99, 7),
            (1, 2, Side::Buy, 101, 3),
            (3, 0, Side::Sell, 98, 11),
        ];
        for (maker, taker, side, price, qty) in trades {
            accounts.apply_trade(TraderId(maker), TraderId(taker), side, Price(price), Qty(qty));
        }

        let total_balance: i64 = (0..4).map(|id| accounts.balance_of(TraderId(id))).sum();
        let total_position: i64 = (0..4).map(|id| accounts.position_of(TraderId(id))).sum();
        assert_eq!(total_balance, 400_000);
        assert_eq!(total_position, 0);
    }

    #[test]
    fn test_balance_queries() {
        let accounts = Accounts::new(10);
        accounts.get_or_create(TraderId(7), 500).unwrap();

        assert!(accounts.has_sufficient_balance(TraderId(7), 500));
        assert!(!accounts.has_sufficient_balance(TraderId(7), 501));
        assert!(!accounts.has_sufficient_balance(TraderId(8), 0));

        assert!(accounts.adjust_balance(TraderId(7), -200));
        assert_eq!(accounts.balance_of(TraderId(7)), 300);
        assert!(!accounts.adjust_balance(TraderId(8), 100));
    }

    #[test]
    fn test_clear() {
        let accounts = Accounts::new(10);
        accounts.get_or_create(TraderId(1), 0).unwrap();
        accounts.get_or_create(TraderId(2), 0).unwrap();

        accounts.clear();
        assert!(accounts.is_empty());
        assert!(accounts.get(TraderId(1)).is_none());
    }
}
