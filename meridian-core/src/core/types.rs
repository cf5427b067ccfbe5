//! Core domain types shared across the order book, risk gate and engine.
//!
//! `Order` and `Trade` are plain value types (cheap to clone, stable by
//! id); `Position` is the hot-path aggregate the risk gate and engine
//! mutate on every fill and is therefore cache-aligned and atomic rather
//! than behind a lock.

use crate::core::errors::OverflowError;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique order identifier.
///
/// `u128` rather than `String`: zero-allocation, `Copy`, and orderable by
/// construction time which makes it a usable tie-break key on its own if
/// a price level ever needs one independent of insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct OrderId(pub u128);

impl OrderId {
    #[inline(always)]
    pub const fn new(id: u128) -> Self {
        Self(id)
    }

    /// Generate a new id: `[timestamp:64][random:32][counter:32]`.
    ///
    /// Casting nanosecond timestamps to `u64` overflows around the year
    /// 2554; acceptable for the operational timeframe of this system.
    pub fn generate() -> Self {
        use rand::Rng;

        thread_local! {
            static COUNTER: std::cell::Cell<u32> = std::cell::Cell::new(0);
            static RNG: std::cell::RefCell<rand::rngs::ThreadRng> = std::cell::RefCell::new(rand::thread_rng());
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let random_part = RNG.with(|rng| rng.borrow_mut().gen::<u32>());
        let counter = COUNTER.with(|c| {
            let val = c.get();
            c.set(val.wrapping_add(1));
            val
        });

        let id = ((timestamp as u128) << 64) | ((random_part as u128) << 32) | (counter as u128);
        Self(id)
    }

    #[inline(always)]
    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<u128> for OrderId {
    #[inline(always)]
    fn from(id: u128) -> Self {
        Self(id)
    }
}

/// Account identifier. Newtype over a small string to keep the trait
/// boundary explicit without pulling UUID parsing into the hot path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Symbol identifier, e.g. `"BTC-USD"`.
pub type Symbol = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderType {
    Market = 0,
    Limit = 1,
    Stop = 2,
    StopLimit = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum TimeInForce {
    Day = 0,
    Gtc = 1,
    Ioc = 2,
    Fok = 3,
}

/// Order lifecycle state. `Status::is_terminal` enforces the
/// new→pending→{partial↔partial}→{terminal} invariant at the boundary
/// where the engine writes a new status onto an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    New = 0,
    Pending = 1,
    PartiallyFilled = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
    Expired = 6,
}

impl OrderStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Whether transitioning from `self` to `next` is a legal move under
    /// the order state machine. Terminal states never transition again.
    pub const fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (OrderStatus::New, OrderStatus::Pending) => true,
            (OrderStatus::New, OrderStatus::Rejected) => true,
            (OrderStatus::Pending, OrderStatus::PartiallyFilled) => true,
            (OrderStatus::Pending, OrderStatus::Filled) => true,
            (OrderStatus::Pending, OrderStatus::Cancelled) => true,
            (OrderStatus::Pending, OrderStatus::Rejected) => true,
            (OrderStatus::Pending, OrderStatus::Expired) => true,
            (OrderStatus::PartiallyFilled, OrderStatus::PartiallyFilled) => true,
            (OrderStatus::PartiallyFilled, OrderStatus::Filled) => true,
            (OrderStatus::PartiallyFilled, OrderStatus::Cancelled) => true,
            (OrderStatus::PartiallyFilled, OrderStatus::Expired) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "new",
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// A resting or incoming order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: String,
    pub user_id: String,
    pub account_id: AccountId,
    pub symbol: Symbol,

    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,

    pub status: OrderStatus,
    pub filled_qty: Decimal,
    pub avg_price: Decimal,

    pub created_at: u64,
    pub updated_at: u64,
    pub expires_at: Option<u64>,

    /// Monotonically increasing sequence assigned at book entry; the
    /// tie-break key between two resting orders at the same price.
    pub sequence: u64,
}

impl Order {
    pub fn new(
        id: OrderId,
        client_order_id: impl Into<String>,
        user_id: impl Into<String>,
        account_id: AccountId,
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
        time_in_force: TimeInForce,
    ) -> Self {
        let now = now_millis();
        Self {
            id,
            client_order_id: client_order_id.into(),
            user_id: user_id.into(),
            account_id,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price,
            stop_price: None,
            time_in_force,
            status: OrderStatus::New,
            filled_qty: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            expires_at: None,
            sequence: 0,
        }
    }

    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.filled_qty
    }

    /// Apply `next` if legal, returning whether the transition happened.
    /// Illegal transitions are a programmer error in the caller, not a
    /// runtime condition to propagate — the engine only ever calls this
    /// with states it computed itself.
    pub fn transition_to(&mut self, next: OrderStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = now_millis();
        true
    }

    /// Record a fill of `qty` at `price`, updating filled quantity and
    /// the cumulative volume-weighted average fill price.
    pub fn apply_fill(&mut self, qty: Decimal, price: Decimal) {
        let prior_notional = self.avg_price * self.filled_qty;
        self.filled_qty += qty;
        if self.filled_qty > Decimal::ZERO {
            self.avg_price = (prior_notional + qty * price) / self.filled_qty;
        }
        self.updated_at = now_millis();
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// An immutable trade produced by the matching algorithm.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: Symbol,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub taker_side: Side,
    pub timestamp: u64,
}

/// Cache-aligned, lock-free position aggregate.
///
/// All monetary/quantity fields use a 9-decimal fixed-point
/// representation (`10^9` scale) rather than `Decimal` so the risk gate
/// can read and update them with plain atomics on the matching hot path;
/// [`Position::to_snapshot`] converts to `Decimal` for anything crossing
/// out of that path (metrics, persistence, the egress event).
#[repr(C, align(64))]
pub struct Position {
    pub quantity: AtomicI64,
    pub entry_price: AtomicU64,
    pub realized_pnl: AtomicI64,
    pub daily_pnl: AtomicI64,
    pub daily_high_water_mark: AtomicI64,
    pub trade_count: AtomicU32,
    _padding: [u8; 12],
}

/// Fixed-point scale shared by every `Position` field: 9 decimal places.
pub const FIXED_POINT_SCALE: i64 = 1_000_000_000;

impl Position {
    pub const fn new() -> Self {
        Self {
            quantity: AtomicI64::new(0),
            entry_price: AtomicU64::new(0),
            realized_pnl: AtomicI64::new(0),
            daily_pnl: AtomicI64::new(0),
            daily_high_water_mark: AtomicI64::new(0),
            trade_count: AtomicU32::new(0),
            _padding: [0; 12],
        }
    }

    #[inline(always)]
    pub fn quantity(&self) -> i64 {
        self.quantity.load(Ordering::Relaxed)
    }

    /// Add `delta` to the position quantity, checking for overflow.
    pub fn update_quantity(&self, delta: i64) -> Result<i64, OverflowError> {
        let old = self.quantity.load(Ordering::Relaxed);
        let new = old
            .checked_add(delta)
            .ok_or(OverflowError::QuantityOverflow { old, delta })?;
        self.quantity.fetch_add(delta, Ordering::AcqRel);
        Ok(new)
    }

    #[inline(always)]
    pub fn realized_pnl(&self) -> i64 {
        self.realized_pnl.load(Ordering::Relaxed)
    }

    pub fn update_realized_pnl(&self, delta: i64) -> Result<(), OverflowError> {
        let old = self.realized_pnl.load(Ordering::Relaxed);
        old.checked_add(delta)
            .ok_or(OverflowError::RealizedPnlOverflow { old, delta })?;
        self.realized_pnl.fetch_add(delta, Ordering::AcqRel);
        Ok(())
    }

    #[inline(always)]
    pub fn daily_pnl(&self) -> i64 {
        self.daily_pnl.load(Ordering::Relaxed)
    }

    pub fn update_daily_pnl(&self, delta: i64) -> Result<(), OverflowError> {
        let old = self.daily_pnl.load(Ordering::Relaxed);
        let new = old
            .checked_add(delta)
            .ok_or(OverflowError::DailyPnlOverflow { old, delta })?;
        self.daily_pnl.fetch_add(delta, Ordering::AcqRel);
        self.update_daily_high_water_mark(new);
        Ok(())
    }

    fn update_daily_high_water_mark(&self, candidate: i64) {
        let mut current = self.daily_high_water_mark.load(Ordering::Relaxed);
        while candidate > current {
            match self.daily_high_water_mark.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(v) => current = v,
            }
        }
    }

    pub fn reset_daily(&self) {
        self.daily_pnl.store(0, Ordering::Release);
        self.daily_high_water_mark.store(0, Ordering::Release);
    }

    pub fn increment_trades(&self) -> u32 {
        self.trade_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Convert fixed-point i64 to `Decimal` at the 9-decimal scale.
    pub fn fixed_to_decimal(v: i64) -> Decimal {
        Decimal::new(v, 9)
    }

    /// Convert `Decimal` to the 9-decimal fixed-point i64 representation.
    /// Saturates at `i64::MAX`/`MIN` rather than panicking — a position
    /// this large would already have tripped every risk limit.
    pub fn decimal_to_fixed(v: Decimal) -> i64 {
        (v * Decimal::new(FIXED_POINT_SCALE, 0))
            .try_into()
            .unwrap_or(if v.is_sign_negative() { i64::MIN } else { i64::MAX })
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_status_transitions_follow_the_state_machine() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Filled));
        assert!(!OrderStatus::Filled.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::Filled));
    }

    #[test]
    fn apply_fill_updates_volume_weighted_average_price() {
        let mut order = Order::new(
            OrderId::new(1),
            "c1",
            "u1",
            AccountId::from("a1"),
            "BTC-USD",
            Side::Buy,
            OrderType::Limit,
            dec!(10),
            Some(dec!(100)),
            TimeInForce::Gtc,
        );

        order.apply_fill(dec!(4), dec!(100));
        order.apply_fill(dec!(6), dec!(102));

        assert_eq!(order.filled_qty, dec!(10));
        // (4*100 + 6*102) / 10 = 101.2
        assert_eq!(order.avg_price, dec!(101.2));
    }

    #[test]
    fn position_quantity_overflow_is_rejected() {
        let pos = Position::new();
        pos.update_quantity(i64::MAX).unwrap();
        assert!(pos.update_quantity(1).is_err());
    }

    #[test]
    fn fixed_point_round_trips_through_decimal() {
        let fixed = Position::decimal_to_fixed(dec!(1.5));
        assert_eq!(fixed, 1_500_000_000);
        assert_eq!(Position::fixed_to_decimal(fixed), dec!(1.5));
    }
}
