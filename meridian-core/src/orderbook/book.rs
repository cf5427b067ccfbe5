//! Per-symbol limit order book with price-time priority matching.
//!
//! Every mutation (`submit`, `cancel`, `amend`) is expected to be called
//! from a single shard worker per symbol — the book itself does no
//! internal locking, the same way the matching engine in the reference
//! exchange keeps one book per instrument and never shares it across
//! threads.

use crate::core::types::{Order, OrderId, OrderStatus, OrderType, Side, Symbol, TimeInForce, Trade};
use crate::orderbook::price_level::PriceLevel;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Where `cancel`/`amend` find a resting order without scanning every
/// level: order id → (side, price).
type OrderIndex = HashMap<OrderId, (Side, Decimal)>;

/// Outcome of `submit`: the trades produced and, if anything of the
/// incoming order remains (e.g. a GTC limit that didn't fully fill),
/// the order as it now stands.
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub order: Order,
}

pub struct OrderBook {
    pub symbol: Symbol,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    index: OrderIndex,
    sequence: u64,
    trade_sequence: u64,
    /// Stop and stop-limit orders, held here rather than in `bids`/`asks`
    /// until `last_trade_price` crosses their `stop_price`.
    held_stops: Vec<Order>,
    last_trade_price: Option<Decimal>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            sequence: 0,
            trade_sequence: 0,
            held_stops: Vec::new(),
            last_trade_price: None,
        }
    }

    pub fn last_trade_price(&self) -> Option<Decimal> {
        self.last_trade_price
    }

    /// Number of stop/stop-limit orders currently held off-book, awaiting
    /// trigger.
    pub fn held_stop_count(&self) -> usize {
        self.held_stops.len()
    }

    /// Release every held stop/stop-limit order whose trigger condition
    /// is met by the current `last_trade_price`, converting each to its
    /// underlying type (`Stop` -> `Market`, `StopLimit` -> `Limit`). The
    /// caller is responsible for feeding the released orders back through
    /// `submit`; this only removes them from the off-book store.
    pub fn release_triggered_stops(&mut self) -> Vec<Order> {
        let last_price = match self.last_trade_price {
            Some(p) => p,
            None => return Vec::new(),
        };
        let (released, remaining): (Vec<Order>, Vec<Order>) =
            self.held_stops.drain(..).partition(|order| match order.stop_price {
                Some(stop_price) => match order.side {
                    Side::Buy => last_price >= stop_price,
                    Side::Sell => last_price <= stop_price,
                },
                None => false,
            });
        self.held_stops = remaining;
        released
            .into_iter()
            .map(|mut order| {
                order.order_type = match order.order_type {
                    OrderType::Stop => OrderType::Market,
                    OrderType::StopLimit => OrderType::Limit,
                    other => other,
                };
                order
            })
            .collect()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn next_trade_id(&mut self) -> u64 {
        self.trade_sequence += 1;
        self.trade_sequence
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|Reverse(p)| *p)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Top-N levels on both sides with aggregate remaining quantity.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self
                .bids
                .iter()
                .take(depth)
                .map(|(Reverse(p), level)| (*p, level.total_remaining_qty()))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(p, level)| (*p, level.total_remaining_qty()))
                .collect(),
        }
    }

    /// Liquidity available on the ask side at or below `limit_price`
    /// (or the whole ask side for a market buy, where `limit_price` is
    /// `Decimal::MAX`).
    fn available_ask_quantity_at_or_below(&self, limit_price: Decimal) -> Decimal {
        self.asks
            .range(..=limit_price)
            .map(|(_, level)| level.total_remaining_qty())
            .sum()
    }

    fn available_bid_quantity_at_or_above(&self, limit_price: Decimal) -> Decimal {
        self.bids
            .range(..=Reverse(limit_price))
            .map(|(_, level)| level.total_remaining_qty())
            .sum()
    }

    /// Validate, transition to `pending`, and run the matching
    /// algorithm. The caller (risk gate) has already approved the order;
    /// this only enforces the book-level invariants (crossing, FOK
    /// liquidity, tie-break).
    pub fn submit(&mut self, mut order: Order) -> MatchOutcome {
        if matches!(order.order_type, OrderType::Stop | OrderType::StopLimit) {
            order.transition_to(OrderStatus::Pending);
            self.held_stops.push(order.clone());
            return MatchOutcome {
                trades: Vec::new(),
                order,
            };
        }

        order.transition_to(OrderStatus::Pending);

        let limit_price = match order.order_type {
            OrderType::Market => match order.side {
                Side::Buy => Decimal::MAX,
                Side::Sell => Decimal::ZERO,
            },
            _ => order.price.unwrap_or(Decimal::ZERO),
        };

        if order.time_in_force == TimeInForce::Fok {
            let available = match order.side {
                Side::Buy => self.available_ask_quantity_at_or_below(limit_price),
                Side::Sell => self.available_bid_quantity_at_or_above(limit_price),
            };
            if available < order.remaining_qty() {
                order.transition_to(OrderStatus::Cancelled);
                return MatchOutcome {
                    trades: Vec::new(),
                    order,
                };
            }
        }

        order.sequence = self.next_sequence();

        let trades = match order.side {
            Side::Buy => self.match_against_asks(&mut order, limit_price),
            Side::Sell => self.match_against_bids(&mut order, limit_price),
        };

        if order.remaining_qty() == Decimal::ZERO {
            order.transition_to(OrderStatus::Filled);
        } else if !trades.is_empty() {
            order.transition_to(OrderStatus::PartiallyFilled);
        }

        if order.remaining_qty() > Decimal::ZERO && !order.status.is_terminal() {
            // A market order never rests, regardless of time in force —
            // there is no price to rest it at.
            if order.order_type == OrderType::Market {
                order.transition_to(OrderStatus::Cancelled);
            } else {
                match order.time_in_force {
                    TimeInForce::Gtc | TimeInForce::Day => {
                        self.rest(order.clone());
                    }
                    TimeInForce::Ioc | TimeInForce::Fok => {
                        order.transition_to(OrderStatus::Cancelled);
                    }
                }
            }
        }

        MatchOutcome { trades, order }
    }

    fn rest(&mut self, order: Order) {
        let price = order.price.unwrap_or(Decimal::ZERO);
        let side = order.side;
        let id = order.id;
        self.index.insert(id, (side, price));
        match side {
            Side::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
            Side::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
        }
    }

    fn match_against_asks(&mut self, incoming: &mut Order, limit_price: Decimal) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            if incoming.remaining_qty() == Decimal::ZERO {
                break;
            }
            let best_price = match self.asks.keys().next().copied() {
                Some(p) => p,
                None => break,
            };
            if best_price > limit_price {
                break;
            }
            let mut resting = match self
                .asks
                .get_mut(&best_price)
                .expect("level exists")
                .pop_front()
            {
                Some(o) => o,
                None => break,
            };
            self.index.remove(&resting.id);

            let trade_qty = incoming.remaining_qty().min(resting.remaining_qty());
            incoming.apply_fill(trade_qty, best_price);
            resting.apply_fill(trade_qty, best_price);
            self.last_trade_price = Some(best_price);

            trades.push(Trade {
                id: self.next_trade_id(),
                symbol: self.symbol.clone(),
                buy_order_id: incoming.id,
                sell_order_id: resting.id,
                price: best_price,
                quantity: trade_qty,
                taker_side: Side::Buy,
                timestamp: now_millis(),
            });

            if resting.remaining_qty() == Decimal::ZERO {
                resting.transition_to(OrderStatus::Filled);
            } else {
                resting.transition_to(OrderStatus::PartiallyFilled);
                self.index.insert(resting.id, (Side::Sell, best_price));
                self.asks
                    .get_mut(&best_price)
                    .expect("level exists")
                    .push_front(resting);
            }
            if self
                .asks
                .get(&best_price)
                .map_or(true, |l| l.is_empty())
            {
                self.asks.remove(&best_price);
            }
        }
        trades
    }

    fn match_against_bids(&mut self, incoming: &mut Order, limit_price: Decimal) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            if incoming.remaining_qty() == Decimal::ZERO {
                break;
            }
            let best_price = match self.bids.keys().next().map(|Reverse(p)| *p) {
                Some(p) => p,
                None => break,
            };
            if best_price < limit_price {
                break;
            }
            let mut resting = match self
                .bids
                .get_mut(&Reverse(best_price))
                .expect("level exists")
                .pop_front()
            {
                Some(o) => o,
                None => break,
            };
            self.index.remove(&resting.id);

            let trade_qty = incoming.remaining_qty().min(resting.remaining_qty());
            incoming.apply_fill(trade_qty, best_price);
            resting.apply_fill(trade_qty, best_price);
            self.last_trade_price = Some(best_price);

            trades.push(Trade {
                id: self.next_trade_id(),
                symbol: self.symbol.clone(),
                buy_order_id: resting.id,
                sell_order_id: incoming.id,
                price: best_price,
                quantity: trade_qty,
                taker_side: Side::Sell,
                timestamp: now_millis(),
            });

            if resting.remaining_qty() == Decimal::ZERO {
                resting.transition_to(OrderStatus::Filled);
            } else {
                resting.transition_to(OrderStatus::PartiallyFilled);
                self.index.insert(resting.id, (Side::Buy, best_price));
                self.bids
                    .get_mut(&Reverse(best_price))
                    .expect("level exists")
                    .push_front(resting);
            }
            if self
                .bids
                .get(&Reverse(best_price))
                .map_or(true, |l| l.is_empty())
            {
                self.bids.remove(&Reverse(best_price));
            }
        }
        trades
    }

    /// O(1) index lookup, O(log n) level removal. Returns the cancelled
    /// order, or `None` if it wasn't resting (already filled/cancelled).
    pub fn cancel(&mut self, order_id: OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(&order_id)?;
        let removed = match side {
            Side::Buy => {
                let level = self.bids.get_mut(&Reverse(price))?;
                let order = level.remove(order_id);
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            Side::Sell => {
                let level = self.asks.get_mut(&price)?;
                let order = level.remove(order_id);
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };
        removed.map(|mut o| {
            o.transition_to(OrderStatus::Cancelled);
            o
        })
    }

    /// Cancel-then-resubmit. If price changes, or quantity increases,
    /// the order loses its place in time priority — it re-enters the
    /// book as a brand-new resting order.
    pub fn amend(&mut self, order_id: OrderId, new_qty: Decimal, new_price: Option<Decimal>) -> Option<MatchOutcome> {
        let mut existing = self.cancel(order_id)?;
        existing.quantity = new_qty;
        existing.filled_qty = Decimal::ZERO;
        existing.avg_price = Decimal::ZERO;
        existing.status = OrderStatus::New;
        if let Some(price) = new_price {
            existing.price = Some(price);
        }
        Some(self.submit(existing))
    }
}

#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
