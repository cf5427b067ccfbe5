//! A single price level: a FIFO queue of resting orders sharing one
//! price. Time priority within a level is queue order, which is why
//! orders are pushed to the back and matched from the front.

use crate::core::types::Order;
use std::collections::VecDeque;
use rust_decimal::Decimal;

pub struct PriceLevel {
    pub price: Decimal,
    orders: VecDeque<Order>,
}

impl PriceLevel {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    pub fn push_front(&mut self, order: Order) {
        self.orders.push_front(order);
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn total_remaining_qty(&self) -> Decimal {
        self.orders.iter().map(|o| o.remaining_qty()).sum()
    }

    pub fn remove(&mut self, order_id: crate::core::types::OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == order_id)?;
        self.orders.remove(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AccountId, OrderId, OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn order(id: u128) -> Order {
        Order::new(
            OrderId::new(id),
            format!("c{}", id),
            "u1",
            AccountId::from("a1"),
            "BTC-USD",
            Side::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(100)),
            TimeInForce::Gtc,
        )
    }

    #[test]
    fn fifo_order_is_preserved() {
        let mut level = PriceLevel::new(dec!(100));
        level.push_back(order(1));
        level.push_back(order(2));
        assert_eq!(level.pop_front().unwrap().id, OrderId::new(1));
        assert_eq!(level.pop_front().unwrap().id, OrderId::new(2));
    }

    #[test]
    fn remove_pulls_an_order_out_of_the_middle() {
        let mut level = PriceLevel::new(dec!(100));
        level.push_back(order(1));
        level.push_back(order(2));
        level.push_back(order(3));
        let removed = level.remove(OrderId::new(2));
        assert!(removed.is_some());
        assert_eq!(level.len(), 2);
    }
}
