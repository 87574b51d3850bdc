#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents the type of a pending order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderType {
    /// Fills on the next tick at the touch.
    Market,
    /// Fills at the given price once the last price crosses it.
    Limit(f64),
}

/// Represents the side of an order (buy or sell).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    /// Positive quantity.
    Buy,
    /// Negative quantity.
    Sell,
}

/// The single order a book can hold.
///
/// The quantity is signed: positive buys, negative sells.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    quantity: i64,
    order_type: OrderType,
}

impl From<(OrderType, i64)> for Order {
    fn from((order_type, quantity): (OrderType, i64)) -> Self {
        Self { quantity, order_type }
    }
}

impl Order {
    /// Returns the signed quantity.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Returns the order type.
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Returns the side derived from the quantity sign.
    pub fn side(&self) -> OrderSide {
        if self.quantity > 0 { OrderSide::Buy } else { OrderSide::Sell }
    }

    /// Returns `true` for market orders.
    pub fn is_market_type(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    /// Returns the limit price, if any.
    pub fn limit_price(&self) -> Option<f64> {
        match self.order_type {
            OrderType::Limit(price) => Some(price),
            OrderType::Market => None,
        }
    }

    /// Returns the execution price against a tick, or `None` if the order
    /// cannot fill on it.
    pub(crate) fn execution_price(&self, tick: &super::Tick) -> Option<f64> {
        match (self.order_type, self.side()) {
            (OrderType::Market, OrderSide::Buy) => Some(tick.buy_price()),
            (OrderType::Market, OrderSide::Sell) => Some(tick.sell_price()),
            (OrderType::Limit(price), OrderSide::Buy) => (tick.last_price <= price).then_some(price),
            (OrderType::Limit(price), OrderSide::Sell) => (tick.last_price >= price).then_some(price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DepthItem, Tick};
    use chrono::DateTime;

    fn tick(last_price: f64) -> Tick {
        Tick::new("ACME", DateTime::default(), last_price, 0).with_depth(
            vec![DepthItem::from((last_price - 0.5, 1, 1))],
            vec![DepthItem::from((last_price + 0.5, 1, 1))],
        )
    }

    #[test]
    fn side_follows_sign() {
        let order = Order::from((OrderType::Market, 5));
        assert_eq!(order.side(), OrderSide::Buy);
        assert!(order.is_market_type());
        assert!(order.limit_price().is_none());

        let order = Order::from((OrderType::Limit(99.0), -5));
        assert_eq!(order.side(), OrderSide::Sell);
        assert_eq!(order.limit_price(), Some(99.0));
    }

    #[test]
    fn market_order_always_fills() {
        let buy = Order::from((OrderType::Market, 1));
        let sell = Order::from((OrderType::Market, -1));
        assert_eq!(buy.execution_price(&tick(100.0)), Some(100.5));
        assert_eq!(sell.execution_price(&tick(100.0)), Some(99.5));
    }

    #[test]
    fn limit_buy_fills_at_or_below_price() {
        let order = Order::from((OrderType::Limit(100.0), 1));
        assert_eq!(order.execution_price(&tick(100.5)), None);
        assert_eq!(order.execution_price(&tick(100.0)), Some(100.0));
        assert_eq!(order.execution_price(&tick(98.0)), Some(100.0));
    }

    #[test]
    fn limit_sell_fills_at_or_above_price() {
        let order = Order::from((OrderType::Limit(100.0), -1));
        assert_eq!(order.execution_price(&tick(99.5)), None);
        assert_eq!(order.execution_price(&tick(100.0)), Some(100.0));
        assert_eq!(order.execution_price(&tick(101.0)), Some(100.0));
    }
}
