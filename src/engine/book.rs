#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::trace;

use crate::engine::{Order, OrderType};

/// Virtual brokerage account of one runner.
///
/// Holds cash, a signed position and at most one pending order. A new order is
/// only accepted once the previous one has been filled: while an order is
/// waiting, `buy`, `sell`, `place_limit_order` and `exit` are silent no-ops.
/// Cash sufficiency is not checked, so cash can go negative.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    // Allocation baseline used for P&L
    cash_allocated: f64,
    cash: f64,
    position: i64,
    order: Option<Order>,
    // Number of resolved orders
    fill_count: usize,
}

impl Book {
    /// Sets both the allocation baseline and the current cash.
    pub fn allocate_cash(&mut self, amount: f64) {
        self.cash_allocated = amount;
        self.cash = amount;
    }

    /// Places a market buy order of `quantity`.
    pub fn buy(&mut self, quantity: i64) {
        self.place(Order::from((OrderType::Market, quantity)));
    }

    /// Places a market sell order of `quantity`.
    pub fn sell(&mut self, quantity: i64) {
        self.place(Order::from((OrderType::Market, -quantity)));
    }

    /// Places a limit order of signed `quantity` at `price`.
    pub fn place_limit_order(&mut self, quantity: i64, price: f64) {
        self.place(Order::from((OrderType::Limit(price), quantity)));
    }

    /// Flattens the position with a market order.
    pub fn exit(&mut self) {
        if self.position != 0 {
            self.place(Order::from((OrderType::Market, -self.position)));
        }
    }

    fn place(&mut self, order: Order) {
        if order.quantity() == 0 {
            return;
        }
        if self.order.is_some() {
            trace!(?order, pending = ?self.order, "order ignored, another one is waiting");
            return;
        }
        self.order = Some(order);
    }

    /// Returns how many units the current cash buys at `price`.
    ///
    /// Advisory only, orders are never checked against it.
    pub fn quantity_affordable(&self, price: f64) -> i64 {
        if price > 0.0 && price <= self.cash {
            (self.cash / price).floor() as i64
        } else {
            0
        }
    }

    /// Returns `true` when the position is not flat.
    pub fn in_position(&self) -> bool {
        self.position != 0
    }

    /// Returns `true` when an order is waiting for execution.
    pub fn is_order_waiting(&self) -> bool {
        self.order.is_some()
    }

    /// Returns `true` when flat and without pending order.
    pub fn is_book_clean(&self) -> bool {
        !self.in_position() && !self.is_order_waiting()
    }

    /// Returns the allocation baseline.
    pub fn cash_allocated(&self) -> f64 {
        self.cash_allocated
    }

    /// Returns the current cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the signed position.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Returns the pending order, if any.
    pub fn pending_order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Returns the number of filled orders.
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    /// Returns the realized cash difference against the allocation.
    pub fn pnl(&self) -> f64 {
        self.cash - self.cash_allocated
    }

    /// Takes the pending order out of the slot.
    pub(crate) fn take_order(&mut self) -> Option<Order> {
        self.order.take()
    }

    /// Books a fill. A sell has a negative quantity and therefore adds cash.
    pub(crate) fn apply_fill(&mut self, quantity: i64, price: f64) {
        self.cash -= quantity as f64 * price;
        self.position += quantity;
        self.fill_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_cash() {
        let mut book = Book::default();
        book.allocate_cash(10_000.0);
        assert_eq!(book.cash(), 10_000.0);
        assert_eq!(book.cash_allocated(), 10_000.0);
        assert_eq!(book.pnl(), 0.0);
        assert!(book.is_book_clean());
    }

    #[test]
    fn buy_and_sell_sign_quantity() {
        let mut book = Book::default();
        book.buy(10);
        assert_eq!(book.pending_order().map(|o| o.quantity()), Some(10));
        book.take_order();

        book.sell(10);
        assert_eq!(book.pending_order().map(|o| o.quantity()), Some(-10));
        assert!(book.pending_order().is_some_and(|o| o.is_market_type()));
    }

    #[test]
    fn second_order_is_ignored() {
        let mut book = Book::default();
        book.buy(10);
        book.sell(5);
        book.place_limit_order(3, 99.0);
        let order = book.pending_order().unwrap();
        assert_eq!(order.quantity(), 10);
        assert!(order.is_market_type());
    }

    #[test]
    fn zero_quantity_is_ignored() {
        let mut book = Book::default();
        book.buy(0);
        assert!(!book.is_order_waiting());
    }

    #[test]
    fn limit_order() {
        let mut book = Book::default();
        book.place_limit_order(-4, 101.5);
        let order = book.pending_order().unwrap();
        assert_eq!(order.quantity(), -4);
        assert_eq!(order.limit_price(), Some(101.5));
    }

    #[test]
    fn quantity_affordable() {
        let mut book = Book::default();
        book.allocate_cash(1_000.0);
        assert_eq!(book.quantity_affordable(300.0), 3);
        assert_eq!(book.quantity_affordable(1_000.0), 1);
        assert_eq!(book.quantity_affordable(1_000.5), 0);
        assert_eq!(book.quantity_affordable(0.0), 0);
    }

    #[test]
    fn fills_update_cash_and_position() {
        let mut book = Book::default();
        book.allocate_cash(1_000.0);

        book.apply_fill(5, 100.0);
        assert_eq!(book.cash(), 500.0);
        assert_eq!(book.position(), 5);
        assert!(book.in_position());

        book.apply_fill(-5, 110.0);
        assert_eq!(book.cash(), 1_050.0);
        assert_eq!(book.position(), 0);
        assert_eq!(book.fill_count(), 2);
        assert_eq!(book.pnl(), 50.0);
    }

    #[test]
    fn cash_can_go_negative() {
        let mut book = Book::default();
        book.allocate_cash(100.0);
        book.apply_fill(10, 100.0);
        assert_eq!(book.cash(), -900.0);
    }

    #[test]
    fn exit_flattens_position() {
        let mut book = Book::default();
        book.exit();
        assert!(!book.is_order_waiting());

        book.apply_fill(-7, 10.0);
        book.exit();
        let order = book.pending_order().unwrap();
        assert_eq!(order.quantity(), 7);
        assert!(order.is_market_type());
    }

    #[test]
    fn exit_is_ignored_while_an_order_waits() {
        let mut book = Book::default();
        book.apply_fill(3, 10.0);
        book.place_limit_order(2, 9.0);
        book.exit();
        assert_eq!(book.pending_order().map(|o| o.quantity()), Some(2));
    }
}
