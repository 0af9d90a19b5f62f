//! Price-time priority matching.
//!
//! [`match_order`] runs one incoming order against the book: takes liquidity
//! best price first at the maker's price, FIFO within each level, and rests
//! any limit-order remainder at its limit price. Pure computation over the
//! in-memory book; once called, it always completes.

use crate::order_book::{Fill, OrderBook, RestingOrder};
use crate::types::{Order, OrderStatus, Side};
use rust_decimal::Decimal;

/// Result of one matching pass.
#[derive(Clone, Debug)]
pub struct MatchOutcome {
    /// Fills in execution order (best price first, FIFO within a level).
    pub fills: Vec<Fill>,
    pub filled_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Final status of the incoming order. A market order with remainder is
    /// `Cancelled` (the caller reports the shortfall); a limit order with
    /// remainder rests as `Open` or `PartiallyFilled`.
    pub status: OrderStatus,
    /// Price levels whose aggregate changed: the maker levels consumed, plus
    /// the level a limit remainder rested at.
    pub touched: Vec<(Side, Decimal)>,
}

/// Run matching for one incoming order. The order cannot match itself: it is
/// not in the book while the pass runs, and ids are unique.
pub fn match_order(book: &mut OrderBook, order: &Order) -> MatchOutcome {
    // Market order: extreme limit so every opposing level qualifies.
    let price_limit = match (order.side, order.price) {
        (_, Some(p)) => p,
        (Side::Buy, None) => Decimal::MAX,
        (Side::Sell, None) => Decimal::ZERO,
    };

    let fills = match order.side {
        Side::Buy => book.take_from_asks(price_limit, order.remaining_quantity),
        Side::Sell => book.take_from_bids(price_limit, order.remaining_quantity),
    };

    let filled_quantity: Decimal = fills.iter().map(|f| f.quantity).sum();
    let remaining_quantity = order.remaining_quantity - filled_quantity;

    let maker_side = order.side.opposite();
    let mut touched: Vec<(Side, Decimal)> = Vec::new();
    for fill in &fills {
        if !touched.contains(&(maker_side, fill.price)) {
            touched.push((maker_side, fill.price));
        }
    }

    let status = if remaining_quantity.is_zero() {
        OrderStatus::Filled
    } else if let Some(price) = order.price {
        // Limit remainder rests at its limit price, behind any orders
        // already queued at that level.
        book.add_order(
            order.side,
            price,
            RestingOrder {
                order_id: order.order_id,
                remaining_quantity,
                timestamp_ms: order.timestamp_ms,
            },
        );
        touched.push((order.side, price));
        if filled_quantity.is_zero() {
            OrderStatus::Open
        } else {
            OrderStatus::PartiallyFilled
        }
    } else {
        // Market remainder: nothing left to take, nothing to rest.
        OrderStatus::Cancelled
    };

    MatchOutcome {
        fills,
        filled_quantity,
        remaining_quantity,
        status,
        touched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, OrderType, Symbol};

    fn order(id: u64, side: Side, quantity: &str, price: Option<&str>) -> Order {
        let quantity: Decimal = quantity.parse().unwrap();
        Order {
            order_id: OrderId(id),
            symbol: Symbol::from("BTC-USDT"),
            side,
            order_type: if price.is_some() {
                OrderType::Limit
            } else {
                OrderType::Market
            },
            price: price.map(|p| p.parse().unwrap()),
            quantity,
            remaining_quantity: quantity,
            status: OrderStatus::Open,
            timestamp_ms: id,
        }
    }

    fn book() -> OrderBook {
        OrderBook::new(Symbol::from("BTC-USDT"))
    }

    fn rest(book: &mut OrderBook, o: &Order) {
        let outcome = match_order(book, o);
        assert!(outcome.fills.is_empty(), "expected the order to rest");
    }

    #[test]
    fn limit_buy_on_empty_book_rests() {
        let mut book = book();
        let buy = order(1, Side::Buy, "1.0", Some("99"));
        let outcome = match_order(&mut book, &buy);
        assert!(outcome.fills.is_empty());
        assert_eq!(outcome.status, OrderStatus::Open);
        assert_eq!(outcome.remaining_quantity, Decimal::from(1));
        assert_eq!(book.best_bid(), Some(Decimal::from(99)));
        assert_eq!(outcome.touched, vec![(Side::Buy, Decimal::from(99))]);
    }

    #[test]
    fn full_fill_against_single_resting_order() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "10", Some("100")));
        let outcome = match_order(&mut book, &order(2, Side::Buy, "10", Some("100")));
        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.fills[0].quantity, Decimal::from(10));
        assert_eq!(outcome.status, OrderStatus::Filled);
        assert!(book.best_ask().is_none());
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn fifo_fairness_at_equal_price() {
        // Resting buy 1.0 @ 100 then buy 2.0 @ 100; incoming sell 1.5 @ 100
        // fills the first completely and the second partially, in order.
        let mut book = book();
        rest(&mut book, &order(1, Side::Buy, "1.0", Some("100")));
        rest(&mut book, &order(2, Side::Buy, "2.0", Some("100")));
        let outcome = match_order(&mut book, &order(3, Side::Sell, "1.5", Some("100")));
        assert_eq!(outcome.fills.len(), 2);
        assert_eq!(outcome.fills[0].maker_order_id, OrderId(1));
        assert_eq!(outcome.fills[0].quantity, "1.0".parse::<Decimal>().unwrap());
        assert!(outcome.fills[0].maker_fully_filled);
        assert_eq!(outcome.fills[1].maker_order_id, OrderId(2));
        assert_eq!(outcome.fills[1].quantity, "0.5".parse::<Decimal>().unwrap());
        assert!(!outcome.fills[1].maker_fully_filled);
        assert_eq!(outcome.status, OrderStatus::Filled);
        assert_eq!(
            book.quantity_at(Side::Buy, Decimal::from(100)),
            "1.5".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn trade_price_is_maker_price() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "5", Some("100")));
        // Aggressive limit: willing to pay 105, executes at the resting 100.
        let outcome = match_order(&mut book, &order(2, Side::Buy, "5", Some("105")));
        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.fills[0].price, Decimal::from(100));
    }

    #[test]
    fn limit_respects_price_limit_and_rests_remainder() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "5", Some("100")));
        rest(&mut book, &order(2, Side::Sell, "5", Some("102")));
        let outcome = match_order(&mut book, &order(3, Side::Buy, "8", Some("101")));
        // Takes the 5 @ 100, cannot reach 102, rests 3 @ 101.
        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.filled_quantity, Decimal::from(5));
        assert_eq!(outcome.status, OrderStatus::PartiallyFilled);
        assert_eq!(book.best_bid(), Some(Decimal::from(101)));
        assert_eq!(book.best_ask(), Some(Decimal::from(102)));
        assert_eq!(
            outcome.touched,
            vec![(Side::Sell, Decimal::from(100)), (Side::Buy, Decimal::from(101))]
        );
    }

    #[test]
    fn market_buy_consumes_available_then_cancels_remainder() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "1.0", Some("101")));
        let outcome = match_order(&mut book, &order(2, Side::Buy, "2.0", None));
        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.fills[0].price, Decimal::from(101));
        assert_eq!(outcome.filled_quantity, "1.0".parse::<Decimal>().unwrap());
        assert_eq!(outcome.remaining_quantity, "1.0".parse::<Decimal>().unwrap());
        assert_eq!(outcome.status, OrderStatus::Cancelled);
        assert!(book.best_ask().is_none());
        assert!(book.best_bid().is_none(), "market remainder must not rest");
    }

    #[test]
    fn market_sell_on_empty_book_cancels() {
        let mut book = book();
        let outcome = match_order(&mut book, &order(1, Side::Sell, "3", None));
        assert!(outcome.fills.is_empty());
        assert_eq!(outcome.status, OrderStatus::Cancelled);
        assert_eq!(outcome.remaining_quantity, Decimal::from(3));
    }

    #[test]
    fn crossing_multiple_levels_best_price_first() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Buy, "2", Some("99")));
        rest(&mut book, &order(2, Side::Buy, "2", Some("100")));
        let outcome = match_order(&mut book, &order(3, Side::Sell, "3", Some("98")));
        assert_eq!(outcome.fills.len(), 2);
        assert_eq!(outcome.fills[0].price, Decimal::from(100));
        assert_eq!(outcome.fills[1].price, Decimal::from(99));
        assert_eq!(outcome.fills[1].quantity, Decimal::from(1));
        assert_eq!(outcome.status, OrderStatus::Filled);
        assert_eq!(book.best_bid(), Some(Decimal::from(99)));
    }

    #[test]
    fn touched_levels_deduplicate_per_price() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "1", Some("100")));
        rest(&mut book, &order(2, Side::Sell, "1", Some("100")));
        let outcome = match_order(&mut book, &order(3, Side::Buy, "2", Some("100")));
        assert_eq!(outcome.fills.len(), 2);
        assert_eq!(outcome.touched, vec![(Side::Sell, Decimal::from(100))]);
    }

    #[test]
    fn book_never_crossed_after_matching() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "10", Some("101")));
        rest(&mut book, &order(2, Side::Buy, "10", Some("99")));
        let _ = match_order(&mut book, &order(3, Side::Buy, "5", Some("100")));
        let _ = match_order(&mut book, &order(4, Side::Sell, "5", Some("100")));
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "crossed book: bid {} >= ask {}", bid, ask);
        }
    }

    #[test]
    fn conservation_of_quantity() {
        let mut book = book();
        rest(&mut book, &order(1, Side::Sell, "4", Some("100")));
        rest(&mut book, &order(2, Side::Sell, "4", Some("101")));
        let incoming = order(3, Side::Buy, "10", Some("101"));
        let outcome = match_order(&mut book, &incoming);
        let filled: Decimal = outcome.fills.iter().map(|f| f.quantity).sum();
        assert_eq!(filled, outcome.filled_quantity);
        assert_eq!(
            outcome.filled_quantity + outcome.remaining_quantity,
            incoming.quantity
        );
    }
}
