//! Trades, book deltas, and the submit report.
//!
//! [`TradeExecution`] is emitted for each maker/taker match. [`BookDelta`]
//! carries the new aggregate quantity of a touched price level.

use crate::types::{OrderId, OrderStatus, Side, Symbol, TradeId};
use rust_decimal::Decimal;
use serde::Serializer;

fn serialize_option_decimal<S>(opt: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match opt {
        None => s.serialize_none(),
        Some(d) => s.serialize_str(&d.to_string()),
    }
}

/// A completed trade between one resting (maker) and one incoming (taker)
/// order. Immutable once created; the price is always the maker's price.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeExecution {
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Side of the incoming order that triggered the match.
    pub aggressor_side: Side,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub timestamp_ms: u64,
}

/// Net change of one price level after a matching pass or cancel.
/// `quantity` is the new aggregate at `price`; zero means the level is gone.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BookDelta {
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Report returned to the submitter: what happened to the order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Quantity-weighted average fill price; `None` when nothing filled.
    #[serde(default, serialize_with = "serialize_option_decimal")]
    pub average_price: Option<Decimal>,
    pub fills: Vec<TradeExecution>,
    pub timestamp_ms: u64,
}
