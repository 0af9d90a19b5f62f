//! # Crypto Matching Engine
//!
//! Single-instrument limit order books with deterministic price-time
//! priority matching, safe concurrent submission, and live trade/depth
//! broadcast.
//!
//! ## Entry point
//!
//! Use [`MatchingEngine`] as the single entry point: create with
//! [`MatchingEngine::new`], then [`MatchingEngine::submit`],
//! [`MatchingEngine::cancel`], and [`MatchingEngine::snapshot`]. Subscribe
//! to trades and book deltas with [`MatchingEngine::subscribe`].
//!
//! ## Example
//!
//! ```rust
//! use crypto_matching_engine::{
//!     EngineConfig, MatchingEngine, OrderRequest, OrderStatus, OrderType, Side, Symbol,
//! };
//! use rust_decimal::Decimal;
//!
//! let engine = MatchingEngine::new(EngineConfig::default());
//! let sell = OrderRequest {
//!     symbol: Symbol::from("BTC-USDT"),
//!     side: Side::Sell,
//!     order_type: OrderType::Limit,
//!     quantity: Decimal::from(1),
//!     price: Some(Decimal::from(30_000)),
//! };
//! let ack = engine.submit(sell).unwrap();
//! assert_eq!(ack.status, OrderStatus::Open);
//!
//! let buy = OrderRequest {
//!     symbol: Symbol::from("BTC-USDT"),
//!     side: Side::Buy,
//!     order_type: OrderType::Limit,
//!     quantity: Decimal::from(1),
//!     price: Some(Decimal::from(30_000)),
//! };
//! let ack = engine.submit(buy).unwrap();
//! assert_eq!(ack.status, OrderStatus::Filled);
//! assert_eq!(ack.fills.len(), 1);
//! assert_eq!(ack.fills[0].price, Decimal::from(30_000));
//! ```
//!
//! ## Lower-level API
//!
//! [`OrderBook`] and [`match_order`] can be used directly if you manage
//! ids and event publication yourself.

pub mod api;
pub mod engine;
pub mod events;
pub mod execution;
pub mod matching;
pub mod order_book;
pub mod order_gen;
pub mod types;

pub use engine::{BookSnapshot, EngineConfig, EngineError, MatchingEngine};
pub use events::{EventBroadcaster, MarketEvent};
pub use execution::{BookDelta, OrderAck, TradeExecution};
pub use matching::{match_order, MatchOutcome};
pub use order_book::{DepthLevel, Fill, OrderBook, PriceLevel, RestingOrder};
pub use order_gen::{replay_into_engine, Generator, GeneratorConfig, ReplaySummary};
pub use types::{Order, OrderId, OrderRequest, OrderStatus, OrderType, Side, Symbol, TradeId};
