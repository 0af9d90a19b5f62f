//! Multi-symbol matching engine facade.
//!
//! Owns one order book per symbol behind a per-symbol lock, assigns order
//! and trade ids, keeps the bounded recent-trade history, and publishes
//! trades and book deltas after every mutating call. Books for different
//! symbols never contend with each other.

use crate::events::{EventBroadcaster, MarketEvent};
use crate::execution::{BookDelta, OrderAck, TradeExecution};
use crate::matching::{match_order, MatchOutcome};
use crate::order_book::{DepthLevel, OrderBook};
use crate::types::{Order, OrderId, OrderRequest, OrderStatus, OrderType, Side, Symbol, TradeId};
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Engine configuration.
///
/// `symbols` are registered at startup. With `lazy_create_books` (the
/// default) a book is also created on the first order for an unknown
/// symbol; with it disabled such orders are rejected with
/// [`EngineError::UnknownSymbol`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub symbols: Vec<Symbol>,
    pub lazy_create_books: bool,
    /// Broadcast buffer per subscriber; slower subscribers lag and resync.
    pub event_capacity: usize,
    /// Recent-trade ring buffer capacity, per symbol.
    pub trade_history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            lazy_create_books: true,
            event_capacity: 1024,
            trade_history_capacity: 1000,
        }
    }
}

/// Rejections surfaced by [`MatchingEngine::submit`]. Validation errors are
/// raised before any book mutation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("order quantity must be positive")]
    InvalidQuantity,
    #[error("limit order price must be positive")]
    InvalidPrice,
    #[error("unknown symbol {0}")]
    UnknownSymbol(Symbol),
    /// A market order consumed all available liquidity and still has
    /// remainder. The executed fills stand: they are recorded, broadcast,
    /// and returned here.
    #[error("insufficient liquidity: {unfilled} unfilled")]
    InsufficientLiquidity {
        fills: Vec<TradeExecution>,
        unfilled: Decimal,
    },
}

impl EngineError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidQuantity => "INVALID_QUANTITY",
            EngineError::InvalidPrice => "INVALID_PRICE",
            EngineError::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
            EngineError::InsufficientLiquidity { .. } => "INSUFFICIENT_LIQUIDITY",
        }
    }
}

/// Top-of-book view: the best `depth` levels per side with aggregate
/// quantity, for new-subscriber initialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// Per-symbol state behind one lock: the book, the trade-id counter, and
/// the bounded trade history. Cancel and matching for the same symbol
/// serialize here, so a cancel either runs before the order is touched by
/// matching or observes it already gone.
#[derive(Debug)]
struct BookShard {
    book: OrderBook,
    next_trade_id: u64,
    trades: VecDeque<TradeExecution>,
    history_capacity: usize,
}

impl BookShard {
    fn new(symbol: Symbol, history_capacity: usize) -> Self {
        Self {
            book: OrderBook::new(symbol),
            next_trade_id: 1,
            trades: VecDeque::with_capacity(history_capacity.min(64)),
            history_capacity,
        }
    }

    /// Stamp trade ids and append to the bounded history, oldest dropped
    /// first.
    fn record_trades(&mut self, taker: &Order, outcome: &MatchOutcome) -> Vec<TradeExecution> {
        let mut trades = Vec::with_capacity(outcome.fills.len());
        for fill in &outcome.fills {
            let trade = TradeExecution {
                trade_id: TradeId(self.next_trade_id),
                symbol: taker.symbol.clone(),
                price: fill.price,
                quantity: fill.quantity,
                aggressor_side: taker.side,
                maker_order_id: fill.maker_order_id,
                taker_order_id: taker.order_id,
                timestamp_ms: taker.timestamp_ms,
            };
            self.next_trade_id += 1;
            if self.trades.len() >= self.history_capacity {
                self.trades.pop_front();
            }
            self.trades.push_back(trade.clone());
            trades.push(trade);
        }
        trades
    }

    /// Post-pass aggregate for every touched level (zero when emptied).
    fn deltas_for(&self, touched: &[(Side, Decimal)]) -> Vec<BookDelta> {
        touched
            .iter()
            .map(|&(side, price)| BookDelta {
                symbol: self.book.symbol().clone(),
                side,
                price,
                quantity: self.book.quantity_at(side, price),
            })
            .collect()
    }
}

/// The engine. All methods take `&self`; state lives behind the symbol
/// registry lock and the per-symbol shard locks, held only for the duration
/// of one matching pass or cancel, never across I/O.
#[derive(Debug)]
pub struct MatchingEngine {
    config: EngineConfig,
    books: RwLock<HashMap<Symbol, Arc<Mutex<BookShard>>>>,
    broadcaster: EventBroadcaster,
    next_order_id: AtomicU64,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Self {
        let mut books = HashMap::new();
        for symbol in &config.symbols {
            books.insert(
                symbol.clone(),
                Arc::new(Mutex::new(BookShard::new(
                    symbol.clone(),
                    config.trade_history_capacity,
                ))),
            );
        }
        let broadcaster = EventBroadcaster::new(config.event_capacity);
        Self {
            config,
            books: RwLock::new(books),
            broadcaster,
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Submit an order: validate, run one matching pass under the symbol's
    /// lock, then publish trades first and the resulting deltas second.
    pub fn submit(&self, request: OrderRequest) -> Result<OrderAck, EngineError> {
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity);
        }
        if request.order_type == OrderType::Limit {
            match request.price {
                Some(price) if price > Decimal::ZERO => {}
                _ => return Err(EngineError::InvalidPrice),
            }
        }
        let shard = self
            .shard_for_submit(&request.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(request.symbol.clone()))?;

        let order_id = OrderId(self.next_order_id.fetch_add(1, Ordering::Relaxed));
        let timestamp_ms = now_ms();
        let order = Order {
            order_id,
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            // A market order executes at whatever the book offers; any
            // client-supplied price is ignored.
            price: if request.order_type == OrderType::Limit {
                request.price
            } else {
                None
            },
            quantity: request.quantity,
            remaining_quantity: request.quantity,
            status: OrderStatus::Open,
            timestamp_ms,
        };
        info!(
            "order submitted order_id={} symbol={} side={:?} type={:?} quantity={} price={:?}",
            order_id.0, order.symbol, order.side, order.order_type, order.quantity, order.price
        );

        let (outcome, trades, deltas) = {
            let mut shard = shard.lock().expect("lock");
            let outcome = match_order(&mut shard.book, &order);
            let trades = shard.record_trades(&order, &outcome);
            let deltas = shard.deltas_for(&outcome.touched);
            (outcome, trades, deltas)
        };

        for trade in &trades {
            info!(
                "trade trade_id={} symbol={} price={} quantity={} maker={} taker={}",
                trade.trade_id.0,
                trade.symbol,
                trade.price,
                trade.quantity,
                trade.maker_order_id.0,
                trade.taker_order_id.0
            );
            self.broadcaster.publish(MarketEvent::Trade(trade.clone()));
        }
        for delta in deltas {
            self.broadcaster.publish(MarketEvent::BookDelta(delta));
        }

        if order.is_market() && !outcome.remaining_quantity.is_zero() {
            warn!(
                "market order order_id={} unfilled remainder {}",
                order_id.0, outcome.remaining_quantity
            );
            return Err(EngineError::InsufficientLiquidity {
                fills: trades,
                unfilled: outcome.remaining_quantity,
            });
        }

        let average_price = if outcome.filled_quantity.is_zero() {
            None
        } else {
            let notional: Decimal = trades.iter().map(|t| t.price * t.quantity).sum();
            Some(notional / outcome.filled_quantity)
        };
        Ok(OrderAck {
            order_id,
            symbol: order.symbol,
            status: outcome.status,
            filled_quantity: outcome.filled_quantity,
            remaining_quantity: outcome.remaining_quantity,
            average_price,
            fills: trades,
            timestamp_ms,
        })
    }

    /// Cancel a resting order. Idempotent: unknown symbol, unknown id, and
    /// already filled or cancelled orders all return `false`.
    pub fn cancel(&self, symbol: &Symbol, order_id: OrderId) -> bool {
        let Some(shard) = self.existing_shard(symbol) else {
            return false;
        };
        let delta = {
            let mut shard = shard.lock().expect("lock");
            shard.book.cancel_order(order_id).map(|(side, price)| BookDelta {
                symbol: symbol.clone(),
                side,
                price,
                quantity: shard.book.quantity_at(side, price),
            })
        };
        match delta {
            Some(delta) => {
                info!("order cancelled order_id={} symbol={}", order_id.0, symbol);
                self.broadcaster.publish(MarketEvent::BookDelta(delta));
                true
            }
            None => false,
        }
    }

    /// Top `depth` levels per side. Read-only; a never-referenced symbol is
    /// unknown even with lazy creation enabled.
    pub fn snapshot(&self, symbol: &Symbol, depth: usize) -> Result<BookSnapshot, EngineError> {
        let shard = self
            .existing_shard(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.clone()))?;
        let shard = shard.lock().expect("lock");
        let (bids, asks) = shard.book.snapshot(depth);
        Ok(BookSnapshot {
            symbol: symbol.clone(),
            bids,
            asks,
        })
    }

    /// Up to `limit` most recent trades for the symbol, oldest first.
    /// Unknown symbols yield an empty history.
    pub fn recent_trades(&self, symbol: &Symbol, limit: usize) -> Vec<TradeExecution> {
        match self.existing_shard(symbol) {
            Some(shard) => {
                let shard = shard.lock().expect("lock");
                let skip = shard.trades.len().saturating_sub(limit);
                shard.trades.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Subscribe to the trade/delta event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MarketEvent> {
        self.broadcaster.subscribe()
    }

    /// Symbols with a registered book.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.read().expect("lock").keys().cloned().collect()
    }

    fn existing_shard(&self, symbol: &Symbol) -> Option<Arc<Mutex<BookShard>>> {
        self.books.read().expect("lock").get(symbol).cloned()
    }

    fn shard_for_submit(&self, symbol: &Symbol) -> Option<Arc<Mutex<BookShard>>> {
        if let Some(shard) = self.existing_shard(symbol) {
            return Some(shard);
        }
        if !self.config.lazy_create_books {
            return None;
        }
        let mut books = self.books.write().expect("lock");
        Some(
            books
                .entry(symbol.clone())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(BookShard::new(
                        symbol.clone(),
                        self.config.trade_history_capacity,
                    )))
                })
                .clone(),
        )
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
