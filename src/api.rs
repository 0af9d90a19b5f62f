//! REST and WebSocket ingress for the matching engine.
//!
//! Wire adapter only: deserializes requests, forwards them to
//! [`MatchingEngine`], and streams broadcast events to sockets. Create with
//! [`create_router`]. Uses Extension for state so the router is `Router<()>`
//! and works with `into_make_service()`.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::warn;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::engine::{EngineConfig, EngineError, MatchingEngine};
use crate::events::MarketEvent;
use crate::types::{OrderId, OrderRequest, Symbol};

/// Depth sent in WebSocket snapshots and used when `?depth` is omitted.
const DEFAULT_DEPTH: usize = 10;
/// Recent trades replayed to a fresh `/ws/trades` subscriber.
const TRADE_BACKLOG: usize = 50;

/// Shared app state: one engine per process.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
}

/// Builds the router and the engine it fronts.
pub fn create_router(config: EngineConfig) -> Router<()> {
    router_with_engine(Arc::new(MatchingEngine::new(config)))
}

/// Router over an existing engine (for tests that also drive the engine
/// directly).
pub fn router_with_engine(engine: Arc<MatchingEngine>) -> Router<()> {
    let state = AppState { engine };
    Router::new()
        .route("/health", get(health))
        .route("/api/orders", post(submit_order))
        .route("/api/orders/cancel", post(cancel_order))
        .route("/api/orders/book/:symbol", get(book_snapshot))
        .route("/api/orders/trades/:symbol", get(recent_trades))
        .route("/ws/market-data", get(market_data_ws))
        .route("/ws/trades", get(trades_ws))
        .layer(Extension(state))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn submit_order(
    Extension(state): Extension<AppState>,
    Json(request): Json<OrderRequest>,
) -> Response {
    match state.engine.submit(request) {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(EngineError::InsufficientLiquidity { fills, unfilled }) => {
            // The executed part stands; the remainder is reported as an
            // error code in an otherwise successful response.
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "error": "INSUFFICIENT_LIQUIDITY",
                    "fills": fills,
                    "unfilled_quantity": unfilled,
                })),
            )
                .into_response()
        }
        Err(err @ EngineError::UnknownSymbol(_)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": err.code(), "message": err.to_string() })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": err.code(), "message": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(serde::Deserialize)]
struct CancelRequest {
    symbol: Symbol,
    order_id: u64,
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    Json(body): Json<CancelRequest>,
) -> Response {
    let cancelled = state.engine.cancel(&body.symbol, OrderId(body.order_id));
    #[derive(serde::Serialize)]
    struct Out {
        cancelled: bool,
    }
    (StatusCode::OK, Json(Out { cancelled })).into_response()
}

#[derive(serde::Deserialize)]
struct DepthQuery {
    depth: Option<usize>,
}

async fn book_snapshot(
    Extension(state): Extension<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Response {
    let depth = query.depth.unwrap_or(DEFAULT_DEPTH);
    match state.engine.snapshot(&Symbol(symbol), depth) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": err.code(), "message": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(serde::Deserialize)]
struct TradesQuery {
    limit: Option<usize>,
}

async fn recent_trades(
    Extension(state): Extension<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<TradesQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(TRADE_BACKLOG);
    let trades = state.engine.recent_trades(&Symbol(symbol), limit);
    (StatusCode::OK, Json(trades)).into_response()
}

async fn market_data_ws(ws: WebSocketUpgrade, Extension(state): Extension<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_market_data(socket, state))
}

/// New-subscriber initialization (one snapshot per known book), then the
/// live delta stream.
async fn stream_market_data(mut socket: WebSocket, state: AppState) {
    let mut events = state.engine.subscribe();
    for symbol in state.engine.symbols() {
        if let Ok(snapshot) = state.engine.snapshot(&symbol, DEFAULT_DEPTH) {
            let frame = serde_json::json!({ "type": "snapshot", "data": snapshot });
            if send_json(&mut socket, &frame).await.is_err() {
                return;
            }
        }
    }
    loop {
        match events.recv().await {
            Ok(MarketEvent::BookDelta(delta)) => {
                let frame = serde_json::json!({ "type": "book_delta", "data": delta });
                if send_json(&mut socket, &frame).await.is_err() {
                    return;
                }
            }
            Ok(MarketEvent::Trade(_)) => {}
            Err(RecvError::Lagged(missed)) => {
                disconnect_lagged(&mut socket, "market-data", missed).await;
                return;
            }
            Err(RecvError::Closed) => return,
        }
    }
}

async fn trades_ws(ws: WebSocketUpgrade, Extension(state): Extension<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_trades(socket, state))
}

/// Recent-trade backlog first, then the live trade stream.
async fn stream_trades(mut socket: WebSocket, state: AppState) {
    let mut events = state.engine.subscribe();
    for symbol in state.engine.symbols() {
        for trade in state.engine.recent_trades(&symbol, TRADE_BACKLOG) {
            let frame = serde_json::json!({ "type": "trade", "data": trade });
            if send_json(&mut socket, &frame).await.is_err() {
                return;
            }
        }
    }
    loop {
        match events.recv().await {
            Ok(MarketEvent::Trade(trade)) => {
                let frame = serde_json::json!({ "type": "trade", "data": trade });
                if send_json(&mut socket, &frame).await.is_err() {
                    return;
                }
            }
            Ok(MarketEvent::BookDelta(_)) => {}
            Err(RecvError::Lagged(missed)) => {
                disconnect_lagged(&mut socket, "trades", missed).await;
                return;
            }
            Err(RecvError::Closed) => return,
        }
    }
}

/// Slow consumer: tell it to resync from a snapshot, then drop the
/// connection instead of backpressuring the engine.
async fn disconnect_lagged(socket: &mut WebSocket, stream: &str, missed: u64) {
    warn!("{} subscriber lagged, {} events missed", stream, missed);
    let frame = serde_json::json!({ "type": "lagged", "missed": missed });
    let _ = send_json(socket, &frame).await;
    let _ = socket.send(Message::Close(None)).await;
}

async fn send_json(socket: &mut WebSocket, frame: &serde_json::Value) -> Result<(), axum::Error> {
    socket.send(Message::Text(frame.to_string())).await
}
