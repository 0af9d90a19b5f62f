//! HTTP/WebSocket server for the matching engine.
//!
//! Endpoints: health, submit/cancel orders, book snapshot, recent trades,
//! and the market-data and trade WebSocket streams.

use crypto_matching_engine::api;
use crypto_matching_engine::engine::EngineConfig;
use crypto_matching_engine::types::Symbol;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let _ = env_logger::try_init();
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let symbols: Vec<Symbol> = std::env::var("SYMBOLS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(Symbol::from)
                .collect()
        })
        .unwrap_or_default();
    let lazy_create_books = std::env::var("LAZY_BOOKS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(true);

    let config = EngineConfig {
        symbols,
        lazy_create_books,
        ..EngineConfig::default()
    };
    let app = api::create_router(config);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    eprintln!("listening on http://{}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .expect("serve");
}
