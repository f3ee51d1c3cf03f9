//! Liveness endpoint for external uptime monitors.

use axum::Router;
use axum::routing::get;

pub const ALIVE: &str = "Bot is alive!";

/// `GET /` → 200 "Bot is alive!".
pub fn health_routes() -> Router {
    Router::new().route("/", get(|| async { ALIVE }))
}

/// Bind `0.0.0.0:<port>` and serve the liveness route in the background.
pub async fn spawn_health_server(port: u16) -> std::io::Result<std::net::SocketAddr> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_routes()).await {
            tracing::error!("Health server stopped: {e}");
        }
    });
    tracing::info!(port = addr.port(), "Health server started");
    Ok(addr)
}
