//! HTTP + WebSocket gateway.
//!
//! Serves:
//! - `GET /` and `GET /ws`: WebSocket, one DataGen conversation per socket
//! - `GET /api/status`: returns `{ "status": "ok" }`
//! - `GET /api/health`: version, uptime and open connection count

pub mod envelope;
mod handlers;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use tokio::net::ToSocketAddrs;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::agent::AgentRuntime;
use crate::session::SessionStore;

// ---------------------------------------------------------------------------
// Shared state injected into axum handlers
// ---------------------------------------------------------------------------

/// State shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub(crate) sessions: SessionStore,
    pub(crate) agent: Arc<dyn AgentRuntime>,
    /// Cancelled when the server shuts down; every connection's own
    /// token is a child of this one.
    pub(crate) shutdown: CancellationToken,
    pub(crate) started_at: Instant,
}

impl AppState {
    pub fn new(agent: Arc<dyn AgentRuntime>, sessions: SessionStore) -> Self {
        Self {
            sessions,
            agent,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway handle
// ---------------------------------------------------------------------------

/// Handle returned by [`start_gateway`].
pub struct Gateway {
    /// Server task handle.
    pub handle: JoinHandle<()>,
    /// The address the server is actually listening on.
    pub addr: SocketAddr,
    /// The session store the server registers connections in.
    pub sessions: SessionStore,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Stop accepting connections, close open sockets, and wait for the
    /// server task to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            error!("gateway task ended abnormally: {e}");
        }
    }
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    // Browser clients open the socket from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/api/status", get(handlers::health::status_handler))
        .route("/api/health", get(handlers::health::api_health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Bind `addr` and serve the gateway on a background task.
///
/// Port `0` picks a free port; the bound address is in [`Gateway::addr`].
pub async fn start_gateway(addr: impl ToSocketAddrs, state: AppState) -> std::io::Result<Gateway> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let sessions = state.sessions.clone();
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let stop = shutdown.clone();
    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await });
        if let Err(e) = serve.await {
            error!("gateway server error: {e}");
        }
    });

    info!(%bound_addr, "gateway started");

    Ok(Gateway {
        handle,
        addr: bound_addr,
        sessions,
        shutdown,
    })
}
