//! `taskboard-server`: REST API for projects, tasks, comments and team
//! members, backed by SQLite.
//!
//! The binary wires [`config::ConfigLoader`] and [`serve`] together; tests
//! build an [`AppState`] over a temporary database and call [`serve`] on an
//! ephemeral listener.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod store;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::auth::token::TokenIssuer;
use crate::config::ServerConfig;
use crate::db::Database;

pub use routes::build_router;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    pub fn new(db: Database, config: &ServerConfig) -> Self {
        Self {
            db,
            tokens: Arc::new(TokenIssuer::new(
                config.jwt_secret.as_bytes(),
                config.jwt_expires_in,
            )),
            allowed_origins: config.allowed_origins.clone().into(),
        }
    }
}

/// Serve the API on `listener` until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("API listening on http://{addr}");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
