//! Route table.
//!
//! Public:
//! - GET  /health
//! - POST /auth/register, /auth/login
//!
//! Bearer token required:
//! - GET /auth/me
//! - /projects, /projects/{id}
//! - /projects/{id}/tasks, /projects/{id}/tasks/{task_id}
//! - /projects/{id}/tasks/{task_id}/comments[/{comment_id}]
//! - /team, /team/{id}

mod auth;
mod comments;
mod health;
mod projects;
mod tasks;
mod team;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::auth::require_auth;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{id}",
            put(projects::update).delete(projects::remove),
        )
        .route("/projects/{id}/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/projects/{id}/tasks/{task_id}",
            put(tasks::update).delete(tasks::remove),
        )
        .route(
            "/projects/{id}/tasks/{task_id}/comments",
            post(comments::create),
        )
        .route(
            "/projects/{id}/tasks/{task_id}/comments/{comment_id}",
            delete(comments::remove),
        )
        .route("/team", get(team::list).post(team::create))
        .route("/team/{id}", put(team::rename).delete(team::remove))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.allowed_origins))
        .with_state(state)
}

/// `*` allows any origin; entries that are not valid header values are
/// skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(values))
}
