use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use taskboard_protocol::requests::HealthResponse;

use crate::AppState;

/// Liveness plus a `SELECT 1` probe. Unauthenticated.
pub(super) async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(err) => {
            tracing::error!("Health probe failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    ok: false,
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}
