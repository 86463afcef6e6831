use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use taskboard_protocol::TeamMember;
use taskboard_protocol::requests::{CreateMember, UpdateMember};

use crate::AppState;
use crate::error::{ApiError, ApiJson};
use crate::store::team;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<TeamMember>>, ApiError> {
    let members = state.db.with_connection(|conn| team::list(conn)).await?;
    Ok(Json(members))
}

pub(super) async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMember>,
) -> Result<(StatusCode, Json<TeamMember>), ApiError> {
    let member = state
        .db
        .with_connection(move |conn| team::create(conn, req.name.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub(super) async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateMember>,
) -> Result<Json<TeamMember>, ApiError> {
    let member = state
        .db
        .with_connection(move |conn| team::rename(conn, &id, req.name.as_deref()))
        .await?;
    Ok(Json(member))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .with_connection(move |conn| team::delete(conn, &id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
