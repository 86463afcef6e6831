use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use taskboard_protocol::Project;
use taskboard_protocol::requests::{CreateProject, UpdateProject};

use crate::AppState;
use crate::error::{ApiError, ApiJson};
use crate::store::projects;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = state.db.with_connection(|conn| projects::list(conn)).await?;
    Ok(Json(projects))
}

pub(super) async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state
        .db
        .with_connection(move |conn| projects::create(conn, &req))
        .await?;
    tracing::info!(project_id = %project.id, "Created project");
    Ok((StatusCode::CREATED, Json(project)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProject>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .db
        .with_connection(move |conn| projects::update(conn, &id, &req))
        .await?;
    Ok(Json(project))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .with_connection(move |conn| projects::delete(conn, &id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
