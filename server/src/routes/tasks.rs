use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use taskboard_protocol::Task;
use taskboard_protocol::requests::{CreateTask, UpdateTask};

use crate::AppState;
use crate::error::{ApiError, ApiJson};
use crate::store::{StoreError, tasks};

pub(super) async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .db
        .with_connection(move |conn| {
            tasks::list(conn, &project_id).map_err(StoreError::from)
        })
        .await?;
    Ok(Json(tasks))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ApiJson(req): ApiJson<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .db
        .with_connection(move |conn| tasks::create(conn, &project_id, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<UpdateTask>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .with_connection(move |conn| tasks::update(conn, &project_id, &task_id, &req))
        .await?;
    Ok(Json(task))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .with_connection(move |conn| tasks::delete(conn, &project_id, &task_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
