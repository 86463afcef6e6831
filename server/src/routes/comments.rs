use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use taskboard_protocol::Comment;
use taskboard_protocol::requests::CreateComment;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::store::comments;

pub(super) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text is required"));
    }
    let comment = state
        .db
        .with_connection(move |conn| {
            comments::add(conn, &project_id, &task_id, &text, Some(auth.user_id.as_str()))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path((project_id, task_id, comment_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .with_connection(move |conn| comments::remove(conn, &project_id, &task_id, &comment_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
