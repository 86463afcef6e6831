use std::sync::LazyLock;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use regex_lite::Regex;
use taskboard_protocol::requests::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};

use crate::AppState;
use crate::auth::{AuthUser, password};
use crate::error::{ApiError, ApiJson};
use crate::store::users;

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

pub(super) async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = req.email.trim().to_string();
    let name = req.name.trim().to_string();
    if email.is_empty() || req.password.is_empty() || name.is_empty() {
        return Err(ApiError::bad_request(
            "Email, password, and name are required",
        ));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    let lookup = email.clone();
    let existing = state
        .db
        .with_connection(move |conn| users::find_by_email(conn, &lookup))
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = password::hash(req.password).await?;
    let user = state
        .db
        .with_connection(move |conn| users::create(conn, &email, &name, &password_hash))
        .await?;
    let token = state.tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub(super) async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let record = state
        .db
        .with_connection(move |conn| users::find_by_email(conn, &email))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !password::verify(req.password, record.password_hash).await? {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state.tokens.issue(&record.user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: record.user,
    }))
}

pub(super) async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .db
        .with_connection(move |conn| users::find_public(conn, &auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(MeResponse { user }))
}
