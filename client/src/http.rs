//! reqwest-backed [`TaskboardApi`].

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use taskboard_protocol::requests::{
    AuthResponse, CreateComment, CreateMember, CreateProject, CreateTask, ErrorBody,
    HealthResponse, LoginRequest, MeResponse, RegisterRequest, UpdateMember, UpdateProject,
    UpdateTask,
};
use taskboard_protocol::{Comment, Project, PublicUser, Task, TeamMember};

use crate::api::{ApiError, TaskboardApi};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// Trim a configured base URL, drop a trailing slash and default the scheme
/// to `https://` when none is given.
pub fn normalize_base_url(raw: &str) -> String {
    let base = raw.trim();
    if base.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    let lower = base.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        base.to_string()
    } else {
        format!("https://{base}")
    }
}

/// HTTP transport. Holds the bearer token obtained from `register`/`login`
/// and attaches it to every later request.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse =
            send_json(self.request(Method::POST, "/auth/register").json(req)).await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse =
            send_json(self.request(Method::POST, "/auth/login").json(req)).await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    pub async fn me(&self) -> Result<PublicUser, ApiError> {
        let me: MeResponse = send_json(self.request(Method::GET, "/auth/me")).await?;
        Ok(me.user)
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        send_json(self.request(Method::GET, "/health")).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn checked(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let response = checked(builder.send().await?).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
    checked(builder.send().await?).await?;
    Ok(())
}

#[async_trait]
impl TaskboardApi for HttpApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        send_json(self.request(Method::GET, "/projects")).await
    }

    async fn create_project(&self, req: &CreateProject) -> Result<Project, ApiError> {
        send_json(self.request(Method::POST, "/projects").json(req)).await
    }

    async fn update_project(&self, id: &str, req: &UpdateProject) -> Result<Project, ApiError> {
        send_json(self.request(Method::PUT, &format!("/projects/{id}")).json(req)).await
    }

    async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        send_empty(self.request(Method::DELETE, &format!("/projects/{id}"))).await
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ApiError> {
        send_json(self.request(Method::GET, &format!("/projects/{project_id}/tasks"))).await
    }

    async fn create_task(&self, project_id: &str, req: &CreateTask) -> Result<Task, ApiError> {
        let path = format!("/projects/{project_id}/tasks");
        send_json(self.request(Method::POST, &path).json(req)).await
    }

    async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        req: &UpdateTask,
    ) -> Result<Task, ApiError> {
        let path = format!("/projects/{project_id}/tasks/{task_id}");
        send_json(self.request(Method::PUT, &path).json(req)).await
    }

    async fn delete_task(&self, project_id: &str, task_id: &str) -> Result<(), ApiError> {
        let path = format!("/projects/{project_id}/tasks/{task_id}");
        send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn add_comment(
        &self,
        project_id: &str,
        task_id: &str,
        text: &str,
    ) -> Result<Comment, ApiError> {
        let path = format!("/projects/{project_id}/tasks/{task_id}/comments");
        let body = CreateComment {
            text: text.to_string(),
        };
        send_json(self.request(Method::POST, &path).json(&body)).await
    }

    async fn delete_comment(
        &self,
        project_id: &str,
        task_id: &str,
        comment_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/projects/{project_id}/tasks/{task_id}/comments/{comment_id}");
        send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_team(&self) -> Result<Vec<TeamMember>, ApiError> {
        send_json(self.request(Method::GET, "/team")).await
    }

    async fn create_member(&self, name: &str) -> Result<TeamMember, ApiError> {
        let body = CreateMember {
            name: Some(name.to_string()),
        };
        send_json(self.request(Method::POST, "/team").json(&body)).await
    }

    async fn rename_member(&self, id: &str, name: &str) -> Result<TeamMember, ApiError> {
        let body = UpdateMember {
            name: Some(name.to_string()),
        };
        send_json(self.request(Method::PUT, &format!("/team/{id}")).json(&body)).await
    }

    async fn delete_member(&self, id: &str) -> Result<(), ApiError> {
        send_empty(self.request(Method::DELETE, &format!("/team/{id}"))).await
    }
}
