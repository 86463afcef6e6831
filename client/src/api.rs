//! Transport seam between the sync engine and the server.

use async_trait::async_trait;
use taskboard_protocol::requests::{CreateProject, CreateTask, UpdateProject, UpdateTask};
use taskboard_protocol::{Comment, Project, Task, TeamMember};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status for errors the server answered, `None` for transport
    /// and decode failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Every resource call the engine makes. Implementations must be cheap to
/// share; the engine holds one behind an `Arc` and calls it from spawned
/// debounce tasks.
#[async_trait]
pub trait TaskboardApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    async fn create_project(&self, req: &CreateProject) -> Result<Project, ApiError>;

    async fn update_project(&self, id: &str, req: &UpdateProject) -> Result<Project, ApiError>;

    async fn delete_project(&self, id: &str) -> Result<(), ApiError>;

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ApiError>;

    async fn create_task(&self, project_id: &str, req: &CreateTask) -> Result<Task, ApiError>;

    async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        req: &UpdateTask,
    ) -> Result<Task, ApiError>;

    async fn delete_task(&self, project_id: &str, task_id: &str) -> Result<(), ApiError>;

    async fn add_comment(
        &self,
        project_id: &str,
        task_id: &str,
        text: &str,
    ) -> Result<Comment, ApiError>;

    async fn delete_comment(
        &self,
        project_id: &str,
        task_id: &str,
        comment_id: &str,
    ) -> Result<(), ApiError>;

    async fn list_team(&self) -> Result<Vec<TeamMember>, ApiError>;

    async fn create_member(&self, name: &str) -> Result<TeamMember, ApiError>;

    async fn rename_member(&self, id: &str, name: &str) -> Result<TeamMember, ApiError>;

    async fn delete_member(&self, id: &str) -> Result<(), ApiError>;
}
