//! `taskboard-protocol`: wire types shared by the API server and the sync client.
//!
//! Everything that crosses the HTTP boundary lives here:
//! - **entities**: `Project`, `Task`, `Comment`, `TeamMember`, `User`
//! - **requests**: partial-update payloads and auth envelopes
//! - **progress**: the auto-progress formula both sides must agree on
//!
//! Enum fields coerce instead of rejecting: an unknown priority reads as
//! `medium`, an unknown task status reads as `active`.

pub mod entities;
pub mod progress;
pub mod requests;

pub use entities::{
    Comment, Priority, Project, ProjectStatus, PublicUser, Task, TaskStatus, TeamMember,
};
pub use progress::{auto_progress, clamp_progress};

/// Name stored for a project created with a blank name.
pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

/// Name stored for a task created with a blank name.
pub const DEFAULT_TASK_NAME: &str = "Untitled Task";

/// Name stored for a team member created with a blank name.
pub const DEFAULT_MEMBER_NAME: &str = "Unnamed Member";

/// Trim a user-supplied name, falling back to `default` when nothing is left.
pub fn normalize_name(raw: Option<&str>, default: &str) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default.to_string(),
    }
}
