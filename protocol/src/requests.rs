//! Request and response envelopes.
//!
//! Update payloads are partial. A field left as `None` is omitted from the
//! JSON body and untouched by the server. For nullable columns the outer
//! `Option` tracks presence and the inner one carries an explicit `null`,
//! which clears the stored value.

use serde::{Deserialize, Serialize};

use crate::entities::{Priority, PublicUser, TaskStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp; anything else stores no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Rounded and clamped into `0..=100` by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_progress: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub tags: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub deadline: Option<Option<String>>,
}

impl UpdateProject {
    pub fn progress(value: u8) -> Self {
        Self {
            progress: Some(f64::from(value)),
            ..Default::default()
        }
    }

    pub fn auto_progress(on: bool) -> Self {
        Self {
            auto_progress: Some(on),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub description: Option<Option<String>>,
}

impl UpdateTask {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// `None` unassigns; it is still sent as an explicit `null`.
    pub fn assign(assignee_id: Option<String>) -> Self {
        Self {
            assignee_id: Some(assignee_id),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateComment {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeResponse {
    pub user: PublicUser,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn omitted_and_null_are_distinct() {
        let omitted: UpdateTask = serde_json::from_value(json!({ "completed": true })).unwrap();
        assert_eq!(omitted.assignee_id, None);

        let cleared: UpdateTask = serde_json::from_value(json!({ "assigneeId": null })).unwrap();
        assert_eq!(cleared.assignee_id, Some(None));

        let set: UpdateTask = serde_json::from_value(json!({ "assigneeId": "m1" })).unwrap();
        assert_eq!(set.assignee_id, Some(Some("m1".to_string())));
    }

    #[test]
    fn partial_updates_serialize_only_present_fields() {
        let body = serde_json::to_value(UpdateProject::progress(42)).unwrap();
        assert_eq!(body, json!({ "progress": 42.0 }));

        let body = serde_json::to_value(UpdateTask::assign(None)).unwrap();
        assert_eq!(body, json!({ "assigneeId": null }));

        let body = serde_json::to_value(UpdateProject {
            deadline: Some(None),
            tags: Some(Some(vec!["a".into(), "b".into()])),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, json!({ "tags": ["a", "b"], "deadline": null }));
    }

    #[test]
    fn register_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_value(json!({ "email": "a@b.co" })).unwrap();
        assert_eq!(req.password, "");
        assert_eq!(req.name, "");
    }

    #[test]
    fn bogus_priority_in_create_is_medium() {
        let req: CreateProject =
            serde_json::from_value(json!({ "name": "x", "priority": "bogus" })).unwrap();
        assert_eq!(req.priority, Some(Priority::Medium));
    }
}
