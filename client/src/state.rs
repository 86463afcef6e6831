//! Snapshot of everything the client mirrors from the server.

use std::collections::BTreeSet;

use taskboard_protocol::{Project, Task, TeamMember};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    pub projects: Vec<Project>,
    pub team: Vec<TeamMember>,
    /// Projects whose task lists have been fetched since the last full load.
    /// An empty task list without a marker means "not loaded yet".
    pub tasks_loaded: BTreeSet<String>,
    /// Set once the first `load_all` finished, successfully or not.
    pub initial_load: bool,
    /// Message from the last failed load, cleared by the next successful one.
    pub error: Option<String>,
}

impl CacheState {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn task(&self, project_id: &str, task_id: &str) -> Option<&Task> {
        self.project(project_id)?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, project_id: &str, task_id: &str) -> Option<&mut Task> {
        self.project_mut(project_id)?
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
    }

    pub fn tasks_loaded(&self, project_id: &str) -> bool {
        self.tasks_loaded.contains(project_id)
    }

    pub fn member(&self, id: &str) -> Option<&TeamMember> {
        self.team.iter().find(|m| m.id == id)
    }

    /// Replace the mirror after a full load. Task lists arrive empty, so
    /// every loaded marker is dropped.
    pub(crate) fn replace_all(&mut self, projects: Vec<Project>, team: Vec<TeamMember>) {
        self.projects = projects;
        self.team = team;
        self.tasks_loaded.clear();
        self.initial_load = true;
        self.error = None;
    }

    pub(crate) fn reset_with_error(&mut self, message: String) {
        self.projects.clear();
        self.team.clear();
        self.tasks_loaded.clear();
        self.initial_load = true;
        self.error = Some(message);
    }
}
