//! Optimistic synchronization engine.
//!
//! Every intent applies its change to the cached mirror under the cache lock
//! before any network future is awaited. The write then goes out either
//! immediately or through a keyed debounce timer:
//!
//! | intent | write | on failure |
//! |---|---|---|
//! | `set_progress` | debounced per project | restore the value seen before the failed write |
//! | `create_task` | debounced per placeholder | drop the placeholder |
//! | `assign_task` | debounced per task | keep the optimistic value |
//! | `toggle_task` | immediate | restore the whole previous snapshot |
//! | deletes | immediate | reinsert at the old position |
//!
//! Two in-flight writes for one key can race; the last response wins.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use taskboard_protocol::requests::{CreateProject, CreateTask, UpdateProject, UpdateTask};
use taskboard_protocol::{
    Comment, DEFAULT_TASK_NAME, Project, Task, TaskStatus, TeamMember, clamp_progress,
    normalize_name,
};
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::api::{ApiError, TaskboardApi};
use crate::busy::BusyCounter;
use crate::debounce::Debouncer;
use crate::state::CacheState;

/// Prefix of the ids given to tasks that exist only in the cache.
pub const TEMP_ID_PREFIX: &str = "temp_";

pub fn is_placeholder(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Debounce windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub progress_debounce: Duration,
    pub create_task_debounce: Duration,
    pub assign_debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            progress_debounce: Duration::from_millis(500),
            create_task_debounce: Duration::from_millis(400),
            assign_debounce: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("project {0} is not in the cache")]
    UnknownProject(String),

    #[error("task {0} has not been created on the server yet")]
    PendingCreate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimerKey {
    Progress(String),
    CreateTask(String),
    Assign(String, String),
}

struct Shared {
    cache: CacheState,
    /// Placeholders deleted after their create request had already fired.
    orphaned: HashSet<String>,
}

struct Inner {
    api: Arc<dyn TaskboardApi>,
    config: SyncConfig,
    shared: Mutex<Shared>,
    busy: BusyCounter,
    timers: Debouncer<TimerKey>,
}

/// Cloneable handle to the client cache. All clones share one mirror.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn TaskboardApi>) -> Self {
        Self::with_config(api, SyncConfig::default())
    }

    pub fn with_config(api: Arc<dyn TaskboardApi>, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                shared: Mutex::new(Shared {
                    cache: CacheState::default(),
                    orphaned: HashSet::new(),
                }),
                busy: BusyCounter::new(),
                timers: Debouncer::new(),
            }),
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.inner.config
    }

    /// Full copy of the cache.
    pub async fn snapshot(&self) -> CacheState {
        self.inner.shared.lock().await.cache.clone()
    }

    pub async fn project(&self, id: &str) -> Option<Project> {
        self.inner.shared.lock().await.cache.project(id).cloned()
    }

    /// True while any network request is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.busy.is_busy()
    }

    /// Number of in-flight requests, updated as they start and finish.
    pub fn loading_changes(&self) -> watch::Receiver<usize> {
        self.inner.busy.subscribe()
    }

    /// Wait until no debounce timer is pending and no request is in flight.
    pub async fn settle(&self) {
        loop {
            self.inner.timers.idle().await;
            self.inner.busy.idle().await;
            if self.inner.timers.active_count() == 0 && !self.inner.busy.is_busy() {
                return;
            }
        }
    }

    async fn tracked<T>(&self, request: impl Future<Output = T>) -> T {
        let _busy = self.inner.busy.enter();
        request.await
    }

    /// Fetch projects and team together and replace the whole cache.
    ///
    /// A failure empties the cache and records the message in
    /// [`CacheState::error`]; either way `initial_load` becomes true.
    pub async fn load_all(&self) -> Result<(), SyncError> {
        let api = &self.inner.api;
        let result = self
            .tracked(async { tokio::try_join!(api.list_projects(), api.list_team()) })
            .await;
        let mut shared = self.inner.shared.lock().await;
        match result {
            Ok((projects, team)) => {
                tracing::debug!(
                    "Loaded {} projects, {} team members",
                    projects.len(),
                    team.len()
                );
                shared.cache.replace_all(projects, team);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Failed to load projects and team: {err}");
                shared.cache.reset_with_error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Replace one project's task list with the server's.
    pub async fn load_tasks(&self, project_id: &str) -> Result<(), SyncError> {
        let result = self.tracked(self.inner.api.list_tasks(project_id)).await;
        let mut shared = self.inner.shared.lock().await;
        let cache = &mut shared.cache;
        match result {
            Ok(tasks) => {
                if let Some(project) = cache.project_mut(project_id) {
                    project.tasks = tasks;
                    cache.tasks_loaded.insert(project_id.to_string());
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Failed to load tasks for project {project_id}: {err}");
                if let Some(project) = cache.project_mut(project_id) {
                    project.tasks.clear();
                }
                cache.tasks_loaded.remove(project_id);
                Err(err.into())
            }
        }
    }

    /// Load a project's tasks unless they were already loaded. Returns
    /// whether a request was made.
    pub async fn ensure_tasks(&self, project_id: &str) -> Result<bool, SyncError> {
        if self.inner.shared.lock().await.cache.tasks_loaded(project_id) {
            return Ok(false);
        }
        self.load_tasks(project_id).await?;
        Ok(true)
    }

    /// Show `value` (rounded and clamped) at once; write it after the
    /// progress window unless another value replaces it first.
    pub async fn set_progress(&self, project_id: &str, value: f64) -> u8 {
        let value = clamp_progress(value);
        let previous = {
            let mut shared = self.inner.shared.lock().await;
            shared
                .cache
                .project_mut(project_id)
                .map(|project| std::mem::replace(&mut project.progress, value))
        };

        let engine = self.clone();
        let id = project_id.to_string();
        self.inner.timers.schedule(
            TimerKey::Progress(id.clone()),
            self.inner.config.progress_debounce,
            async move { engine.write_progress(id, value, previous).await },
        );
        value
    }

    async fn write_progress(&self, project_id: String, value: u8, previous: Option<u8>) {
        let result = self
            .tracked(
                self.inner
                    .api
                    .update_project(&project_id, &UpdateProject::progress(value)),
            )
            .await;
        let mut shared = self.inner.shared.lock().await;
        let Some(project) = shared.cache.project_mut(&project_id) else {
            return;
        };
        // A newer local edit owns the field; leave it alone.
        if project.progress != value {
            return;
        }
        match result {
            Ok(canonical) => project.progress = canonical.progress,
            Err(err) => {
                tracing::warn!("Progress write for project {project_id} failed: {err}");
                if let Some(previous) = previous {
                    project.progress = previous;
                }
            }
        }
    }

    /// Insert a placeholder task at the head of the project's list and
    /// create it on the server after the create window. Returns the
    /// placeholder id.
    pub async fn create_task(
        &self,
        project_id: &str,
        req: CreateTask,
    ) -> Result<String, SyncError> {
        let temp_id = format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4().simple());
        let name = normalize_name(req.name.as_deref(), DEFAULT_TASK_NAME);
        {
            let mut shared = self.inner.shared.lock().await;
            let project = shared
                .cache
                .project_mut(project_id)
                .ok_or_else(|| SyncError::UnknownProject(project_id.to_string()))?;
            project.tasks.insert(
                0,
                Task {
                    id: temp_id.clone(),
                    name: name.clone(),
                    completed: false,
                    project_id: project_id.to_string(),
                    assignee_id: req.assignee_id.clone(),
                    status: req.status.unwrap_or_default(),
                    description: req.description.clone(),
                    comments: Vec::new(),
                },
            );
            project.recompute_progress();
        }

        let req = CreateTask {
            name: Some(name),
            ..req
        };
        let engine = self.clone();
        let (pid, tid) = (project_id.to_string(), temp_id.clone());
        self.inner.timers.schedule(
            TimerKey::CreateTask(temp_id.clone()),
            self.inner.config.create_task_debounce,
            async move { engine.finish_create(pid, tid, req).await },
        );
        Ok(temp_id)
    }

    async fn finish_create(&self, project_id: String, temp_id: String, req: CreateTask) {
        let result = self
            .tracked(self.inner.api.create_task(&project_id, &req))
            .await;
        let mut shared = self.inner.shared.lock().await;
        let orphaned = shared.orphaned.remove(&temp_id);
        match result {
            Ok(task) if orphaned => {
                drop(shared);
                tracing::debug!(
                    "Placeholder {temp_id} was deleted mid-create; removing {}",
                    task.id
                );
                if let Err(err) = self
                    .tracked(self.inner.api.delete_task(&project_id, &task.id))
                    .await
                {
                    tracing::warn!("Failed to remove orphaned task {}: {err}", task.id);
                }
            }
            Ok(task) => {
                let loaded = shared.cache.tasks_loaded(&project_id);
                if let Some(project) = shared.cache.project_mut(&project_id) {
                    if let Some(slot) = project.tasks.iter_mut().find(|t| t.id == temp_id) {
                        *slot = task;
                    } else if loaded && !project.tasks.iter().any(|t| t.id == task.id) {
                        // A reload replaced the list while the create was in flight.
                        project.tasks.insert(0, task);
                    }
                    project.recompute_progress();
                }
            }
            Err(err) => {
                tracing::warn!("Creating task in project {project_id} failed: {err}");
                if let Some(project) = shared.cache.project_mut(&project_id) {
                    project.tasks.retain(|t| t.id != temp_id);
                    project.recompute_progress();
                }
            }
        }
    }

    /// Flip a task's completion and write it immediately.
    ///
    /// A task missing from the cache is marked completed on the server and
    /// the project's tasks are reloaded.
    pub async fn toggle_task(&self, project_id: &str, task_id: &str) -> Result<(), SyncError> {
        if is_placeholder(task_id) {
            return Err(SyncError::PendingCreate(task_id.to_string()));
        }
        let flipped = {
            let mut shared = self.inner.shared.lock().await;
            let before = shared.cache.clone();
            shared
                .cache
                .project_mut(project_id)
                .and_then(|project| {
                    let task = project.tasks.iter_mut().find(|t| t.id == task_id)?;
                    task.completed = !task.completed;
                    let completed = task.completed;
                    project.recompute_progress();
                    Some(completed)
                })
                .map(|completed| (before, completed))
        };

        let Some((before, completed)) = flipped else {
            self.tracked(
                self.inner
                    .api
                    .update_task(project_id, task_id, &UpdateTask::completed(true)),
            )
            .await?;
            return self.load_tasks(project_id).await;
        };

        let result = self
            .tracked(
                self.inner
                    .api
                    .update_task(project_id, task_id, &UpdateTask::completed(completed)),
            )
            .await;
        if let Err(err) = result {
            tracing::warn!("Toggling task {task_id} failed, restoring previous state: {err}");
            self.inner.shared.lock().await.cache = before;
            return Err(err.into());
        }
        Ok(())
    }

    /// Assign (or with `None`, unassign) a task. The write is debounced per
    /// task; a failed write is logged and the optimistic value stays until
    /// the next reload.
    pub async fn assign_task(
        &self,
        project_id: &str,
        task_id: &str,
        assignee_id: Option<String>,
    ) -> Result<(), SyncError> {
        if is_placeholder(task_id) {
            return Err(SyncError::PendingCreate(task_id.to_string()));
        }
        if let Some(task) = self
            .inner
            .shared
            .lock()
            .await
            .cache
            .task_mut(project_id, task_id)
        {
            task.assignee_id = assignee_id.clone();
        }

        let engine = self.clone();
        let (pid, tid) = (project_id.to_string(), task_id.to_string());
        self.inner.timers.schedule(
            TimerKey::Assign(pid.clone(), tid.clone()),
            self.inner.config.assign_debounce,
            async move { engine.write_assignment(pid, tid, assignee_id).await },
        );
        Ok(())
    }

    async fn write_assignment(
        &self,
        project_id: String,
        task_id: String,
        assignee_id: Option<String>,
    ) {
        let result = self
            .tracked(
                self.inner
                    .api
                    .update_task(&project_id, &task_id, &UpdateTask::assign(assignee_id)),
            )
            .await;
        match result {
            Ok(task) => {
                let mut shared = self.inner.shared.lock().await;
                if let Some(project) = shared.cache.project_mut(&project_id) {
                    if let Some(slot) = project.tasks.iter_mut().find(|t| t.id == task_id) {
                        *slot = task;
                    }
                    project.recompute_progress();
                }
            }
            Err(err) => {
                tracing::warn!("Assigning task {task_id} failed; keeping local value: {err}");
            }
        }
    }

    /// Remove a task locally, then on the server; reinsert it at its old
    /// position if the server refuses.
    ///
    /// Deleting a placeholder cancels its pending create. If the create has
    /// already been sent, the created task is deleted when it comes back.
    pub async fn delete_task(&self, project_id: &str, task_id: &str) -> Result<(), SyncError> {
        let removed = {
            let mut shared = self.inner.shared.lock().await;
            let removed = shared.cache.project_mut(project_id).and_then(|project| {
                let index = project.tasks.iter().position(|t| t.id == task_id)?;
                let task = project.tasks.remove(index);
                project.recompute_progress();
                Some((index, task))
            });
            if is_placeholder(task_id) {
                let cancelled = self
                    .inner
                    .timers
                    .cancel(&TimerKey::CreateTask(task_id.to_string()));
                if !cancelled && removed.is_some() {
                    shared.orphaned.insert(task_id.to_string());
                }
                return Ok(());
            }
            removed
        };

        let result = self
            .tracked(self.inner.api.delete_task(project_id, task_id))
            .await;
        if let Err(err) = result {
            // The pending assignment stays armed for the restored task.
            tracing::warn!("Deleting task {task_id} failed, restoring it: {err}");
            if let Some((index, task)) = removed {
                let mut shared = self.inner.shared.lock().await;
                if let Some(project) = shared.cache.project_mut(project_id) {
                    let index = index.min(project.tasks.len());
                    project.tasks.insert(index, task);
                    project.recompute_progress();
                }
            }
            return Err(err.into());
        }
        self.inner
            .timers
            .cancel(&TimerKey::Assign(project_id.to_string(), task_id.to_string()));
        Ok(())
    }

    /// Remove a project locally, then on the server; restore it on failure.
    /// A pending progress write is dropped only once the server confirms.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), SyncError> {
        let removed = {
            let mut shared = self.inner.shared.lock().await;
            let cache = &mut shared.cache;
            cache
                .projects
                .iter()
                .position(|p| p.id == project_id)
                .map(|index| {
                    let project = cache.projects.remove(index);
                    let loaded = cache.tasks_loaded.remove(project_id);
                    (index, project, loaded)
                })
        };

        let result = self
            .tracked(self.inner.api.delete_project(project_id))
            .await;
        if let Err(err) = result {
            tracing::warn!("Deleting project {project_id} failed, restoring it: {err}");
            if let Some((index, project, loaded)) = removed {
                let mut shared = self.inner.shared.lock().await;
                let cache = &mut shared.cache;
                let index = index.min(cache.projects.len());
                cache.projects.insert(index, project);
                if loaded {
                    cache.tasks_loaded.insert(project_id.to_string());
                }
            }
            return Err(err.into());
        }
        self.inner
            .timers
            .cancel(&TimerKey::Progress(project_id.to_string()));
        Ok(())
    }

    pub async fn delete_comment(
        &self,
        project_id: &str,
        task_id: &str,
        comment_id: &str,
    ) -> Result<(), SyncError> {
        let removed = {
            let mut shared = self.inner.shared.lock().await;
            shared
                .cache
                .task_mut(project_id, task_id)
                .and_then(|task| {
                    let index = task.comments.iter().position(|c| c.id == comment_id)?;
                    Some((index, task.comments.remove(index)))
                })
        };

        let result = self
            .tracked(self.inner.api.delete_comment(project_id, task_id, comment_id))
            .await;
        if let Err(err) = result {
            tracing::warn!("Deleting comment {comment_id} failed, restoring it: {err}");
            if let Some((index, comment)) = removed {
                let mut shared = self.inner.shared.lock().await;
                if let Some(task) = shared.cache.task_mut(project_id, task_id) {
                    let index = index.min(task.comments.len());
                    task.comments.insert(index, comment);
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Create a project, then reload everything.
    pub async fn add_project(&self, req: CreateProject) -> Result<Project, SyncError> {
        let project = self
            .tracked(self.inner.api.create_project(&req))
            .await?;
        self.load_all().await?;
        Ok(project)
    }

    /// Switch auto-progress on or off, then reload everything so the
    /// server's recomputed progress shows.
    pub async fn toggle_auto_progress(&self, project_id: &str, on: bool) -> Result<(), SyncError> {
        self.tracked(
            self.inner
                .api
                .update_project(project_id, &UpdateProject::auto_progress(on)),
        )
        .await?;
        self.load_all().await
    }

    pub async fn add_team_member(&self, name: &str) -> Result<TeamMember, SyncError> {
        let member = self.tracked(self.inner.api.create_member(name)).await?;
        self.load_all().await?;
        Ok(member)
    }

    pub async fn rename_team_member(&self, id: &str, name: &str) -> Result<TeamMember, SyncError> {
        let member = self.tracked(self.inner.api.rename_member(id, name)).await?;
        let mut shared = self.inner.shared.lock().await;
        if let Some(slot) = shared.cache.team.iter_mut().find(|m| m.id == id) {
            *slot = member.clone();
        }
        Ok(member)
    }

    /// Remove a member locally, then on the server; restore on failure.
    /// Tasks assigned to the member keep the dangling id.
    pub async fn delete_team_member(&self, id: &str) -> Result<(), SyncError> {
        let removed = {
            let mut shared = self.inner.shared.lock().await;
            let team = &mut shared.cache.team;
            team.iter()
                .position(|m| m.id == id)
                .map(|index| (index, team.remove(index)))
        };

        let result = self.tracked(self.inner.api.delete_member(id)).await;
        if let Err(err) = result {
            tracing::warn!("Deleting team member {id} failed, restoring it: {err}");
            if let Some((index, member)) = removed {
                let mut shared = self.inner.shared.lock().await;
                let team = &mut shared.cache.team;
                let index = index.min(team.len());
                team.insert(index, member);
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Write status and/or description, then take both from the server's
    /// answer. `Some(None)` clears the description.
    pub async fn update_task_details(
        &self,
        project_id: &str,
        task_id: &str,
        status: Option<TaskStatus>,
        description: Option<Option<String>>,
    ) -> Result<Task, SyncError> {
        if is_placeholder(task_id) {
            return Err(SyncError::PendingCreate(task_id.to_string()));
        }
        let req = UpdateTask {
            status,
            description,
            ..UpdateTask::default()
        };
        let task = self
            .tracked(self.inner.api.update_task(project_id, task_id, &req))
            .await?;
        let mut shared = self.inner.shared.lock().await;
        if let Some(slot) = shared.cache.task_mut(project_id, task_id) {
            slot.status = task.status;
            slot.description = task.description.clone();
        }
        Ok(task)
    }

    /// Post a comment and append the server's copy to the cached task.
    pub async fn add_comment(
        &self,
        project_id: &str,
        task_id: &str,
        text: &str,
    ) -> Result<Comment, SyncError> {
        if is_placeholder(task_id) {
            return Err(SyncError::PendingCreate(task_id.to_string()));
        }
        let comment = self
            .tracked(self.inner.api.add_comment(project_id, task_id, text))
            .await?;
        let mut shared = self.inner.shared.lock().await;
        if let Some(task) = shared.cache.task_mut(project_id, task_id) {
            task.comments.push(comment.clone());
        }
        Ok(comment)
    }
}
