#![allow(clippy::unwrap_used, clippy::expect_used)]
//! The sync engine against a real server on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use taskboard_client::{HttpApi, SyncEngine, TaskboardApi};
use taskboard_protocol::requests::{CreateProject, CreateTask, LoginRequest, RegisterRequest};
use taskboard_server::AppState;
use taskboard_server::config::ServerConfig;
use taskboard_server::db::Database;
use tokio::sync::oneshot;

struct Harness {
    base: String,
    _dir: tempfile::TempDir,
    _shutdown: oneshot::Sender<()>,
}

async fn start_server() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ServerConfig {
        database: dir.path().join("e2e.db"),
        jwt_secret: "end-to-end-secret".to_string(),
        jwt_expires_in: Duration::from_secs(600),
        ..ServerConfig::default()
    };
    let db = Database::open(&config.database).expect("open database");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let (tx, rx) = oneshot::channel::<()>();
    let state = AppState::new(db, &config);
    tokio::spawn(async move {
        taskboard_server::serve(listener, state, async move {
            let _ = rx.await;
        })
        .await
        .expect("serve");
    });
    Harness {
        base,
        _dir: dir,
        _shutdown: tx,
    }
}

async fn signed_in(base: &str) -> Arc<HttpApi> {
    let api = Arc::new(HttpApi::new(base));
    api.register(&RegisterRequest {
        email: "grace@example.com".to_string(),
        password: "hopper1".to_string(),
        name: "Grace".to_string(),
    })
    .await
    .expect("register");
    api
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn register_login_me_over_http() {
    let harness = start_server().await;
    let api = signed_in(&harness.base).await;
    let me = api.me().await.expect("me");
    assert_eq!(me.email, "grace@example.com");

    api.logout();
    assert!(api.list_projects().await.is_err());

    let auth = api
        .login(&LoginRequest {
            email: "grace@example.com".to_string(),
            password: "hopper1".to_string(),
        })
        .await
        .expect("login");
    assert_eq!(auth.user.id, me.id);
    assert!(api.health().await.expect("health").ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimistic_edits_converge_with_the_server() {
    let harness = start_server().await;
    let api = signed_in(&harness.base).await;
    let engine = SyncEngine::new(api.clone());
    engine.load_all().await.expect("load");
    assert!(engine.snapshot().await.initial_load);

    let launch = engine
        .add_project(CreateProject {
            name: Some("Launch".to_string()),
            tags: Some(vec!["q3".to_string(), "web".to_string()]),
            ..CreateProject::default()
        })
        .await
        .expect("project");
    engine.ensure_tasks(&launch.id).await.expect("tasks");

    for name in ["a", "b"] {
        engine
            .create_task(
                &launch.id,
                CreateTask {
                    name: Some(name.to_string()),
                    ..CreateTask::default()
                },
            )
            .await
            .expect("placeholder");
    }
    engine.settle().await;

    let cached = engine.project(&launch.id).await.expect("cached");
    assert_eq!(cached.tasks.len(), 2);
    assert!(cached.tasks.iter().all(|t| !t.id.starts_with("temp_")));

    let first = cached.tasks[0].id.clone();
    engine.toggle_task(&launch.id, &first).await.expect("toggle");
    assert_eq!(engine.project(&launch.id).await.map(|p| p.progress), Some(50));

    engine.load_all().await.expect("reload");
    let server_side = engine.project(&launch.id).await.expect("reloaded");
    assert_eq!(server_side.progress, 50);
    assert_eq!(server_side.tags, vec!["q3".to_string(), "web".to_string()]);

    engine
        .toggle_auto_progress(&launch.id, false)
        .await
        .expect("manual");
    engine.set_progress(&launch.id, 10.0).await;
    engine.set_progress(&launch.id, 75.0).await;
    engine.settle().await;
    let reloaded = api.list_projects().await.expect("list");
    assert_eq!(reloaded[0].progress, 75);

    engine.delete_project(&launch.id).await.expect("delete");
    assert!(api.list_projects().await.expect("list").is_empty());
    assert!(!engine.is_loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn comments_and_team_round_trip() {
    let harness = start_server().await;
    let api = signed_in(&harness.base).await;
    let engine = SyncEngine::new(api.clone());

    let project = engine
        .add_project(CreateProject {
            name: Some("Docs".to_string()),
            ..CreateProject::default()
        })
        .await
        .expect("project");
    let task = api
        .create_task(&project.id, &CreateTask::default())
        .await
        .expect("task");
    engine.load_tasks(&project.id).await.expect("tasks");

    let note = engine
        .add_comment(&project.id, &task.id, "  first draft ")
        .await
        .expect("comment");
    assert_eq!(note.text, "first draft");
    assert!(note.author_id.is_some());
    engine
        .delete_comment(&project.id, &task.id, &note.id)
        .await
        .expect("delete comment");
    let tasks = api.list_tasks(&project.id).await.expect("tasks");
    assert!(tasks[0].comments.is_empty());

    let member = engine.add_team_member("Linus").await.expect("member");
    engine
        .assign_task(&project.id, &task.id, Some(member.id.clone()))
        .await
        .expect("assign");
    engine.settle().await;
    let tasks = api.list_tasks(&project.id).await.expect("tasks");
    assert_eq!(tasks[0].assignee_id.as_deref(), Some(member.id.as_str()));

    engine.delete_team_member(&member.id).await.expect("remove");
    engine.load_tasks(&project.id).await.expect("reload");
    let snapshot = engine.snapshot().await;
    assert!(snapshot.team.is_empty());
    assert_eq!(
        snapshot
            .task(&project.id, &task.id)
            .and_then(|t| t.assignee_id.clone()),
        Some(member.id)
    );
}
