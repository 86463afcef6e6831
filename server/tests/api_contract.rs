#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end contract tests: a real server on an ephemeral port over a
//! temporary SQLite file, driven through reqwest.

use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use taskboard_server::AppState;
use taskboard_server::config::ServerConfig;
use taskboard_server::db::Database;
use tokio::sync::oneshot;

struct TestServer {
    base: String,
    http: reqwest::Client,
    token: Option<String>,
    _dir: tempfile::TempDir,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            database: dir.path().join("taskboard.db"),
            jwt_secret: "contract-test-secret".to_string(),
            jwt_expires_in: Duration::from_secs(3_600),
            ..ServerConfig::default()
        };
        let db = Database::open(&config.database).expect("open database");
        let listener = tokio::net::TcpListener::bind(&config.bind)
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel::<()>();
        let state = AppState::new(db, &config);
        tokio::spawn(async move {
            taskboard_server::serve(listener, state, async move {
                let _ = rx.await;
            })
            .await
            .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            token: None,
            _dir: dir,
            _shutdown: tx,
        }
    }

    /// Start a server and register a user whose token is used for every
    /// subsequent call.
    async fn start_authed() -> Self {
        let mut server = Self::start().await;
        let (status, body) = server
            .call(
                "POST",
                "/auth/register",
                Some(json!({ "email": "owner@example.com", "password": "secret1", "name": "Owner" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        server.token = Some(body["token"].as_str().unwrap().to_string());
        server
    }

    async fn call(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
        let mut req = self.http.request(method, format!("{}{path}", self.base));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.expect("send");
        let status = resp.status();
        let text = resp.text().await.expect("body");
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|e| panic!("parse {text}: {e}"))
        };
        (status, value)
    }

    async fn create_project(&self, body: Value) -> Value {
        let (status, project) = self.call("POST", "/projects", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{project}");
        project
    }

    async fn create_task(&self, project_id: &str, body: Value) -> Value {
        let (status, task) = self
            .call("POST", &format!("/projects/{project_id}/tasks"), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{task}");
        task
    }

    async fn project(&self, id: &str) -> Value {
        let (status, project) = self
            .call("PUT", &format!("/projects/{id}"), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::OK, "{project}");
        project
    }
}

#[tokio::test]
async fn register_login_me() {
    let mut server = TestServer::start().await;

    let (status, body) = server
        .call(
            "POST",
            "/auth/register",
            Some(json!({ "email": "ada@example.com", "password": "lovelace", "name": "Ada" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["user"].get("passwordHash").is_none());
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .call(
            "POST",
            "/auth/login",
            Some(json!({ "email": "ada@example.com", "password": "lovelace" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    server.token = Some(body["token"].as_str().unwrap().to_string());

    let (status, body) = server.call("GET", "/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn registration_validation() {
    let server = TestServer::start().await;
    let cases = [
        (json!({ "email": "a@b.co", "password": "secret1" }), StatusCode::BAD_REQUEST),
        (json!({ "email": "not-an-email", "password": "secret1", "name": "A" }), StatusCode::BAD_REQUEST),
        (json!({ "email": "a@b.co", "password": "short", "name": "A" }), StatusCode::BAD_REQUEST),
        (json!({ "email": "a@b.co", "password": "secret1", "name": "A" }), StatusCode::CREATED),
        (json!({ "email": "a@b.co", "password": "secret2", "name": "B" }), StatusCode::CONFLICT),
    ];
    for (body, expected) in cases {
        let (status, resp) = server.call("POST", "/auth/register", Some(body.clone())).await;
        assert_eq!(status, expected, "{body} -> {resp}");
        if status != StatusCode::CREATED {
            assert!(resp["error"].is_string(), "{resp}");
        }
    }

    let (status, resp) = server
        .call("POST", "/auth/login", Some(json!({ "email": "a@b.co", "password": "wrong-one" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["error"], "Invalid credentials");

    let (status, _) = server
        .call("POST", "/auth/login", Some(json!({ "email": "nobody@b.co", "password": "secret1" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .call("POST", "/auth/login", Some(json!({ "email": "a@b.co" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let mut server = TestServer::start().await;

    let (status, body) = server.call("GET", "/projects", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    server.token = Some("not.a.token".to_string());
    let (status, body) = server.call("GET", "/team", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    server.token = None;
    let (status, body) = server.call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn launch_project_with_one_of_two_done_reads_fifty() {
    let server = TestServer::start_authed().await;
    let project = server.create_project(json!({ "name": "Launch" })).await;
    let pid = project["id"].as_str().unwrap();
    assert_eq!(project["autoProgress"], true);
    assert_eq!(project["progress"], 0);

    let a = server.create_task(pid, json!({ "name": "a" })).await;
    server.create_task(pid, json!({ "name": "b" })).await;
    let (status, toggled) = server
        .call(
            "PUT",
            &format!("/projects/{pid}/tasks/{}", a["id"].as_str().unwrap()),
            Some(json!({ "completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let (_, projects) = server.call("GET", "/projects", None).await;
    assert_eq!(projects[0]["name"], "Launch");
    assert_eq!(projects[0]["progress"], 50);
    assert_eq!(projects[0]["tasks"], json!([]));
}

#[tokio::test]
async fn auto_progress_tracks_create_toggle_delete() {
    let server = TestServer::start_authed().await;
    let pid = server.create_project(json!({ "name": "P" })).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let a = server.create_task(&pid, json!({ "name": "a" })).await;
    let a_path = format!("/projects/{pid}/tasks/{}", a["id"].as_str().unwrap());
    server
        .call("PUT", &a_path, Some(json!({ "completed": true })))
        .await;
    assert_eq!(server.project(&pid).await["progress"], 100);

    let b = server.create_task(&pid, json!({ "name": "b" })).await;
    let c = server.create_task(&pid, json!({ "name": "c" })).await;
    assert_eq!(server.project(&pid).await["progress"], 33);

    // double toggle restores
    server
        .call("PUT", &a_path, Some(json!({ "completed": false })))
        .await;
    assert_eq!(server.project(&pid).await["progress"], 0);
    server
        .call("PUT", &a_path, Some(json!({ "completed": true })))
        .await;
    assert_eq!(server.project(&pid).await["progress"], 33);

    for t in [&b, &c] {
        let (status, _) = server
            .call(
                "DELETE",
                &format!("/projects/{pid}/tasks/{}", t["id"].as_str().unwrap()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let project = server.project(&pid).await;
    assert_eq!(project["progress"], 100);
    assert_eq!(project["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn manual_progress_is_not_overwritten() {
    let server = TestServer::start_authed().await;
    let pid = server.create_project(json!({ "name": "Manual" })).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, project) = server
        .call(
            "PUT",
            &format!("/projects/{pid}"),
            Some(json!({ "autoProgress": false, "progress": 41.6 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["progress"], 42);

    let t = server.create_task(&pid, json!({ "name": "x" })).await;
    server
        .call(
            "PUT",
            &format!("/projects/{pid}/tasks/{}", t["id"].as_str().unwrap()),
            Some(json!({ "completed": true })),
        )
        .await;
    assert_eq!(server.project(&pid).await["progress"], 42);
}

#[tokio::test]
async fn defaults_and_coercion() {
    let server = TestServer::start_authed().await;
    let project = server
        .create_project(json!({ "name": "   ", "priority": "bogus" }))
        .await;
    assert_eq!(project["name"], "Untitled Project");
    assert_eq!(project["priority"], "medium");
    let pid = project["id"].as_str().unwrap();

    let task = server
        .create_task(pid, json!({ "name": "", "status": "shipped" }))
        .await;
    assert_eq!(task["name"], "Untitled Task");
    assert_eq!(task["status"], "active");
    assert_eq!(task["completed"], false);
    assert_eq!(task["comments"], json!([]));
}

#[tokio::test]
async fn tags_round_trip_in_order() {
    let server = TestServer::start_authed().await;
    let project = server
        .create_project(json!({ "name": "Tagged", "tags": ["z", "a", "m"], "deadline": "2031-05-06" }))
        .await;
    assert_eq!(project["tags"], json!(["z", "a", "m"]));
    assert_eq!(project["deadline"], "2031-05-06");

    let (_, projects) = server.call("GET", "/projects", None).await;
    assert_eq!(projects[0]["tags"], json!(["z", "a", "m"]));

    let (_, cleared) = server
        .call(
            "PUT",
            &format!("/projects/{}", project["id"].as_str().unwrap()),
            Some(json!({ "tags": null, "deadline": null })),
        )
        .await;
    assert_eq!(cleared["tags"], json!([]));
    assert_eq!(cleared["deadline"], Value::Null);
}

#[tokio::test]
async fn project_delete_cascades() {
    let server = TestServer::start_authed().await;
    let pid = server.create_project(json!({ "name": "Doomed" })).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    server.create_task(&pid, json!({ "name": "a" })).await;
    server.create_task(&pid, json!({ "name": "b" })).await;

    let (status, _) = server.call("DELETE", &format!("/projects/{pid}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = server.call("DELETE", &format!("/projects/{pid}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, tasks) = server
        .call("GET", &format!("/projects/{pid}/tasks"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks, json!([]));

    let (status, body) = server
        .call("PUT", &format!("/projects/{pid}"), Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (status, _) = server
        .call("POST", &format!("/projects/{pid}/tasks"), Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_append_and_remove() {
    let server = TestServer::start_authed().await;
    let pid = server.create_project(json!({ "name": "C" })).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let tid = server.create_task(&pid, json!({ "name": "t" })).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let comments_path = format!("/projects/{pid}/tasks/{tid}/comments");

    let (status, body) = server
        .call("POST", &comments_path, Some(json!({ "text": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Comment text is required");

    let (status, first) = server
        .call("POST", &comments_path, Some(json!({ "text": "  first  " })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["text"], "first");
    assert!(first["createdAt"].is_string());
    let (_, second) = server
        .call("POST", &comments_path, Some(json!({ "text": "second" })))
        .await;

    let (status, _) = server
        .call(
            "DELETE",
            &format!("{comments_path}/{}", first["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, tasks) = server
        .call("GET", &format!("/projects/{pid}/tasks"), None)
        .await;
    let remaining = tasks[0]["comments"].as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], second["id"]);

    let (status, _) = server
        .call(
            "POST",
            &format!("/projects/{pid}/tasks/ghost/comments"),
            Some(json!({ "text": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_members_crud() {
    let server = TestServer::start_authed().await;
    let (status, zed) = server.call("POST", "/team", Some(json!({ "name": "Zed" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, unnamed) = server.call("POST", "/team", Some(json!({}))).await;
    assert_eq!(unnamed["name"], "Unnamed Member");

    let (status, renamed) = server
        .call(
            "PUT",
            &format!("/team/{}", zed["id"].as_str().unwrap()),
            Some(json!({ "name": "Ada" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Ada");

    let (_, team) = server.call("GET", "/team", None).await;
    let names: Vec<&str> = team
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ada", "Unnamed Member"]);

    let (status, _) = server
        .call("PUT", "/team/ghost", Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .call("DELETE", &format!("/team/{}", zed["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let server = TestServer::start_authed().await;
    let resp = server
        .http
        .post(format!("{}/projects", server.base))
        .bearer_auth(server.token.as_deref().unwrap())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn cors_allows_the_configured_origin() {
    let server = TestServer::start().await;
    let resp = server
        .http
        .get(format!("{}/health", server.base))
        .header("origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );

    let resp = server
        .http
        .get(format!("{}/health", server.base))
        .header("origin", "http://evil.test")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}
