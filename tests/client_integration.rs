//! Purpose: End-to-end tests for the client against a stub BaasBox backend.
//! Exports: None (integration test module).
//! Role: Validate header interception, session lifecycle, and error pass-through.
//! Invariants: Uses a loopback-only stub server and temp session files.
//! Invariants: Every request the stub sees is recorded for assertions.

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use baasbox::api::{
    APPCODE_HEADER, Client, ClientConfig, ErrorKind, Permission, SESSION_HEADER,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
struct Recorded {
    method: String,
    path: String,
    query: Option<String>,
    appcode: Option<String>,
    session: Option<String>,
}

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

struct StubServer {
    base_url: String,
    state: StubState,
}

impl StubServer {
    fn start() -> TestResult<Self> {
        let state = StubState::default();
        let app = app(state.clone());
        let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind");
                let addr = listener.local_addr().expect("addr");
                tx.send(addr).expect("send addr");
                axum::serve(listener, app).await.expect("serve");
            });
        });
        let addr = rx.recv_timeout(Duration::from_secs(5))?;
        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
        })
    }

    fn client(&self, dir: &std::path::Path) -> TestResult<Client> {
        let config = ClientConfig::new(&self.base_url, "app-1")?;
        Ok(Client::with_session_path(config, dir.join("session.json")))
    }

    fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().expect("lock").clone()
    }

    fn last_request(&self) -> Recorded {
        self.requests().last().cloned().expect("at least one request")
    }
}

fn app(state: StubState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route(
            "/document/:collection",
            get(list_documents).post(create_document),
        )
        .route("/document/:collection/count", get(count_documents))
        .route(
            "/document/:collection/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route(
            "/document/:collection/:id/:permission/user/:username",
            put(grant_document),
        )
        .route("/follow/:username", post(follow))
        .layer(axum::middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(
    axum::extract::State(state): axum::extract::State<StubState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let recorded = Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        appcode: header_value(request.headers(), APPCODE_HEADER),
        session: header_value(request.headers(), SESSION_HEADER),
    };
    state.requests.lock().expect("lock").push(recorded);
    next.run(request).await
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"result": "ok", "data": data, "http_code": 200}))
}

fn not_found(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "result": "error",
            "message": message,
            "bb_code": "51001",
            "http_code": 404
        })),
    )
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    appcode: String,
}

async fn login(Form(form): Form<LoginForm>) -> axum::response::Response {
    if form.password != "secret" || form.appcode.is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "result": "error",
                "message": "invalid credentials",
                "http_code": 401
            })),
        )
            .into_response();
    }
    ok(json!({
        "user": {
            "name": form.username,
            "roles": [{"name": "registered"}]
        },
        "X-BB-SESSION": "tok-123",
        "visibleByTheUser": true
    }))
    .into_response()
}

async fn logout() -> Json<Value> {
    ok(json!("ok"))
}

async fn me() -> Json<Value> {
    ok(json!({"user": {"name": "alice", "status": "ACTIVE"}}))
}

async fn list_documents(Path(collection): Path<String>) -> Json<Value> {
    ok(json!([{"id": "doc-1", "collection": collection}]))
}

async fn count_documents(Path(_collection): Path<String>) -> Json<Value> {
    ok(json!({"count": 3}))
}

async fn get_document(Path((collection, id)): Path<(String, String)>) -> axum::response::Response {
    if id == "missing" {
        return not_found("document not found").into_response();
    }
    ok(json!({"id": id, "collection": collection, "title": "hello"})).into_response()
}

async fn create_document(
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> Json<Value> {
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!("doc-1"));
        object.insert("collection".to_string(), json!(collection));
    }
    ok(body)
}

async fn update_document(
    Path((_collection, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Json<Value> {
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!(id));
    }
    ok(body)
}

async fn delete_document(Path((_collection, _id)): Path<(String, String)>) -> Json<Value> {
    ok(json!(""))
}

async fn grant_document(
    Path((_collection, _id, _permission, _username)): Path<(String, String, String, String)>,
) -> Json<Value> {
    ok(json!(""))
}

async fn follow(Path(username): Path<String>) -> Json<Value> {
    ok(json!({"user": {"name": username}}))
}

#[test]
fn login_attaches_session_to_subsequent_requests() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let session = client.login("alice", "secret")?;
    assert_eq!(session.username, "alice");
    assert_eq!(session.token, "tok-123");
    assert_eq!(session.roles, vec!["registered"]);

    // the login request itself went out anonymously
    let requests = server.requests();
    let login_request = &requests[0];
    assert_eq!(login_request.path, "/login");
    assert_eq!(login_request.session, None);
    assert_eq!(login_request.appcode.as_deref(), Some("app-1"));

    let object = client.load_object("notes", "42")?;
    assert_eq!(object["id"], "42");

    let request = server.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/document/notes/42");
    assert_eq!(request.session.as_deref(), Some("tok-123"));
    assert_eq!(request.appcode.as_deref(), Some("app-1"));
    Ok(())
}

#[test]
fn anonymous_requests_carry_appcode_only() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    client.load_object("notes", "1")?;
    let request = server.last_request();
    assert_eq!(request.appcode.as_deref(), Some("app-1"));
    assert_eq!(request.session, None);
    Ok(())
}

#[test]
fn save_round_trip_creates_then_updates() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let created = client.save("notes", &json!({"title": "first"}))?;
    assert_eq!(created["id"], "doc-1");
    assert_eq!(server.last_request().method, "POST");
    assert_eq!(server.last_request().path, "/document/notes");

    let updated = client.save("notes", &created)?;
    assert_eq!(updated["id"], "doc-1");
    let request = server.last_request();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/document/notes/doc-1");
    Ok(())
}

#[test]
fn logout_clears_session_memory_and_file() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    client.login("alice", "secret")?;
    let session_file = dir.path().join("session.json");
    assert!(session_file.exists());

    client.logout()?;
    assert_eq!(client.current_user(), None);
    assert!(!session_file.exists());

    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/logout");
    assert_eq!(request.session.as_deref(), Some("tok-123"));
    Ok(())
}

#[test]
fn logout_without_session_rejects_without_network() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let err = client.logout().expect_err("err");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(err.message(), Some("user already logged out"));
    assert!(server.requests().is_empty());
    Ok(())
}

#[test]
fn failed_login_leaves_state_anonymous() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let err = client.login("alice", "wrong").expect_err("err");
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(err.status(), Some(401));
    assert_eq!(client.current_user(), None);
    assert!(!dir.path().join("session.json").exists());
    Ok(())
}

#[test]
fn backend_error_body_passes_through_verbatim() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let err = client.load_object("notes", "missing").expect_err("err");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), Some("document not found"));
    let body = err.body().expect("body");
    assert_eq!(body["bb_code"], "51001");
    assert_eq!(body["result"], "error");
    Ok(())
}

#[test]
fn load_collection_pages_with_configured_length() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let config = ClientConfig::new(&server.base_url, "app-1")?.with_page_length(10);
    let client = Client::with_session_path(config, dir.path().join("session.json"));

    let documents = client.load_collection("notes")?;
    assert_eq!(documents.len(), 1);

    let request = server.last_request();
    assert_eq!(request.path, "/document/notes");
    let query = request.query.expect("query");
    assert!(query.contains("page=0"));
    assert!(query.contains("recordsPerPage=10"));
    Ok(())
}

#[test]
fn count_unwraps_the_envelope() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    assert_eq!(client.count("notes")?, 3);
    assert_eq!(server.last_request().path, "/document/notes/count");
    Ok(())
}

#[test]
fn grants_target_the_permission_path() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    client.grant_user_access_to_object("notes", "42", Permission::Read, "bob")?;
    let request = server.last_request();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/document/notes/42/read/user/bob");
    Ok(())
}

#[test]
fn session_survives_a_new_client_on_the_same_file() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;
    client.login("alice", "secret")?;

    let reopened = server.client(dir.path())?;
    let session = reopened.current_user().expect("session");
    assert_eq!(session.username, "alice");
    assert_eq!(session.token, "tok-123");

    reopened.fetch_current_user()?;
    assert_eq!(server.last_request().session.as_deref(), Some("tok-123"));
    Ok(())
}

#[test]
fn plugin_rejects_unknown_methods_before_dispatch() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;

    let err = client
        .call_plugin("stats.echo", "PATCH", None)
        .expect_err("err");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(server.requests().is_empty());
    Ok(())
}

#[test]
fn follow_targets_the_follow_path() -> TestResult<()> {
    let server = StubServer::start()?;
    let dir = tempfile::tempdir()?;
    let client = server.client(dir.path())?;
    client.login("alice", "secret")?;

    let followed = client.follow("bob")?;
    assert_eq!(followed["user"]["name"], "bob");
    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/follow/bob");
    Ok(())
}
