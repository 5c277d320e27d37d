#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use student_panel::auth::{CookieSigner, CredentialVerifier, Gate, SessionStore, SESSION_COOKIE};
use student_panel::models::{NewStudent, Student};
use student_panel::store::{MemoryStore, StoreError, StudentStore};
use student_panel::students::Students;
use student_panel::{app, AppState};

pub const SECRET: &[u8] = b"integration-test-secret-0123456789";

/// The operator account used across the tests.
pub struct FixedPair;

impl CredentialVerifier for FixedPair {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == "admin" && password == "123"
    }
}

/// Store whose remote end is always down.
pub struct Unreachable;

#[async_trait]
impl StudentStore for Unreachable {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "upstream down".into(),
        })
    }

    async fn insert(&self, _: &NewStudent) -> Result<Student, StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "upstream down".into(),
        })
    }

    async fn update(&self, _: i64, _: &NewStudent) -> Result<Option<Student>, StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "upstream down".into(),
        })
    }

    async fn delete(&self, _: i64) -> Result<bool, StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "upstream down".into(),
        })
    }
}

/// Store that blows up inside every call.
pub struct Panicking;

#[async_trait]
impl StudentStore for Panicking {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        panic!("list exploded")
    }

    async fn insert(&self, _: &NewStudent) -> Result<Student, StoreError> {
        panic!("insert exploded")
    }

    async fn update(&self, _: i64, _: &NewStudent) -> Result<Option<Student>, StoreError> {
        panic!("update exploded")
    }

    async fn delete(&self, _: i64) -> Result<bool, StoreError> {
        panic!("delete exploded")
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub memory: Arc<MemoryStore>,
}

fn state_with(store: Arc<dyn StudentStore>) -> AppState {
    let gate = Gate::new(
        Arc::new(FixedPair),
        SessionStore::new(Duration::minutes(30)),
        CookieSigner::new(SECRET).unwrap(),
        false,
    );
    AppState::new(Students::new(store), gate)
}

impl TestApp {
    pub fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let mut app = Self::with_store(memory.clone());
        app.memory = memory;
        app
    }

    /// App over an arbitrary store; `memory` is then a detached empty store.
    pub fn with_store(store: Arc<dyn StudentStore>) -> Self {
        let state = state_with(store);
        Self {
            router: app(state.clone()),
            state,
            memory: Arc::new(MemoryStore::new()),
        }
    }

    pub async fn stored_sessions(&self) -> usize {
        self.state.gate.sessions().len().await
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Logs in as the operator and returns the `Cookie` header value to use.
    pub async fn login(&self) -> String {
        let res = self
            .send(form_request("/login", None, "username=admin&password=123"))
            .await;
        assert!(res.status().is_redirection(), "login failed: {}", res.status());
        session_cookie(&res).expect("login sets a session cookie")
    }
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn form_request(uri: &str, cookie: Option<&str>, body: &'static str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// `name=value` part of the session cookie set by a response, if any.
pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
