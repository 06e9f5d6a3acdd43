#![allow(dead_code)]
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, HeaderMap, Method, Request};
use axum::response::Response;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use gatekeeper::{
    app,
    config::Config,
    db::memory::MemoryStore,
    error::AppError,
    models::user::User,
    repositories::users::UserStore,
    state::AppState,
    utils::{email::EmailService, password::hash_password},
};

/// In-memory user table. The API tests never touch Postgres; this enforces
/// the same unique-email rule the real table does.
#[derive(Default)]
pub struct TestUsers {
    rows: Mutex<HashMap<Uuid, User>>,
}

impl TestUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.rows
            .lock()
            .expect("lock users")
            .insert(user.id, user);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("lock users").len()
    }
}

#[async_trait]
impl UserStore for TestUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.rows.lock().expect("lock users").get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .rows
            .lock()
            .expect("lock users")
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let mut rows = self.rows.lock().expect("lock users");
        if rows.values().any(|existing| existing.email == user.email) {
            return Err(AppError::Conflict("User already exists!".to_string()));
        }
        rows.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub users: Arc<TestUsers>,
}

/// Full application over the in-process store, a fixed test config, and a
/// mailer that never connects anywhere.
pub fn test_app() -> TestApp {
    let users = Arc::new(TestUsers::new());
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        users.clone(),
        Arc::new(EmailService::disabled()),
        Config::test_default(),
    );
    let router = app(state.clone()).layer(MockConnectInfo(SocketAddr::from((
        [127, 0, 0, 1],
        9000,
    ))));
    TestApp {
        state,
        router,
        users,
    }
}

pub fn seed_registered_user(app: &TestApp, name: &str, email: &str, password: &str) -> User {
    let user = User::new(
        name.to_string(),
        email.to_string(),
        hash_password(password).expect("hash password"),
    );
    app.users.insert(user.clone());
    user
}

pub struct RequestBuilder {
    method: Method,
    uri: String,
    body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn post(uri: &str) -> Self {
        Self {
            method: Method::POST,
            uri: uri.to_string(),
            body: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.to_string(),
            body: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn forwarded_for(self, ip: &str) -> Self {
        self.header("x-forwarded-for", ip)
    }

    pub fn origin(self, origin: &str) -> Self {
        self.header("origin", origin)
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }
        match self.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        }
    }
}

/// Drives the two-factor login against the full router and returns the
/// issued cookie values (access, refresh, csrf seed). The OTP is read out
/// of the store, where the mailer would have found it.
pub async fn login_through_otp(
    app: &TestApp,
    email: &str,
    password: &str,
    ip: &str,
) -> (String, String, String) {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    let login = app
        .router
        .clone()
        .oneshot(
            RequestBuilder::post("/api/v1/login")
                .forwarded_for(ip)
                .json(serde_json::json!({"email": email, "password": password}))
                .build(),
        )
        .await
        .expect("login");
    assert_eq!(login.status(), StatusCode::OK);

    let otp = app
        .state
        .store
        .get(&format!("otp_{}", email))
        .await
        .expect("store")
        .expect("otp stored");

    let verify = app
        .router
        .clone()
        .oneshot(
            RequestBuilder::post("/api/v1/verify-otp")
                .json(serde_json::json!({"email": email, "otp": otp}))
                .build(),
        )
        .await
        .expect("verify otp");
    assert_eq!(verify.status(), StatusCode::OK);

    let headers = verify.headers().clone();
    (
        extract_set_cookie_value(&headers, "accessToken").expect("access cookie"),
        extract_set_cookie_value(&headers, "refreshToken").expect("refresh cookie"),
        extract_set_cookie_value(&headers, "csrf_seed").expect("seed cookie"),
    )
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body")
}

/// Value of the named cookie from the response's Set-Cookie headers, or
/// `None` when absent or set to empty (cleared).
pub fn extract_set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .find_map(|value| {
            let value = value.to_str().ok()?;
            let token = value.strip_prefix(&prefix)?.split(';').next()?.trim();
            if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            }
        })
}

/// True when the response clears the named cookie (empty value, max-age 0).
pub fn clears_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{name}=");
    headers.get_all(header::SET_COOKIE).iter().any(|value| {
        value
            .to_str()
            .ok()
            .and_then(|raw| raw.strip_prefix(&prefix))
            .map(|rest| rest.starts_with(';') && rest.contains("Max-Age=0"))
            .unwrap_or(false)
    })
}
