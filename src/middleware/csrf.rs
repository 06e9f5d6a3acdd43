use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    state::AppState,
    utils::{
        jwt::{CsrfClaims, TokenKind},
        security::verify_request_origin,
    },
};

const CSRF_HEADERS: [&str; 3] = ["x-csrf-token", "csrf-token", "x-xsrf-token"];

fn csrf_token_from_headers(headers: &HeaderMap) -> Option<String> {
    CSRF_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
}

/// Rejects state-changing cross-site requests.
///
/// Safe methods pass untouched. Everything else must carry the configured
/// `Origin` and a CSRF token signed by this server; both checks fail closed.
pub async fn csrf_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    verify_request_origin(request.headers(), &state.config.allowed_origin)?;

    let token = csrf_token_from_headers(request.headers())
        .ok_or_else(|| AppError::CsrfTokenMissing("CSRF token missing".to_string()))?;

    let claims: CsrfClaims = state
        .codec
        .verify(&token, TokenKind::Csrf)
        .map_err(|_| AppError::CsrfTokenInvalid("CSRF token invalid".to_string()))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::memory::MemoryStore;
    use crate::repositories::users::MockUserStore;
    use crate::utils::email::EmailService;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockUserStore::new()),
            Arc::new(EmailService::disabled()),
            Config::test_default(),
        )
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/mutate", post(|| async { "ok" }))
            .route("/read", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
            .with_state(state)
    }

    async fn status_and_code(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        (status, json["code"].as_str().unwrap_or_default().to_owned())
    }

    async fn signed_token(state: &AppState) -> String {
        let user_id = Uuid::new_v4();
        let seed = state.csrf.issue_seed(user_id).await.unwrap();
        state.csrf.exchange_seed(user_id, &seed).await.unwrap()
    }

    #[tokio::test]
    async fn get_requests_pass_without_origin_or_token() {
        let state = test_state();
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/read")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_without_origin_is_rejected() {
        let state = test_state();
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        let (status, code) = status_and_code(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "ORIGIN_MISMATCH");
    }

    #[tokio::test]
    async fn post_without_token_is_rejected() {
        let state = test_state();
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        let (status, code) = status_and_code(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "CSRF_TOKEN_MISSING");
    }

    #[tokio::test]
    async fn post_with_garbage_token_is_rejected() {
        let state = test_state();
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header("X-CSRF-Token", "not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        let (status, code) = status_and_code(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "CSRF_TOKEN_INVALID");
    }

    #[tokio::test]
    async fn post_with_exchanged_token_passes() {
        let state = test_state();
        let token = signed_token(&state).await;
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header("CSRF-Token", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn x_csrf_token_takes_precedence_over_fallback_headers() {
        let state = test_state();
        let token = signed_token(&state).await;
        // The valid token rides a fallback header; the primary header wins
        // and its garbage value must be the one verified.
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header("X-CSRF-Token", "not-a-jwt")
                    .header("CSRF-Token", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        let (status, code) = status_and_code(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "CSRF_TOKEN_INVALID");
    }

    #[tokio::test]
    async fn mismatched_origin_is_rejected() {
        let state = test_state();
        let token = signed_token(&state).await;
        let response = test_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/mutate")
                    .header(header::ORIGIN, "http://evil.example")
                    .header("X-CSRF-Token", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call");
        let (status, code) = status_and_code(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "ORIGIN_MISMATCH");
    }
}
