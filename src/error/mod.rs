use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::db::store::StoreError;
use crate::utils::jwt::TokenError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    Unauthenticated(String),
    Expired(String),
    SignatureInvalid(String),
    SessionSuperseded(String),
    OriginMismatch(String),
    SeedMismatch(String),
    CsrfTokenMissing(String),
    CsrfTokenInvalid(String),
    RateLimited(String),
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Validation(Vec<String>),
    StoreUnavailable(anyhow::Error),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "UNAUTHENTICATED".to_string(),
                None,
            ),
            AppError::Expired(msg) => (StatusCode::UNAUTHORIZED, msg, "EXPIRED".to_string(), None),
            AppError::SignatureInvalid(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "SIGNATURE_INVALID".to_string(),
                None,
            ),
            AppError::SessionSuperseded(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "SESSION_SUPERSEDED".to_string(),
                None,
            ),
            AppError::OriginMismatch(msg) => (
                StatusCode::FORBIDDEN,
                msg,
                "ORIGIN_MISMATCH".to_string(),
                None,
            ),
            AppError::SeedMismatch(msg) => (
                StatusCode::FORBIDDEN,
                msg,
                "SEED_MISMATCH".to_string(),
                None,
            ),
            AppError::CsrfTokenMissing(msg) => (
                StatusCode::FORBIDDEN,
                msg,
                "CSRF_TOKEN_MISSING".to_string(),
                None,
            ),
            AppError::CsrfTokenInvalid(msg) => (
                StatusCode::FORBIDDEN,
                msg,
                "CSRF_TOKEN_INVALID".to_string(),
                None,
            ),
            AppError::RateLimited(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                msg,
                "RATE_LIMITED".to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT".to_string(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            AppError::StoreUnavailable(err) => {
                tracing::error!("Ephemeral store unavailable: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::InternalServerError(err.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err.into())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Expired("Token expired".to_string()),
            TokenError::InvalidSignature => {
                AppError::SignatureInvalid("Invalid token signature".to_string())
            }
            TokenError::Malformed => AppError::Unauthenticated("Malformed token".to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn app_error_into_response_maps_status_and_body() {
        let response = AppError::Unauthenticated("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["error"], "nope");
        assert_eq!(json["code"], "UNAUTHENTICATED");

        let response = AppError::SessionSuperseded("superseded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "SESSION_SUPERSEDED");

        let response = AppError::SeedMismatch("Invalid CSRF seed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid CSRF seed");
        assert_eq!(json["code"], "SEED_MISMATCH");

        let response = AppError::RateLimited("Too many requests".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = response_json(response).await;
        assert_eq!(json["code"], "RATE_LIMITED");

        let response = AppError::Conflict("User already exists!".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["error"], "User already exists!");
        assert_eq!(json["code"], "CONFLICT");

        let response = AppError::NotFound("missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn app_error_validation_includes_details() {
        let response = AppError::Validation(vec!["email: invalid".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["details"]["errors"][0], "email: invalid");
    }

    #[tokio::test]
    async fn app_error_internal_maps_to_generic_message() {
        let response = AppError::InternalServerError(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert!(json["details"].is_null());

        let response =
            AppError::StoreUnavailable(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn token_errors_map_to_distinct_variants() {
        let response = AppError::from(TokenError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "EXPIRED");

        let response = AppError::from(TokenError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "SIGNATURE_INVALID");

        let response = AppError::from(TokenError::Malformed).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "UNAUTHENTICATED");
    }
}
