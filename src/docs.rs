#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    models::user::{LoginPayload, RegisterPayload, UserResponse, VerifyOtpPayload},
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register_doc,
        verify_email_doc,
        login_doc,
        verify_otp_doc,
        refresh_doc,
        refresh_csrf_doc,
        logout_doc,
        profile_doc
    ),
    components(
        schemas(
            RegisterPayload,
            LoginPayload,
            VerifyOtpPayload,
            UserResponse,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Registration, email verification, OTP login"),
        (name = "Session", description = "Token refresh, CSRF exchange, logout, profile")
    ),
    security(("CookieAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        components.add_security_scheme(
            "CookieAuth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("accessToken"))),
        );
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterPayload,
    responses(
        (status = 200, description = "Verification email sent", body = serde_json::Value),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "Auth",
    security(())
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/verify/{token}",
    params(("token" = String, Path, description = "Emailed verification token")),
    responses(
        (status = 201, description = "Account created", body = serde_json::Value),
        (status = 404, description = "Unknown or expired link", body = ErrorResponse)
    ),
    tag = "Auth",
    security(())
)]
fn verify_email_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "OTP emailed", body = serde_json::Value),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/verify-otp",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "Session established, auth cookies set", body = serde_json::Value),
        (status = 401, description = "Wrong or expired OTP", body = ErrorResponse)
    ),
    tag = "Auth",
    security(())
)]
fn verify_otp_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    responses(
        (status = 200, description = "New access token cookie", body = serde_json::Value),
        (status = 401, description = "Refresh rejected", body = ErrorResponse)
    ),
    tag = "Session",
    security(())
)]
fn refresh_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/refresh-csrf",
    responses(
        (status = 200, description = "CSRF token issued, seed cookie cleared", body = serde_json::Value),
        (status = 403, description = "Seed absent or mismatched", body = ErrorResponse)
    ),
    tag = "Session"
)]
fn refresh_csrf_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses(
        (status = 200, description = "Session revoked, cookies cleared", body = serde_json::Value),
        (status = 403, description = "CSRF check failed", body = ErrorResponse)
    ),
    tag = "Session"
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Session"
)]
fn profile_doc() {}
