use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginPayload, RegisterPayload, User, UserResponse, VerifyOtpPayload},
    services::{
        rate_limit::RateAction,
        verification::{OtpOutcome, PendingRegistration},
    },
    state::AppState,
    utils::{
        cookies::{
            build_auth_cookie, build_clear_cookie, extract_cookie_value, CookieOptions,
            ACCESS_COOKIE_NAME, COOKIE_PATH, CSRF_SEED_COOKIE_NAME, REFRESH_COOKIE_NAME,
        },
        password::{hash_password, verify_password},
    },
};

/// Proxy-reported client address wins over the socket peer; the rate
/// marker should key on the real caller, not the load balancer.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn set_cookie_headers(cookies: &[String]) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(cookie).map_err(anyhow::Error::from)?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}

fn cookie_from_request(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, name))
}

/// Starts a registration: parks the pending account and emails a
/// verification link. No user row exists until the link is followed.
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let ip = client_ip(&headers, peer);
    state
        .rate_limit
        .check(RateAction::Register, &ip, &payload.email)
        .await?;

    if state.users.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists!".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let pending = PendingRegistration {
        name: payload.name.clone(),
        email: payload.email.clone(),
        password_hash,
    };
    let token = state.verification.store_pending_registration(&pending).await?;

    state
        .email
        .send_verification_email(&payload.email, &payload.name, &token)
        .await?;
    state
        .rate_limit
        .mark(RateAction::Register, &ip, &payload.email)
        .await?;

    debug!(email = %payload.email, "verification link issued");
    Ok(Json(json!({
        "message": "Verification email sent! Please check your inbox."
    })))
}

/// Finishes a registration from the emailed link. The pending record is
/// consumed on first use; a replayed link finds nothing.
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pending = state
        .verification
        .consume_pending_registration(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("Verification link is expired!".to_string()))?;

    // Two pending registrations can hold the same email; only the first
    // verification may create the account.
    if state.users.find_by_email(&pending.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists!".to_string()));
    }

    let user = User::new(pending.name, pending.email, pending.password_hash);
    let created = state.users.create(&user).await?;

    debug!(user_id = %created.id, "user account created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Email verified successfully!",
            "user": UserResponse::from(created),
        })),
    ))
}

/// First login factor: password check, then an OTP emailed out. No
/// session or cookie is issued here.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let ip = client_ip(&headers, peer);
    state
        .rate_limit
        .check(RateAction::Login, &ip, &payload.email)
        .await?;

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials!".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthenticated("Invalid credentials!".to_string()));
    }

    let otp = state.verification.issue_otp(&payload.email).await?;
    state.email.send_otp_email(&user.email, &user.name, &otp).await?;
    state
        .rate_limit
        .mark(RateAction::Login, &ip, &payload.email)
        .await?;

    debug!(email = %payload.email, "login OTP issued");
    Ok(Json(json!({
        "message": "OTP sent to your email!"
    })))
}

/// Second login factor. A correct code creates the session, which
/// supersedes any session from another device, and sets the auth cookies
/// plus a CSRF seed for later exchange.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    match state.verification.check_otp(&payload.email, &payload.otp).await? {
        OtpOutcome::Valid => {}
        OtpOutcome::Mismatch => {
            return Err(AppError::Unauthenticated("Invalid OTP".to_string()));
        }
        OtpOutcome::Expired => {
            return Err(AppError::Unauthenticated("OTP Expired!".to_string()));
        }
    }

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials!".to_string()))?;

    let issued = state.sessions.create_session(user.id).await?;
    let seed = state.csrf.issue_seed(user.id).await?;

    let options = CookieOptions::from_config(&state.config);
    let cookies = set_cookie_headers(&[
        build_auth_cookie(
            ACCESS_COOKIE_NAME,
            &issued.access_token,
            Duration::from_secs(state.config.access_token_ttl_minutes * 60),
            COOKIE_PATH,
            options,
        ),
        build_auth_cookie(
            REFRESH_COOKIE_NAME,
            &issued.refresh_token,
            Duration::from_secs(state.config.refresh_token_ttl_days * 24 * 60 * 60),
            COOKIE_PATH,
            options,
        ),
        build_auth_cookie(
            CSRF_SEED_COOKIE_NAME,
            &seed,
            Duration::from_secs(state.config.csrf_seed_ttl_minutes * 60),
            COOKIE_PATH,
            options,
        ),
    ])?;

    debug!(user_id = %user.id, session_id = %issued.session_id, "session established");
    let name = user.name.clone();
    Ok((
        cookies,
        Json(json!({
            "message": format!("Welcome {}!", name),
            "user": UserResponse::from(user),
        })),
    ))
}

/// Trades a still-valid refresh token for a fresh access token. Every
/// stored check must pass; one mismatch fails the whole refresh.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = cookie_from_request(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| AppError::Unauthenticated("Refresh token missing".to_string()))?;

    let claims = state.sessions.verify_refresh(&token).await?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthenticated("Malformed token".to_string()))?;

    let access_token = state.sessions.issue_access_token(user_id, &claims.sid)?;

    let options = CookieOptions::from_config(&state.config);
    let cookies = set_cookie_headers(&[build_auth_cookie(
        ACCESS_COOKIE_NAME,
        &access_token,
        Duration::from_secs(state.config.access_token_ttl_minutes * 60),
        COOKIE_PATH,
        options,
    )])?;

    debug!(user_id = %user_id, session_id = %claims.sid, "access token refreshed");
    Ok((
        cookies,
        Json(json!({
            "message": "Token refreshed successfully!"
        })),
    ))
}

/// Exchanges the single-use seed cookie for a signed CSRF token. The seed
/// cookie is cleared only when the exchange succeeds.
pub async fn refresh_csrf(
    State(state): State<AppState>,
    Extension(user): Extension<UserResponse>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let seed = cookie_from_request(&headers, CSRF_SEED_COOKIE_NAME)
        .ok_or_else(|| AppError::Unauthenticated("CSRF seed missing".to_string()))?;

    let csrf_token = state.csrf.exchange_seed(user.id, &seed).await?;

    let options = CookieOptions::from_config(&state.config);
    let cookies = set_cookie_headers(&[build_clear_cookie(
        CSRF_SEED_COOKIE_NAME,
        COOKIE_PATH,
        options,
    )])?;

    debug!(user_id = %user.id, "csrf seed exchanged");
    Ok((
        cookies,
        Json(json!({
            "csrfToken": csrf_token
        })),
    ))
}

/// Revokes the active session and clears every auth cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<UserResponse>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke_session(user.id).await?;

    let options = CookieOptions::from_config(&state.config);
    let cookies = set_cookie_headers(&[
        build_clear_cookie(ACCESS_COOKIE_NAME, COOKIE_PATH, options),
        build_clear_cookie(REFRESH_COOKIE_NAME, COOKIE_PATH, options),
        build_clear_cookie(CSRF_SEED_COOKIE_NAME, COOKIE_PATH, options),
    ])?;

    debug!(user_id = %user.id, "session revoked");
    Ok((
        cookies,
        Json(json!({
            "message": "Logged out successfully!"
        })),
    ))
}

/// The authenticated user, as placed in extensions by the auth layer.
pub async fn profile(
    Extension(user): Extension<UserResponse>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({ "user": user })))
}
