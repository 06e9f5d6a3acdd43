use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::UserResponse,
    state::AppState,
    utils::{
        cookies::{extract_cookie_value, ACCESS_COOKIE_NAME},
        jwt::{SessionClaims, TokenKind},
    },
};

const USER_CACHE_TTL_SECONDS: u64 = 900;

fn user_cache_key(user_id: Uuid) -> String {
    format!("user_{}", user_id)
}

/// Authenticates a request from the `accessToken` cookie.
///
/// A verified signature alone is not enough: the token's session must still
/// be the user's active one, so a stolen token dies the moment its session
/// is superseded or revoked. On success the sanitized user and the claims
/// land in request extensions.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned());

    let token = cookie_header
        .as_deref()
        .and_then(|raw| extract_cookie_value(raw, ACCESS_COOKIE_NAME))
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))?;

    let claims: SessionClaims = state.codec.verify(&token, TokenKind::Access)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthenticated("Malformed token".to_string()))?;

    if !state.sessions.is_session_active(user_id, &claims.sid).await? {
        return Err(AppError::SessionSuperseded(
            "Session is no longer active".to_string(),
        ));
    }

    let user = load_user(&state, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Unknown user".to_string()))?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Sanitized user for the request, via the `user_<id>` store cache with a
/// database fallback. The cache only ever holds the public projection.
async fn load_user(state: &AppState, user_id: Uuid) -> Result<Option<UserResponse>, AppError> {
    let key = user_cache_key(user_id);

    if let Some(json) = state.store.get(&key).await? {
        if let Ok(user) = serde_json::from_str::<UserResponse>(&json) {
            return Ok(Some(user));
        }
        // Unreadable cache entry; drop it and refetch.
        state.store.delete(&key).await?;
    }

    let Some(user) = state.users.find_by_id(user_id).await? else {
        return Ok(None);
    };

    let public = UserResponse::from(user);
    let json = serde_json::to_string(&public).map_err(anyhow::Error::from)?;
    state.store.set_ex(&key, &json, USER_CACHE_TTL_SECONDS).await?;
    Ok(Some(public))
}
