use axum::http::{header, HeaderMap};

use crate::error::AppError;

/// Strict origin check for state-changing requests. The `Origin` header must
/// match the single configured allowed origin; a missing header fails the
/// same way a wrong one does.
pub fn verify_request_origin(headers: &HeaderMap, allowed_origin: &str) -> Result<(), AppError> {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

    match origin {
        Some(origin)
            if origin.trim_end_matches('/') == allowed_origin.trim_end_matches('/') =>
        {
            Ok(())
        }
        _ => Err(AppError::OriginMismatch("Invalid origin".to_string())),
    }
}
