//! Store-marker rate gate for the email-sending endpoints.
//!
//! Registration and login both send mail, so each successful attempt arms a
//! marker scoped to (action, client ip, email). While the marker lives,
//! repeats are rejected; it expires on its own after the configured window.

use std::sync::Arc;

use crate::config::Config;
use crate::db::store::{KeyValueStore, StoreError};
use crate::error::AppError;

/// Actions gated by a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAction {
    Register,
    Login,
}

impl RateAction {
    fn as_str(&self) -> &'static str {
        match self {
            RateAction::Register => "register",
            RateAction::Login => "login",
        }
    }
}

pub struct RateLimitService {
    store: Arc<dyn KeyValueStore>,
    config: Config,
}

impl RateLimitService {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        Self { store, config }
    }

    fn marker_key(action: RateAction, ip: &str, email: &str) -> String {
        format!("{}RateLimit_{}_{}", action.as_str(), ip, email)
    }

    /// Rejects while a marker from a recent successful attempt is alive.
    pub async fn check(&self, action: RateAction, ip: &str, email: &str) -> Result<(), AppError> {
        if self
            .store
            .exists(&Self::marker_key(action, ip, email))
            .await?
        {
            return Err(AppError::RateLimited(
                "Too many requests. Please try again later.".to_string(),
            ));
        }
        Ok(())
    }

    /// Arms the marker once the gated action has succeeded.
    pub async fn mark(&self, action: RateAction, ip: &str, email: &str) -> Result<(), StoreError> {
        self.store
            .set_ex(
                &Self::marker_key(action, ip, email),
                "1",
                self.config.rate_limit_marker_seconds,
            )
            .await
    }
}
