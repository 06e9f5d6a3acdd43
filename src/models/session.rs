//! Session metadata and the token bundle minted on login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side session metadata, stored as JSON at `session_<sessionId>`.
/// Its presence is part of refresh verification; a refresh whose metadata
/// record is gone is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: Uuid, session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            session_id: session_id.to_string(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Marks the session as used now. Called on successful refresh.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Everything a successful login mints: both tokens plus the session
/// identity they are bound to.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
}
