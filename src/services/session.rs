//! Session lifecycle: creation with supersession, refresh verification,
//! access re-issuance and revocation.
//!
//! Every user has at most one active session. The store holds three records
//! per login: the session metadata (`session_<sid>`), the refresh token
//! (`refreshToken_<uid>`) and the active-session pointer
//! (`activeSession_<uid>`). Writes happen in that order, so a request that
//! dies halfway never leaves an authorized pointer without backing state.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use uuid::Uuid;

use crate::config::Config;
use crate::db::store::{KeyValueStore, StoreError};
use crate::error::AppError;
use crate::models::session::{IssuedSession, SessionRecord};
use crate::services::csrf::CsrfService;
use crate::utils::jwt::{SessionClaims, TokenCodec, TokenKind};

const LOCK_TTL_SECONDS: u64 = 5;
const LOCK_RETRY_DELAY_MS: u64 = 50;
const LOCK_RETRY_LIMIT: u32 = 40;

pub struct SessionService {
    store: Arc<dyn KeyValueStore>,
    codec: Arc<TokenCodec>,
    config: Config,
}

impl SessionService {
    pub fn new(store: Arc<dyn KeyValueStore>, codec: Arc<TokenCodec>, config: Config) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    fn refresh_token_key(user_id: Uuid) -> String {
        format!("refreshToken_{}", user_id)
    }

    fn active_session_key(user_id: Uuid) -> String {
        format!("activeSession_{}", user_id)
    }

    fn session_key(session_id: &str) -> String {
        format!("session_{}", session_id)
    }

    fn lock_key(user_id: Uuid) -> String {
        format!("lock:session_{}", user_id)
    }

    /// 16 random bytes, hex encoded.
    fn new_session_id() -> String {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn refresh_ttl_seconds(&self) -> u64 {
        self.config.refresh_token_ttl().num_seconds().max(0) as u64
    }

    /// Serializes session-mutating sequences per user. Concurrent login and
    /// refresh for the same user queue up behind this instead of
    /// interleaving their read-delete-write steps.
    async fn acquire_user_lock(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = Uuid::new_v4().to_string();
        let key = Self::lock_key(user_id);

        for _ in 0..LOCK_RETRY_LIMIT {
            if self.store.set_nx_ex(&key, &token, LOCK_TTL_SECONDS).await? {
                return Ok(token);
            }
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_DELAY_MS)).await;
        }

        Err(AppError::StoreUnavailable(anyhow::anyhow!(
            "session lock for user {} not acquired",
            user_id
        )))
    }

    /// Compare-and-delete so a lock that outlived its TTL cannot release a
    /// successor's lock. Best-effort: an unreleased lock only delays the
    /// next writer until the TTL runs out.
    async fn release_user_lock(&self, user_id: Uuid, token: &str) {
        if let Err(err) = self
            .store
            .delete_if_eq(&Self::lock_key(user_id), token)
            .await
        {
            tracing::warn!(%user_id, "Failed to release session lock: {}", err);
        }
    }

    /// Creates a fresh session for the user, discarding any prior one.
    pub async fn create_session(&self, user_id: Uuid) -> Result<IssuedSession, AppError> {
        let lock = self.acquire_user_lock(user_id).await?;
        let result = self.create_session_locked(user_id).await;
        self.release_user_lock(user_id, &lock).await;
        result
    }

    async fn create_session_locked(&self, user_id: Uuid) -> Result<IssuedSession, AppError> {
        if let Some(old_sid) = self.store.get(&Self::active_session_key(user_id)).await? {
            tracing::debug!(%user_id, "Superseding existing session");
            self.store.delete(&Self::session_key(&old_sid)).await?;
            self.store.delete(&Self::refresh_token_key(user_id)).await?;
        }

        let session_id = Self::new_session_id();
        let access_claims =
            SessionClaims::new(user_id, &session_id, self.config.access_token_ttl());
        let refresh_claims =
            SessionClaims::new(user_id, &session_id, self.config.refresh_token_ttl());
        let access_token = self.codec.sign(&access_claims, TokenKind::Access)?;
        let refresh_token = self.codec.sign(&refresh_claims, TokenKind::Refresh)?;

        let record = SessionRecord::new(user_id, &session_id);
        let record_json = serde_json::to_string(&record).map_err(anyhow::Error::from)?;
        let ttl = self.refresh_ttl_seconds();

        // Metadata first, authorizing pointers after.
        self.store
            .set_ex(&Self::session_key(&session_id), &record_json, ttl)
            .await?;
        self.store
            .set_ex(&Self::refresh_token_key(user_id), &refresh_token, ttl)
            .await?;
        self.store
            .set_ex(&Self::active_session_key(user_id), &session_id, ttl)
            .await?;

        tracing::debug!(%user_id, session_id, "Session created");
        Ok(IssuedSession {
            access_token,
            refresh_token,
            session_id,
        })
    }

    /// Verifies a presented refresh token. Fails closed: the signature, the
    /// stored token, the active-session pointer and the metadata record must
    /// all agree before anything is reissued. Bumps `last_activity` on
    /// success.
    pub async fn verify_refresh(&self, token: &str) -> Result<SessionClaims, AppError> {
        let claims: SessionClaims = self.codec.verify(token, TokenKind::Refresh)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;

        let lock = self.acquire_user_lock(user_id).await?;
        let result = self.verify_refresh_locked(user_id, token, claims).await;
        self.release_user_lock(user_id, &lock).await;
        result
    }

    async fn verify_refresh_locked(
        &self,
        user_id: Uuid,
        token: &str,
        claims: SessionClaims,
    ) -> Result<SessionClaims, AppError> {
        let stored = self
            .store
            .get(&Self::refresh_token_key(user_id))
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;
        if stored != token {
            return Err(AppError::SessionSuperseded(
                "Session superseded by a newer login".to_string(),
            ));
        }

        let active = self
            .store
            .get(&Self::active_session_key(user_id))
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;
        if active != claims.sid {
            return Err(AppError::SessionSuperseded(
                "Session superseded by a newer login".to_string(),
            ));
        }

        let record_json = self
            .store
            .get(&Self::session_key(&claims.sid))
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;
        let mut record: SessionRecord =
            serde_json::from_str(&record_json).map_err(anyhow::Error::from)?;

        record.touch();
        let updated = serde_json::to_string(&record).map_err(anyhow::Error::from)?;
        self.store
            .set_ex(&Self::session_key(&claims.sid), &updated, self.refresh_ttl_seconds())
            .await?;

        Ok(claims)
    }

    /// Stateless re-issuance after a successful refresh.
    pub fn issue_access_token(&self, user_id: Uuid, session_id: &str) -> anyhow::Result<String> {
        let claims = SessionClaims::new(user_id, session_id, self.config.access_token_ttl());
        self.codec.sign(&claims, TokenKind::Access)
    }

    /// O(1) pointer comparison. Absence of the pointer means no session.
    pub async fn is_session_active(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<bool, StoreError> {
        let active = self.store.get(&Self::active_session_key(user_id)).await?;
        Ok(active.as_deref() == Some(session_id))
    }

    /// Tears down the user's session and both CSRF records. Idempotent;
    /// revoking a user with no session is a no-op.
    pub async fn revoke_session(&self, user_id: Uuid) -> Result<(), AppError> {
        let lock = self.acquire_user_lock(user_id).await?;
        let result = self.revoke_session_locked(user_id).await;
        self.release_user_lock(user_id, &lock).await;
        result
    }

    async fn revoke_session_locked(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Some(sid) = self.store.get(&Self::active_session_key(user_id)).await? {
            self.store.delete(&Self::session_key(&sid)).await?;
        }
        self.store.delete(&Self::refresh_token_key(user_id)).await?;
        self.store
            .delete(&Self::active_session_key(user_id))
            .await?;
        self.store.delete(&CsrfService::seed_key(user_id)).await?;
        self.store.delete(&CsrfService::token_key(user_id)).await?;

        tracing::debug!(%user_id, "Session revoked");
        Ok(())
    }
}
