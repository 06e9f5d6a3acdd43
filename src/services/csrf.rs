//! Seed-exchange CSRF protection.
//!
//! On login a random seed is parked in the store and handed to the client as
//! an HttpOnly cookie. The client then exchanges the seed, exactly once, for
//! a signed CSRF token it can echo in a request header. The double submit
//! means a forged cross-site request can present neither half.

use std::sync::Arc;

use rand::RngCore;
use uuid::Uuid;

use crate::config::Config;
use crate::db::store::{KeyValueStore, StoreError};
use crate::error::AppError;
use crate::utils::jwt::{CsrfClaims, TokenCodec, TokenKind};

pub struct CsrfService {
    store: Arc<dyn KeyValueStore>,
    codec: Arc<TokenCodec>,
    config: Config,
}

impl CsrfService {
    pub fn new(store: Arc<dyn KeyValueStore>, codec: Arc<TokenCodec>, config: Config) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    pub(crate) fn seed_key(user_id: Uuid) -> String {
        format!("csrf_seed_{}", user_id)
    }

    pub(crate) fn token_key(user_id: Uuid) -> String {
        format!("csrf_{}", user_id)
    }

    /// 24 random bytes, hex encoded.
    fn new_seed() -> String {
        let mut bytes = [0u8; 24];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Parks a fresh seed for the user. Called when a session is created;
    /// any previous unexchanged seed is overwritten.
    pub async fn issue_seed(&self, user_id: Uuid) -> Result<String, StoreError> {
        let seed = Self::new_seed();
        let ttl = self.config.csrf_seed_ttl().num_seconds().max(0) as u64;
        self.store
            .set_ex(&Self::seed_key(user_id), &seed, ttl)
            .await?;
        Ok(seed)
    }

    /// Exchanges a presented seed for a signed CSRF token. The stored seed
    /// is consumed in the same atomic step that compares it, so the exchange
    /// is single-use: a replay, a stale seed and a wrong seed all fail the
    /// same way. A wrong seed does not consume the stored one.
    pub async fn exchange_seed(
        &self,
        user_id: Uuid,
        presented_seed: &str,
    ) -> Result<String, AppError> {
        let consumed = self
            .store
            .delete_if_eq(&Self::seed_key(user_id), presented_seed)
            .await?;
        if !consumed {
            return Err(AppError::SeedMismatch("Invalid CSRF seed".to_string()));
        }

        let claims = CsrfClaims::new(user_id, self.config.csrf_token_ttl());
        let token = self.codec.sign(&claims, TokenKind::Csrf)?;

        // Server-side copy, so revocation can retire it with the session.
        let ttl = self.config.csrf_token_ttl().num_seconds().max(0) as u64;
        self.store
            .set_ex(&Self::token_key(user_id), &token, ttl)
            .await?;

        tracing::debug!(%user_id, "CSRF seed exchanged");
        Ok(token)
    }
}
