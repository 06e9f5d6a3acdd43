//! Email verification records and login OTP codes.
//!
//! Both are short-lived store entries consumed at most once. A verification
//! record holds the whole pending registration, so no user row exists until
//! the emailed link is followed. An OTP is consumed only by a correct
//! submission; wrong guesses leave it counting down its TTL.

use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::store::{KeyValueStore, StoreError};
use crate::error::AppError;

/// Registration data parked until the emailed link is followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// What an OTP submission turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    /// Correct code; the stored record was consumed.
    Valid,
    /// Wrong code; the stored record is untouched and can still be matched.
    Mismatch,
    /// No record stored (never issued, expired, or already consumed).
    Expired,
}

pub struct VerificationService {
    store: Arc<dyn KeyValueStore>,
    config: Config,
}

impl VerificationService {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        Self { store, config }
    }

    fn verify_key(token: &str) -> String {
        format!("verify:{}", token)
    }

    fn otp_key(email: &str) -> String {
        format!("otp_{}", email)
    }

    /// 32 random bytes, hex encoded.
    fn new_verify_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Uniform six-digit code, never with a leading zero.
    fn new_otp() -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }

    /// Parks a pending registration and returns the token to email out.
    pub async fn store_pending_registration(
        &self,
        pending: &PendingRegistration,
    ) -> Result<String, AppError> {
        let token = Self::new_verify_token();
        let json = serde_json::to_string(pending).map_err(anyhow::Error::from)?;
        let ttl = self.config.verification_ttl().num_seconds().max(0) as u64;
        self.store
            .set_ex(&Self::verify_key(&token), &json, ttl)
            .await?;
        Ok(token)
    }

    /// Atomically takes the pending registration for `token`. The first
    /// caller gets it; everyone after gets `None`.
    pub async fn consume_pending_registration(
        &self,
        token: &str,
    ) -> Result<Option<PendingRegistration>, AppError> {
        match self.store.get_del(&Self::verify_key(token)).await? {
            Some(json) => {
                let pending = serde_json::from_str(&json).map_err(anyhow::Error::from)?;
                Ok(Some(pending))
            }
            None => Ok(None),
        }
    }

    /// Issues a login code for the email, replacing any outstanding one.
    pub async fn issue_otp(&self, email: &str) -> Result<String, StoreError> {
        let otp = Self::new_otp();
        let ttl = self.config.otp_ttl().num_seconds().max(0) as u64;
        self.store.set_ex(&Self::otp_key(email), &otp, ttl).await?;
        Ok(otp)
    }

    /// Checks a submitted code. A correct code is consumed in the same
    /// atomic step that matches it; of two concurrent correct submissions
    /// only one sees `Valid`.
    pub async fn check_otp(&self, email: &str, submitted: &str) -> Result<OtpOutcome, StoreError> {
        if self
            .store
            .delete_if_eq(&Self::otp_key(email), submitted)
            .await?
        {
            return Ok(OtpOutcome::Valid);
        }

        if self.store.exists(&Self::otp_key(email)).await? {
            Ok(OtpOutcome::Mismatch)
        } else {
            Ok(OtpOutcome::Expired)
        }
    }
}
