use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

/// Which signing secret a token belongs to. Access, refresh and CSRF tokens
/// are signed with independent secrets, so a token of one kind never
/// verifies as another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Csrf,
}

/// Verification outcome for a rejected token. Callers branch on the variant;
/// none of these carry attacker-controlled text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature invalid")]
    InvalidSignature,
    #[error("token malformed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Claims carried by access and refresh tokens: the user and the session
/// the token is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user_id
    pub sid: String, // session_id
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// `ttl` may be negative; tests use that to mint already-expired tokens.
    pub fn new(user_id: Uuid, session_id: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Claims carried by a CSRF token minted on seed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfClaims {
    pub sub: String, // user_id
    pub iat: i64,
    pub exp: i64,
}

impl CsrfClaims {
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// Signs and verifies the three token kinds. Pure computation; never touches
/// the store.
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
    csrf: KeyPair,
}

impl TokenCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            access: KeyPair::from_secret(&config.access_token_secret),
            refresh: KeyPair::from_secret(&config.refresh_token_secret),
            csrf: KeyPair::from_secret(&config.csrf_secret),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::Csrf => &self.csrf,
        }
    }

    pub fn sign<T: Serialize>(&self, claims: &T, kind: TokenKind) -> anyhow::Result<String> {
        let token = encode(&Header::default(), claims, &self.keys(kind).encoding)?;
        Ok(token)
    }

    /// No clock leeway: a token one second past `exp` is expired.
    pub fn verify<T: DeserializeOwned>(&self, token: &str, kind: TokenKind) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<T>(token, &self.keys(kind).decoding, &validation)?;
        Ok(data.claims)
    }
}
