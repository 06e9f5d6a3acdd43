use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// When unset, the in-process memory store backs the ephemeral state
    /// (single-instance development mode).
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub redis_connect_timeout_secs: u64,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub csrf_secret: String,
    pub allowed_origin: String,
    pub frontend_url: String,
    pub cookie_secure: bool,
    pub cookie_same_site: String,
    pub access_token_ttl_minutes: u64,
    pub refresh_token_ttl_days: u64,
    pub verification_ttl_minutes: u64,
    pub otp_ttl_minutes: u64,
    pub csrf_seed_ttl_minutes: u64,
    pub csrf_token_ttl_minutes: u64,
    pub rate_limit_marker_seconds: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/gatekeeper".to_string());

        let redis_url = env::var("REDIS_URL").ok();

        let redis_pool_size = env::var("REDIS_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let redis_connect_timeout_secs = env::var("REDIS_CONNECT_TIMEOUT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .unwrap_or_else(|_| "access-secret-change-this-in-production".to_string());

        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .unwrap_or_else(|_| "refresh-secret-change-this-in-production".to_string());

        let csrf_secret = env::var("CSRF_SECRET")
            .unwrap_or_else(|_| "csrf-secret-change-this-in-production".to_string());

        let allowed_origin =
            env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let cookie_secure = env::var("COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let cookie_same_site = env::var("COOKIE_SAME_SITE").unwrap_or_else(|_| "None".to_string());

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let verification_ttl_minutes = env::var("VERIFICATION_TTL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let otp_ttl_minutes = env::var("OTP_TTL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let csrf_seed_ttl_minutes = env::var("CSRF_SEED_TTL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let csrf_token_ttl_minutes = env::var("CSRF_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let rate_limit_marker_seconds = env::var("RATE_LIMIT_MARKER_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        Ok(Config {
            port,
            database_url,
            redis_url,
            redis_pool_size,
            redis_connect_timeout_secs,
            access_token_secret,
            refresh_token_secret,
            csrf_secret,
            allowed_origin,
            frontend_url,
            cookie_secure,
            cookie_same_site,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            verification_ttl_minutes,
            otp_ttl_minutes,
            csrf_seed_ttl_minutes,
            csrf_token_ttl_minutes,
            rate_limit_marker_seconds,
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes as i64)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days as i64)
    }

    pub fn verification_ttl(&self) -> Duration {
        Duration::minutes(self.verification_ttl_minutes as i64)
    }

    pub fn otp_ttl(&self) -> Duration {
        Duration::minutes(self.otp_ttl_minutes as i64)
    }

    pub fn csrf_seed_ttl(&self) -> Duration {
        Duration::minutes(self.csrf_seed_ttl_minutes as i64)
    }

    pub fn csrf_token_ttl(&self) -> Duration {
        Duration::minutes(self.csrf_token_ttl_minutes as i64)
    }

    /// Fixed configuration for tests: no external backends, throwaway
    /// secrets, production-shaped TTLs.
    pub fn test_default() -> Self {
        Config {
            port: 0,
            database_url: String::new(),
            redis_url: None,
            redis_pool_size: 1,
            redis_connect_timeout_secs: 1,
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            csrf_secret: "csrf-secret".to_string(),
            allowed_origin: "http://localhost:5173".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            cookie_secure: false,
            cookie_same_site: "None".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            verification_ttl_minutes: 5,
            otp_ttl_minutes: 5,
            csrf_seed_ttl_minutes: 5,
            csrf_token_ttl_minutes: 15,
            rate_limit_marker_seconds: 60,
        }
    }
}
