use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Parses the configured attribute value; unknown input falls back to
    /// `None`, the cross-site default this API is deployed with.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "lax" => SameSite::Lax,
            "strict" => SameSite::Strict,
            _ => SameSite::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secure: config.cookie_secure,
            same_site: SameSite::parse(&config.cookie_same_site),
        }
    }
}

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const CSRF_SEED_COOKIE_NAME: &str = "csrf_seed";
pub const COOKIE_PATH: &str = "/";

pub fn build_auth_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    options: CookieOptions,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        path,
        max_age.as_secs(),
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(name: &str, path: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; HttpOnly; SameSite={}",
        name,
        path,
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::Strict => "Strict",
        SameSite::None => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_auth_cookie_includes_security_attributes() {
        let opts = CookieOptions {
            secure: true,
            same_site: SameSite::None,
        };
        let cookie = build_auth_cookie(
            ACCESS_COOKIE_NAME,
            "abc",
            Duration::from_secs(900),
            COOKIE_PATH,
            opts,
        );
        assert!(cookie.contains("accessToken=abc"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=900"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn build_clear_cookie_sets_max_age_zero() {
        let opts = CookieOptions {
            secure: false,
            same_site: SameSite::Strict,
        };
        let cookie = build_clear_cookie(REFRESH_COOKIE_NAME, COOKIE_PATH, opts);
        assert!(cookie.contains("refreshToken="));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn extract_cookie_value_finds_matching_name() {
        let header = "a=1; accessToken=token-value; csrf_seed=deadbeef";
        assert_eq!(
            extract_cookie_value(header, "accessToken").as_deref(),
            Some("token-value")
        );
        assert_eq!(
            extract_cookie_value(header, "csrf_seed").as_deref(),
            Some("deadbeef")
        );
        assert!(extract_cookie_value(header, "missing").is_none());
    }

    #[test]
    fn same_site_parse_defaults_to_none() {
        assert!(matches!(SameSite::parse("Lax"), SameSite::Lax));
        assert!(matches!(SameSite::parse("strict"), SameSite::Strict));
        assert!(matches!(SameSite::parse("None"), SameSite::None));
        assert!(matches!(SameSite::parse("bogus"), SameSite::None));
    }
}
