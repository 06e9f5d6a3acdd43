//! Models that represent user accounts, registration/login payloads and
//! API-facing projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::rules;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a registered user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,
    /// Display name captured at registration.
    pub name: String,
    /// Login email, stored trimmed and lowercased.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Standard account created by email verification.
    #[default]
    User,
    /// Administrator role with elevated permissions.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            // tolerate common legacy casings
            "User" | "USER" => Ok(UserRole::User),
            "Admin" | "ADMIN" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(other, &["user", "admin"])),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Public-facing representation of a user. The password hash never leaves
/// the server; conversions from `User` drop it.
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Constructs a new user with a freshly generated identifier and the
    /// default role.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: UserRole::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for creating a new account.
pub struct RegisterPayload {
    #[validate(custom(function = rules::validate_name))]
    pub name: String,
    #[validate(
        email(message = "Invalid email address"),
        custom(function = rules::validate_email_no_spaces)
    )]
    pub email: String,
    #[validate(custom(function = rules::validate_password_strength))]
    pub password: String,
}

impl RegisterPayload {
    /// Canonicalizes before validation: trims the name, trims and lowercases
    /// the email. `" ADA@X.com "` registers as `ada@x.com`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Credentials submitted to start a login (first factor).
pub struct LoginPayload {
    #[validate(
        email(message = "Invalid email address"),
        custom(function = rules::validate_email_no_spaces)
    )]
    pub email: String,
    #[validate(custom(function = rules::validate_password_strength))]
    pub password: String,
}

impl LoginPayload {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// One-time code submitted to finish a login (second factor).
pub struct VerifyOtpPayload {
    #[validate(
        email(message = "Invalid email address"),
        custom(function = rules::validate_email_no_spaces)
    )]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

impl VerifyOtpPayload {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            otp: self.otp.trim().to_string(),
        }
    }
}
