//! User model - registered identities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::PasswordCredential;

/// Column widths of `users.name` and `users.email`, in characters.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 320;

/// User entity.
///
/// Identity fields are fixed after registration; only `verified` changes,
/// and only through a successful bank-account link.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    #[sqlx(flatten)]
    pub password: PasswordCredential,
    pub verified: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified user. The email is stored canonicalized.
    pub fn new(email: &str, name: &str, password: PasswordCredential) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email: canonical_email(email),
            name: name.trim().to_string(),
            password,
            verified: false,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Convert to sanitized response (no credential).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// Lowercased, trimmed email address.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub verified: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            name: u.name,
            verified: u.verified,
            created_utc: u.created_utc,
            updated_utc: u.updated_utc,
        }
    }
}
