use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record as listed from a project's Auth service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    /// Base64 hash, only exposed for users whose credentials the backend lets us read
    pub password_hash: Option<String>,
    pub password_salt: Option<String>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }
}

/// One page of a user listing
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<AuthUser>,
    /// Absent on the last page
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: Option<String>,
}

/// Payload for recreating a user in another project under the same uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub password: Option<PasswordHash>,
}

impl From<&AuthUser> for NewUser {
    fn from(user: &AuthUser) -> Self {
        let password = user.password_hash.as_ref().map(|hash| PasswordHash {
            hash: hash.clone(),
            salt: user.password_salt.clone(),
        });

        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            disabled: user.disabled,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
            password,
        }
    }
}

impl From<NewUser> for AuthUser {
    fn from(user: NewUser) -> Self {
        let (password_hash, password_salt) = match user.password {
            Some(p) => (Some(p.hash), p.salt),
            None => (None, None),
        };

        Self {
            uid: user.uid,
            email: user.email,
            email_verified: user.email_verified,
            display_name: user.display_name,
            photo_url: user.photo_url,
            disabled: user.disabled,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
            password_hash,
            password_salt,
        }
    }
}
