//! Identity Toolkit (Firebase Auth admin) REST client

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::http::{FirebaseHttp, next_token};
use crate::{
    config::PasswordHashConfig,
    error::{BackendError, BackendResult},
    models::{AuthUser, NewUser, UserPage},
    store::UserDirectory,
};

/// Upper bound the API accepts for `maxResults`
pub const MAX_LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    password_hash: Option<String>,
    #[serde(default)]
    salt: Option<String>,
    /// Milliseconds since the epoch, as a decimal string
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login_at: Option<String>,
}

impl From<UserInfo> for AuthUser {
    fn from(info: UserInfo) -> Self {
        Self {
            uid: info.local_id,
            email: info.email,
            email_verified: info.email_verified,
            display_name: info.display_name,
            photo_url: info.photo_url,
            disabled: info.disabled,
            created_at: parse_millis(info.created_at.as_deref()),
            last_sign_in_at: parse_millis(info.last_login_at.as_deref()),
            password_hash: info.password_hash.filter(|h| !h.is_empty()),
            password_salt: info.salt.filter(|s| !s.is_empty()),
        }
    }
}

fn parse_millis(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<UserInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    local_id: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportUser {
    local_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
    disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_login_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateRequest {
    users: Vec<ImportUser>,
    allow_overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signer_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    salt_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_cost: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BatchCreateResponse {
    #[serde(default)]
    error: Vec<ImportError>,
}

#[derive(Debug, Deserialize)]
struct ImportError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    local_id: &'a str,
}

pub struct IdentityToolkitClient {
    http: Arc<FirebaseHttp>,
    /// `{endpoint}/v1/projects/{id}`
    project_url: String,
    password_hash: Option<PasswordHashConfig>,
}

impl IdentityToolkitClient {
    pub fn new(
        http: Arc<FirebaseHttp>,
        endpoint: &str,
        project_id: &str,
        password_hash: Option<PasswordHashConfig>,
    ) -> Self {
        Self {
            http,
            project_url: format!("{}/v1/projects/{}", endpoint.trim_end_matches('/'), project_id),
            password_hash,
        }
    }

    async fn exists(&self, uid: &str) -> BackendResult<bool> {
        let url = format!("{}/accounts:lookup", self.project_url);
        let response: LookupResponse = self
            .http
            .post_json(&url, &LookupRequest { local_id: [uid] })
            .await?;
        Ok(!response.users.is_empty())
    }

    fn import_request(&self, user: &NewUser) -> BatchCreateRequest {
        let hash = self.password_hash.as_ref();
        let password = match (&user.password, hash) {
            (Some(password), Some(_)) => Some(password),
            (Some(_), None) => {
                warn!(
                    uid = %user.uid,
                    "Password hash present but no hash parameters configured; importing without password"
                );
                None
            }
            (None, _) => None,
        };

        let import = ImportUser {
            local_id: user.uid.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            disabled: user.disabled,
            created_at: user.created_at.map(|t| t.timestamp_millis().to_string()),
            last_login_at: user.last_sign_in_at.map(|t| t.timestamp_millis().to_string()),
            password_hash: password.map(|p| p.hash.clone()),
            salt: password.and_then(|p| p.salt.clone()),
        };

        let hash = hash.filter(|_| password.is_some());
        BatchCreateRequest {
            users: vec![import],
            allow_overwrite: false,
            hash_algorithm: hash.map(|h| h.algorithm.clone()),
            signer_key: hash.and_then(|h| h.signer_key.clone()),
            salt_separator: hash.and_then(|h| h.salt_separator.clone()),
            rounds: hash.and_then(|h| h.rounds),
            memory_cost: hash.and_then(|h| h.memory_cost),
        }
    }
}

#[async_trait]
impl UserDirectory for IdentityToolkitClient {
    async fn list_users(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> BackendResult<UserPage> {
        let url = format!("{}/accounts:batchGet", self.project_url);
        let mut query = vec![(
            "maxResults",
            page_size.clamp(1, MAX_LIST_PAGE_SIZE).to_string(),
        )];
        if let Some(token) = page_token {
            query.push(("nextPageToken", token.to_string()));
        }

        let response: BatchGetResponse = self.http.get_json(&url, &query).await?;
        Ok(UserPage {
            users: response.users.into_iter().map(AuthUser::from).collect(),
            next_page_token: next_token(response.next_page_token),
        })
    }

    async fn create_user(&self, user: &NewUser) -> BackendResult<()> {
        // batchCreate skips uniqueness checks, so look the uid up first
        if self.exists(&user.uid).await? {
            return Err(BackendError::UidAlreadyExists(user.uid.clone()));
        }

        let url = format!("{}/accounts:batchCreate", self.project_url);
        let response: BatchCreateResponse =
            self.http.post_json(&url, &self.import_request(user)).await?;

        match response.error.into_iter().next() {
            None => Ok(()),
            Some(e) if e.message.contains("DUPLICATE_LOCAL_ID") => {
                Err(BackendError::UidAlreadyExists(user.uid.clone()))
            }
            Some(e) => Err(BackendError::Rejected(e.message)),
        }
    }

    async fn delete_user(&self, uid: &str) -> BackendResult<()> {
        let url = format!("{}/accounts:delete", self.project_url);
        let _: Value = self
            .http
            .post_json(&url, &DeleteRequest { local_id: uid })
            .await?;
        Ok(())
    }

    async fn probe(&self) -> BackendResult<()> {
        self.list_users(1, None).await.map(|_| ())
    }
}
