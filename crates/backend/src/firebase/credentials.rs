//! Bearer tokens for API calls: minted from a service-account key through
//! `yup-oauth2`, or the fixed token the Firebase emulators accept

use std::path::Path;

use tracing::debug;
use yup_oauth2::{
    ServiceAccountAuthenticator, ServiceAccountKey, authenticator::DefaultAuthenticator,
};

use crate::error::{BackendError, BackendResult};

pub const SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/devstorage.full_control",
];
/// Bearer token the Firebase emulators accept as an administrator
pub const EMULATOR_TOKEN: &str = "owner";

pub async fn read_key(path: &Path) -> BackendResult<ServiceAccountKey> {
    yup_oauth2::read_service_account_key(path).await.map_err(|e| {
        BackendError::Credentials(format!(
            "cannot read service-account key {}: {}",
            path.display(),
            e
        ))
    })
}

/// Where bearer tokens for API calls come from
pub enum TokenSource {
    /// Caches tokens and refreshes them before expiry
    ServiceAccount(DefaultAuthenticator),
    Static(String),
}

impl TokenSource {
    pub async fn service_account(key: ServiceAccountKey) -> BackendResult<Self> {
        let client_email = key.client_email.clone();
        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| {
                BackendError::Credentials(format!(
                    "cannot set up authenticator for {}: {}",
                    client_email, e
                ))
            })?;
        debug!(client_email = %client_email, "Service-account authenticator ready");
        Ok(Self::ServiceAccount(authenticator))
    }

    pub fn emulator() -> Self {
        Self::Static(EMULATOR_TOKEN.to_string())
    }

    pub async fn access_token(&self) -> BackendResult<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(authenticator) => {
                let token = authenticator.token(&SCOPES).await.map_err(|e| {
                    BackendError::Credentials(format!("token request failed: {}", e))
                })?;
                token.token().map(str::to_string).ok_or_else(|| {
                    BackendError::Credentials("token response carried no access token".into())
                })
            }
        }
    }
}
