//! Per-project connection settings

use std::path::PathBuf;

use serde::Deserialize;

pub const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Identifies one Firebase project and how to reach it
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project_id: String,
    pub storage_bucket: String,
    /// Service-account key file. May be omitted only when every endpoint is
    /// overridden (emulator suite).
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl ProjectConfig {
    pub fn new(project_id: impl Into<String>, storage_bucket: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            storage_bucket: storage_bucket.into(),
            credentials: None,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials = Some(path.into());
        self
    }
}

/// Base URLs of the three Google APIs. Point them at the local emulators to
/// rehearse a migration, e.g. `http://127.0.0.1:8080` for Firestore,
/// `http://127.0.0.1:9199` for Storage and
/// `http://127.0.0.1:9099/identitytoolkit.googleapis.com` for Auth.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub firestore: String,
    pub storage: String,
    pub identity_toolkit: String,
}

impl Endpoints {
    pub fn is_emulator(&self) -> bool {
        *self != Self::default()
    }

    /// Every service under one base URL, as served by a single stand-in
    /// server. The real emulators listen on separate ports and need
    /// per-service settings.
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            firestore: base.clone(),
            storage: base.clone(),
            identity_toolkit: base,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            firestore: FIRESTORE_ENDPOINT.to_string(),
            storage: STORAGE_ENDPOINT.to_string(),
            identity_toolkit: IDENTITY_TOOLKIT_ENDPOINT.to_string(),
        }
    }
}

/// Hash parameters of the project the password hashes were produced in.
/// Required to import users whose password hash is copied over.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordHashConfig {
    pub algorithm: String,
    #[serde(default)]
    pub signer_key: Option<String>,
    #[serde(default)]
    pub salt_separator: Option<String>,
    #[serde(default)]
    pub rounds: Option<u32>,
    #[serde(default)]
    pub memory_cost: Option<u32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unknown_project_key_rejected() {
        let raw = json!({
            "project_id": "p1",
            "storage_bucket": "p1.appspot.com",
            "collections": ["users"]
        });
        let err = serde_json::from_value::<ProjectConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("collections"));
    }

    #[test]
    fn test_partial_endpoints_keep_defaults() {
        let raw = json!({"firestore": "http://127.0.0.1:8080"});
        let endpoints: Endpoints = serde_json::from_value(raw).unwrap();
        assert_eq!(endpoints.storage, STORAGE_ENDPOINT);
        assert!(endpoints.is_emulator());
        assert!(serde_json::from_value::<Endpoints>(json!({"auth": "x"})).is_err());
    }
}
