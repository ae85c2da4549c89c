//! Firebase REST implementation of the backend traits

pub mod auth;
pub mod credentials;
pub mod firestore;
pub mod http;
pub mod storage;

use std::sync::Arc;

use tracing::info;

pub use auth::IdentityToolkitClient;
pub use credentials::TokenSource;
pub use firestore::FirestoreClient;
pub use http::FirebaseHttp;
pub use storage::CloudStorageClient;

use crate::{
    config::{PasswordHashConfig, ProjectConfig},
    error::{BackendError, BackendResult},
    store::Project,
};

/// Build the REST clients for one project.
///
/// `password_hash` is only consulted when users are created in this project.
pub async fn connect(
    config: &ProjectConfig,
    password_hash: Option<PasswordHashConfig>,
) -> BackendResult<Project> {
    let tokens = match &config.credentials {
        Some(path) => {
            let key = credentials::read_key(path).await?;
            if let Some(key_project) = key
                .project_id
                .as_deref()
                .filter(|p| *p != config.project_id)
            {
                tracing::warn!(
                    project_id = %config.project_id,
                    key_project_id = %key_project,
                    "Service-account key belongs to a different project"
                );
            }
            TokenSource::service_account(key).await?
        }
        None if config.endpoints.is_emulator() => TokenSource::emulator(),
        None => {
            return Err(BackendError::Credentials(format!(
                "no credentials configured for project {}",
                config.project_id
            )));
        }
    };

    let http = Arc::new(FirebaseHttp::new(tokens)?);
    let endpoints = &config.endpoints;

    info!(
        project_id = %config.project_id,
        bucket = %config.storage_bucket,
        emulator = endpoints.is_emulator(),
        "Connected Firebase project"
    );

    Ok(Project::new(
        config.project_id.clone(),
        Arc::new(FirestoreClient::new(
            http.clone(),
            &endpoints.firestore,
            &config.project_id,
        )),
        Arc::new(CloudStorageClient::new(
            http.clone(),
            &endpoints.storage,
            &config.storage_bucket,
        )),
        Arc::new(IdentityToolkitClient::new(
            http,
            &endpoints.identity_toolkit,
            &config.project_id,
            password_hash,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;

    #[tokio::test]
    async fn test_missing_credentials_rejected_for_real_project() {
        let config = ProjectConfig::new("p1", "p1.appspot.com");
        assert!(matches!(
            connect(&config, None).await,
            Err(BackendError::Credentials(_))
        ));
    }

    #[tokio::test]
    async fn test_emulator_needs_no_credentials() {
        let mut config = ProjectConfig::new("demo", "demo.appspot.com");
        config.endpoints = Endpoints::uniform("http://127.0.0.1:9000");
        let project = connect(&config, None).await.unwrap();
        assert_eq!(project.project_id, "demo");
        assert_eq!(project.objects.bucket(), "demo.appspot.com");
    }
}
