//! Traits the migration components use to reach a project's services

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::BackendResult,
    models::{BatchOperation, Document, NewUser, ObjectMetadata, StorageObject, UserPage},
};

/// Trait for document database access
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read every document of a collection into memory
    async fn list_documents(&self, collection: &str) -> BackendResult<Vec<Document>>;

    /// Apply a group of writes atomically. Callers keep `operations` within
    /// [`crate::models::MAX_BATCH_OPERATIONS`].
    async fn commit(&self, operations: &[BatchOperation]) -> BackendResult<()>;

    /// Cheapest read that proves the database is reachable with our credentials
    async fn probe(&self, collection: &str) -> BackendResult<()>;
}

/// Trait for object storage access within one bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// List every object whose path starts with `prefix`
    async fn list_objects(&self, prefix: &str) -> BackendResult<Vec<ObjectMetadata>>;

    /// Download an object's full content
    async fn download(&self, path: &str) -> BackendResult<Bytes>;

    /// Upload an object under `object.metadata.name`, replacing any existing one
    async fn upload(&self, object: &StorageObject) -> BackendResult<()>;
}

/// Trait for user account administration
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one page of users. Pass the previous page's token to continue.
    async fn list_users(&self, page_size: usize, page_token: Option<&str>)
    -> BackendResult<UserPage>;

    /// Create a user under the given uid. Fails with
    /// [`crate::BackendError::UidAlreadyExists`] when the uid is taken.
    async fn create_user(&self, user: &NewUser) -> BackendResult<()>;

    async fn delete_user(&self, uid: &str) -> BackendResult<()>;

    /// Cheapest call that proves the Auth service is enabled and reachable
    async fn probe(&self) -> BackendResult<()>;
}

/// Connected handles to the three services of one project.
///
/// Constructed explicitly at the start of a run and dropped at the end.
#[derive(Clone)]
pub struct Project {
    pub project_id: String,
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl Project {
    pub fn new(
        project_id: impl Into<String>,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            documents,
            objects,
            users,
        }
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("project_id", &self.project_id)
            .field("bucket", &self.objects.bucket())
            .finish()
    }
}
