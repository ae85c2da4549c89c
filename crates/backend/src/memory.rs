//! In-memory implementation of the backend traits.
//!
//! Records every commit and delete so orchestration logic can be checked
//! without a network, and lets callers inject failures per collection,
//! object, prefix or uid.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, RwLock},
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::{BackendError, BackendResult},
    models::{
        AuthUser, BatchOperation, Document, MAX_BATCH_OPERATIONS, NewUser, ObjectMetadata,
        StorageObject, UserPage,
    },
    store::{DocumentStore, ObjectStore, Project, UserDirectory},
};

#[derive(Default)]
struct Failures {
    list_collections: HashSet<String>,
    commit_collections: HashSet<String>,
    list_prefixes: HashSet<String>,
    objects: HashSet<String>,
    create_uids: HashSet<String>,
    delete_uids: HashSet<String>,
    list_users: bool,
    firestore_probe: usize,
    auth_probe: usize,
}

#[derive(Debug, Default, Clone)]
pub struct CallLog {
    /// Number of operations in each successful commit, in order
    pub commits: Vec<usize>,
    pub document_deletes: usize,
    pub user_creates: usize,
    pub user_deletes: usize,
    pub uploads: usize,
    pub user_pages: usize,
    pub firestore_probes: usize,
    pub auth_probes: usize,
}

impl CallLog {
    /// Delete calls of any kind
    pub fn delete_calls(&self) -> usize {
        self.document_deletes + self.user_deletes
    }
}

/// A whole project held in memory
pub struct MemoryProject {
    project_id: String,
    bucket: String,
    documents: RwLock<BTreeMap<String, BTreeMap<String, Document>>>,
    objects: RwLock<BTreeMap<String, StorageObject>>,
    users: RwLock<BTreeMap<String, AuthUser>>,
    failures: Mutex<Failures>,
    calls: Mutex<CallLog>,
}

impl MemoryProject {
    pub fn new(project_id: impl Into<String>) -> Arc<Self> {
        let project_id = project_id.into();
        Arc::new(Self {
            bucket: format!("{}.appspot.com", project_id),
            project_id,
            documents: RwLock::new(BTreeMap::new()),
            objects: RwLock::new(BTreeMap::new()),
            users: RwLock::new(BTreeMap::new()),
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(CallLog::default()),
        })
    }

    /// Handles to this project as the services see it
    pub fn project(self: &Arc<Self>) -> Project {
        Project::new(
            self.project_id.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
        )
    }

    pub fn insert_document(&self, document: Document) {
        self.documents
            .write()
            .unwrap()
            .entry(document.collection.clone())
            .or_default()
            .insert(document.id.clone(), document);
    }

    pub fn insert_object(&self, object: StorageObject) {
        self.objects
            .write()
            .unwrap()
            .insert(object.metadata.name.clone(), object);
    }

    pub fn insert_user(&self, user: AuthUser) {
        self.users.write().unwrap().insert(user.uid.clone(), user);
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.documents
            .read()
            .unwrap()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn document_ids(&self, collection: &str) -> Vec<String> {
        self.documents(collection).into_iter().map(|d| d.id).collect()
    }

    pub fn object(&self, path: &str) -> Option<StorageObject> {
        self.objects.read().unwrap().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn user(&self, uid: &str) -> Option<AuthUser> {
        self.users.read().unwrap().get(uid).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().unwrap().len()
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_listing_collection(&self, collection: &str) {
        self.failures
            .lock()
            .unwrap()
            .list_collections
            .insert(collection.to_string());
    }

    pub fn fail_commits_to(&self, collection: &str) {
        self.failures
            .lock()
            .unwrap()
            .commit_collections
            .insert(collection.to_string());
    }

    pub fn fail_listing_prefix(&self, prefix: &str) {
        self.failures
            .lock()
            .unwrap()
            .list_prefixes
            .insert(prefix.to_string());
    }

    /// Downloads and uploads of this path fail
    pub fn fail_object(&self, path: &str) {
        self.failures.lock().unwrap().objects.insert(path.to_string());
    }

    pub fn fail_creating_user(&self, uid: &str) {
        self.failures
            .lock()
            .unwrap()
            .create_uids
            .insert(uid.to_string());
    }

    pub fn fail_deleting_user(&self, uid: &str) {
        self.failures
            .lock()
            .unwrap()
            .delete_uids
            .insert(uid.to_string());
    }

    pub fn fail_listing_users(&self) {
        self.failures.lock().unwrap().list_users = true;
    }

    /// The next `firestore` Firestore probes and `auth` Auth probes fail as
    /// if the services were still being provisioned
    pub fn fail_probes(&self, firestore: usize, auth: usize) {
        let mut failures = self.failures.lock().unwrap();
        failures.firestore_probe = firestore;
        failures.auth_probe = auth;
    }

    fn injected(
        &self,
        check: impl FnOnce(&mut Failures) -> bool,
        error: impl FnOnce() -> BackendError,
    ) -> BackendResult<()> {
        if check(&mut self.failures.lock().unwrap()) {
            Err(error())
        } else {
            Ok(())
        }
    }
}

/// Consume one unit of a countdown, reporting whether it was still running
fn countdown(remaining: &mut usize) -> bool {
    if *remaining > 0 {
        *remaining -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl DocumentStore for MemoryProject {
    async fn list_documents(&self, collection: &str) -> BackendResult<Vec<Document>> {
        self.injected(
            |f| f.list_collections.contains(collection),
            || BackendError::Http {
                status: 500,
                body: format!("listing {} failed", collection),
            },
        )?;
        Ok(self.documents(collection))
    }

    async fn commit(&self, operations: &[BatchOperation]) -> BackendResult<()> {
        if operations.len() > MAX_BATCH_OPERATIONS {
            return Err(BackendError::Http {
                status: 400,
                body: format!("maximum {} writes allowed per request", MAX_BATCH_OPERATIONS),
            });
        }
        for op in operations {
            let collection = op.collection();
            self.injected(
                |f| f.commit_collections.contains(collection),
                || BackendError::Http {
                    status: 500,
                    body: format!("commit to {} failed", collection),
                },
            )?;
        }

        let mut documents = self.documents.write().unwrap();
        let mut deletes = 0;
        for op in operations {
            match op {
                BatchOperation::Set(document) => {
                    documents
                        .entry(document.collection.clone())
                        .or_default()
                        .insert(document.id.clone(), document.clone());
                }
                BatchOperation::Delete { collection, id } => {
                    deletes += 1;
                    if let Some(docs) = documents.get_mut(collection) {
                        docs.remove(id);
                    }
                }
            }
        }

        let mut calls = self.calls.lock().unwrap();
        calls.commits.push(operations.len());
        calls.document_deletes += deletes;
        Ok(())
    }

    async fn probe(&self, _collection: &str) -> BackendResult<()> {
        self.calls.lock().unwrap().firestore_probes += 1;
        self.injected(
            |f| countdown(&mut f.firestore_probe),
            || BackendError::NotConfigured("Firestore database not created yet".to_string()),
        )
    }
}

#[async_trait]
impl ObjectStore for MemoryProject {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self, prefix: &str) -> BackendResult<Vec<ObjectMetadata>> {
        self.injected(
            |f| f.list_prefixes.contains(prefix),
            || BackendError::Http {
                status: 503,
                body: format!("listing {} failed", prefix),
            },
        )?;
        Ok(self
            .objects
            .read()
            .unwrap()
            .values()
            .filter(|o| o.metadata.name.starts_with(prefix))
            .map(|o| {
                let mut metadata = o.metadata.clone();
                metadata.size = Some(o.data.len().to_string());
                metadata
            })
            .collect())
    }

    async fn download(&self, path: &str) -> BackendResult<Bytes> {
        self.injected(
            |f| f.objects.contains(path),
            || BackendError::Transport(format!("connection reset downloading {}", path)),
        )?;
        self.object(path)
            .map(|o| o.data)
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }

    async fn upload(&self, object: &StorageObject) -> BackendResult<()> {
        self.injected(
            |f| f.objects.contains(object.path()),
            || BackendError::Transport(format!("connection reset uploading {}", object.path())),
        )?;
        let mut stored = object.clone();
        stored.metadata.size = None;
        self.insert_object(stored);
        self.calls.lock().unwrap().uploads += 1;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryProject {
    async fn list_users(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> BackendResult<UserPage> {
        self.injected(
            |f| f.list_users,
            || BackendError::Http {
                status: 500,
                body: "listing users failed".to_string(),
            },
        )?;
        self.calls.lock().unwrap().user_pages += 1;

        // Token is the last uid of the previous page, like the real service
        let users = self.users.read().unwrap();
        let page: Vec<AuthUser> = users
            .values()
            .filter(|u| page_token.is_none_or(|token| u.uid.as_str() > token))
            .take(page_size.max(1))
            .cloned()
            .collect();
        let has_more = page
            .last()
            .is_some_and(|last| users.keys().any(|uid| uid > &last.uid));

        Ok(UserPage {
            next_page_token: if has_more {
                page.last().map(|u| u.uid.clone())
            } else {
                None
            },
            users: page,
        })
    }

    async fn create_user(&self, user: &NewUser) -> BackendResult<()> {
        self.injected(
            |f| f.create_uids.contains(&user.uid),
            || BackendError::Rejected(format!("INVALID_EMAIL for {}", user.uid)),
        )?;
        let mut users = self.users.write().unwrap();
        if users.contains_key(&user.uid) {
            return Err(BackendError::UidAlreadyExists(user.uid.clone()));
        }
        users.insert(user.uid.clone(), AuthUser::from(user.clone()));
        self.calls.lock().unwrap().user_creates += 1;
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> BackendResult<()> {
        self.calls.lock().unwrap().user_deletes += 1;
        self.injected(
            |f| f.delete_uids.contains(uid),
            || BackendError::Http {
                status: 500,
                body: format!("deleting {} failed", uid),
            },
        )?;
        self.users
            .write()
            .unwrap()
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(uid.to_string()))
    }

    async fn probe(&self) -> BackendResult<()> {
        self.calls.lock().unwrap().auth_probes += 1;
        self.injected(
            |f| countdown(&mut f.auth_probe),
            || BackendError::PermissionDenied("Identity Toolkit API disabled".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    #[tokio::test]
    async fn test_user_paging_follows_tokens() {
        let project = MemoryProject::new("p");
        for uid in ["a", "b", "c", "d", "e"] {
            project.insert_user(AuthUser::new(uid));
        }

        let first = project.list_users(2, None).await.unwrap();
        assert_eq!(first.users.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("b"));

        let second = project.list_users(2, Some("b")).await.unwrap();
        assert_eq!(second.users[0].uid, "c");

        let last = project.list_users(2, Some("d")).await.unwrap();
        assert_eq!(last.users.len(), 1);
        assert!(last.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_exact_page_boundary_has_no_token() {
        let project = MemoryProject::new("p");
        project.insert_user(AuthUser::new("a"));
        project.insert_user(AuthUser::new("b"));
        let page = project.list_users(2, None).await.unwrap();
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_oversized_commit_rejected() {
        let project = MemoryProject::new("p");
        let ops: Vec<_> = (0..=MAX_BATCH_OPERATIONS)
            .map(|i| BatchOperation::Set(Document::new("c", i.to_string(), Map::new())))
            .collect();
        assert!(project.commit(&ops).await.is_err());
        assert!(project.calls().commits.is_empty());
    }

    #[tokio::test]
    async fn test_probe_countdown() {
        let project = MemoryProject::new("p");
        project.fail_probes(1, 0);
        assert!(DocumentStore::probe(&*project, "users").await.is_err());
        assert!(DocumentStore::probe(&*project, "users").await.is_ok());
        assert!(UserDirectory::probe(&*project).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_uid() {
        let project = MemoryProject::new("p");
        let user = NewUser::from(&AuthUser::new("a"));
        project.create_user(&user).await.unwrap();
        assert!(matches!(
            project.create_user(&user).await,
            Err(BackendError::UidAlreadyExists(_))
        ));
    }
}
