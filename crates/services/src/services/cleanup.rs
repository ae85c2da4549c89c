//! Deletes migrated data from the source project once the operator has
//! confirmed the migration

use std::{fmt, io};

use backend::{DocumentStore, Project, UserDirectory, models::BatchOperation};
use serde::Serialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{batch::BatchWriter, config::MigrationConfig};

/// The operator must type exactly this to allow any delete
pub const CONFIRMATION_PHRASE: &str = "YES";

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cannot read confirmation: {0}")]
    Prompt(#[from] io::Error),
}

/// Asks the operator to confirm a destructive action and returns what they typed
pub trait Confirmation {
    fn ask(&self, prompt: &str) -> io::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CleanupPhase {
    #[default]
    Full,
    Firestore,
    Auth,
}

impl CleanupPhase {
    fn includes_firestore(self) -> bool {
        matches!(self, Self::Full | Self::Firestore)
    }

    fn includes_auth(self) -> bool {
        matches!(self, Self::Full | Self::Auth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionDeleteReport {
    pub collection: String,
    pub documents_deleted: usize,
    pub batches_committed: usize,
    pub error: Option<String>,
}

impl fmt::Display for CollectionDeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} documents deleted", self.collection, self.documents_deleted)?;
        if let Some(e) = &self.error {
            write!(f, " (FAILED: {})", e)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserDeleteReport {
    pub users_seen: usize,
    pub deleted: usize,
    pub failed: Vec<String>,
    pub error: Option<String>,
}

impl fmt::Display for UserDeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "auth: {} of {} users deleted, {} failed",
            self.deleted,
            self.users_seen,
            self.failed.len()
        )?;
        if let Some(e) = &self.error {
            write!(f, " (listing stopped: {})", e)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub collections: Vec<CollectionDeleteReport>,
    pub auth: Option<UserDeleteReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Confirmation did not match; nothing was deleted
    Aborted,
    Completed(CleanupReport),
}

pub struct SourceCleanup<'a> {
    project_id: &'a str,
    documents: &'a dyn DocumentStore,
    users: &'a dyn UserDirectory,
    collections: &'a [String],
    batch_size: usize,
    page_size: usize,
}

impl<'a> SourceCleanup<'a> {
    pub fn new(source: &'a Project, config: &'a MigrationConfig) -> Self {
        Self {
            project_id: &source.project_id,
            documents: source.documents.as_ref(),
            users: source.users.as_ref(),
            collections: &config.collections,
            batch_size: config.batch_size(),
            page_size: config.auth_page_size(),
        }
    }

    pub fn prompt(&self, phase: CleanupPhase) -> String {
        let mut targets = Vec::new();
        if phase.includes_firestore() {
            targets.push(format!("all documents in {} collections", self.collections.len()));
        }
        if phase.includes_auth() {
            targets.push("all Auth users".to_string());
        }
        format!(
            "This permanently deletes {} from project '{}'. Type {} to continue",
            targets.join(" and "),
            self.project_id,
            CONFIRMATION_PHRASE
        )
    }

    /// Ask for confirmation and, only if it matches exactly, delete the data
    /// the phase covers
    pub async fn run(
        &self,
        phase: CleanupPhase,
        confirmation: &dyn Confirmation,
    ) -> Result<CleanupOutcome, CleanupError> {
        let answer = confirmation.ask(&self.prompt(phase))?;
        if answer != CONFIRMATION_PHRASE {
            warn!(project_id = %self.project_id, "Cleanup not confirmed, nothing deleted");
            return Ok(CleanupOutcome::Aborted);
        }

        info!(project_id = %self.project_id, phase = %phase, "Starting source cleanup");
        let mut report = CleanupReport::default();
        if phase.includes_firestore() {
            report.collections = self.delete_collections().await;
        }
        if phase.includes_auth() {
            report.auth = Some(self.delete_users().await);
        }
        Ok(CleanupOutcome::Completed(report))
    }

    async fn delete_collections(&self) -> Vec<CollectionDeleteReport> {
        let mut reports = Vec::with_capacity(self.collections.len());
        for collection in self.collections {
            let report = self.delete_collection(collection).await;
            match &report.error {
                None => info!(
                    collection = %collection,
                    deleted = report.documents_deleted,
                    "Collection cleaned up"
                ),
                Some(e) => error!(
                    collection = %collection,
                    deleted = report.documents_deleted,
                    error = %e,
                    "Collection cleanup failed, continuing with next collection"
                ),
            }
            reports.push(report);
        }
        reports
    }

    async fn delete_collection(&self, collection: &str) -> CollectionDeleteReport {
        let mut report = CollectionDeleteReport {
            collection: collection.to_string(),
            documents_deleted: 0,
            batches_committed: 0,
            error: None,
        };

        let documents = match self.documents.list_documents(collection).await {
            Ok(documents) => documents,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };

        let mut writer = BatchWriter::new(self.documents, self.batch_size);
        let result = writer
            .push_all(
                documents
                    .into_iter()
                    .map(|d| BatchOperation::delete(d.collection, d.id)),
            )
            .await;

        report.documents_deleted = writer.committed();
        report.batches_committed = writer.commits();
        if let Err(e) = result {
            report.error = Some(e.to_string());
        }
        report
    }

    async fn delete_users(&self) -> UserDeleteReport {
        let mut report = UserDeleteReport::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self
                .users
                .list_users(self.page_size, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "Failed to list users for cleanup");
                    report.error = Some(e.to_string());
                    break;
                }
            };

            for user in &page.users {
                report.users_seen += 1;
                match self.users.delete_user(&user.uid).await {
                    Ok(()) => {
                        info!(uid = %user.uid, "Deleted user");
                        report.deleted += 1;
                    }
                    Err(e) => {
                        warn!(uid = %user.uid, error = %e, "Failed to delete user");
                        report.failed.push(user.uid.clone());
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        report
    }
}
