//! Copies Firestore collections between projects, preserving document IDs

use std::fmt;

use backend::{DocumentStore, Project, models::BatchOperation};
use serde::Serialize;
use tracing::{error, info};

use super::batch::BatchWriter;

/// Outcome of copying one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCopyReport {
    pub collection: String,
    pub documents_read: usize,
    pub documents_copied: usize,
    pub batches_committed: usize,
    pub error: Option<String>,
}

impl CollectionCopyReport {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            documents_read: 0,
            documents_copied: 0,
            batches_committed: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for CollectionCopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(
                f,
                "{}: {} documents copied",
                self.collection, self.documents_copied
            ),
            Some(e) => write!(
                f,
                "{}: FAILED after {} of {} documents copied ({})",
                self.collection, self.documents_copied, self.documents_read, e
            ),
        }
    }
}

pub struct CollectionCopier<'a> {
    source: &'a dyn DocumentStore,
    target: &'a dyn DocumentStore,
    batch_size: usize,
}

impl<'a> CollectionCopier<'a> {
    pub fn new(source: &'a Project, target: &'a Project, batch_size: usize) -> Self {
        Self {
            source: source.documents.as_ref(),
            target: target.documents.as_ref(),
            batch_size,
        }
    }

    /// Copy each collection in order. A failed collection is logged and the
    /// next one is still attempted.
    pub async fn copy_all(&self, collections: &[String]) -> Vec<CollectionCopyReport> {
        let mut reports = Vec::with_capacity(collections.len());

        for collection in collections {
            info!(collection = %collection, "Copying collection");
            let report = self.copy_collection(collection).await;
            match &report.error {
                None => info!(
                    collection = %collection,
                    documents = report.documents_copied,
                    batches = report.batches_committed,
                    "Collection copied"
                ),
                Some(e) => error!(
                    collection = %collection,
                    copied = report.documents_copied,
                    error = %e,
                    "Collection copy failed, continuing with next collection"
                ),
            }
            reports.push(report);
        }

        reports
    }

    /// Read the whole collection, then write it to the same-named target
    /// collection in batches
    pub async fn copy_collection(&self, collection: &str) -> CollectionCopyReport {
        let mut report = CollectionCopyReport::new(collection);

        let documents = match self.source.list_documents(collection).await {
            Ok(documents) => documents,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.documents_read = documents.len();

        let mut writer = BatchWriter::new(self.target, self.batch_size);
        let result = writer
            .push_all(documents.into_iter().map(BatchOperation::Set))
            .await;

        report.documents_copied = writer.committed();
        report.batches_committed = writer.commits();
        if let Err(e) = result {
            report.error = Some(e.to_string());
        }
        report
    }
}
