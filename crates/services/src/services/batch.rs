//! Commit-as-you-go batching over a document store

use backend::{
    BackendResult, DocumentStore,
    models::{BatchOperation, WriteBatch},
};
use tracing::debug;

/// Feeds operations into a [`WriteBatch`] and commits it every time it
/// fills, so no commit ever exceeds the batch limit.
pub struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    batch: WriteBatch,
    commits: usize,
    committed: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, limit: usize) -> Self {
        Self {
            store,
            batch: WriteBatch::with_limit(limit),
            commits: 0,
            committed: 0,
        }
    }

    pub async fn push(&mut self, operation: BatchOperation) -> BackendResult<()> {
        if self.batch.push(operation) {
            self.flush().await?;
        }
        Ok(())
    }

    /// Push every operation, then commit whatever is left over
    pub async fn push_all(
        &mut self,
        operations: impl IntoIterator<Item = BatchOperation>,
    ) -> BackendResult<()> {
        for operation in operations {
            self.push(operation).await?;
        }
        self.flush().await
    }

    /// Commit the pending operations, if any
    pub async fn flush(&mut self) -> BackendResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let operations = self.batch.take();
        self.store.commit(&operations).await?;
        self.commits += 1;
        self.committed += operations.len();
        debug!(
            batch = self.commits,
            size = operations.len(),
            total = self.committed,
            "Committed batch"
        );
        Ok(())
    }

    /// Number of successful commits so far
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Operations applied by successful commits so far
    pub fn committed(&self) -> usize {
        self.committed
    }
}
