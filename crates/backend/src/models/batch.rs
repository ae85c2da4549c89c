use super::document::Document;

/// Firestore rejects commits carrying more writes than this
pub const MAX_BATCH_OPERATIONS: usize = 500;

/// One write inside a batch commit
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    /// Create or overwrite the document under its own ID
    Set(Document),
    Delete { collection: String, id: String },
}

impl BatchOperation {
    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Self::Set(document) => &document.collection,
            Self::Delete { collection, .. } => collection,
        }
    }
}

/// Accumulates operations up to a limit that never exceeds
/// [`MAX_BATCH_OPERATIONS`]. The owner commits when [`WriteBatch::push`]
/// reports the batch full and calls [`WriteBatch::take`] to reset it.
#[derive(Debug)]
pub struct WriteBatch {
    operations: Vec<BatchOperation>,
    limit: usize,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::with_limit(MAX_BATCH_OPERATIONS)
    }

    /// Limits outside `1..=MAX_BATCH_OPERATIONS` are clamped into range
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_BATCH_OPERATIONS);
        Self {
            operations: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Adds an operation. Returns true once the batch has reached its limit.
    pub fn push(&mut self, operation: BatchOperation) -> bool {
        debug_assert!(self.operations.len() < self.limit, "push into a full batch");
        self.operations.push(operation);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.operations.len() >= self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drains the accumulated operations, leaving an empty batch behind
    pub fn take(&mut self) -> Vec<BatchOperation> {
        std::mem::replace(&mut self.operations, Vec::with_capacity(self.limit))
    }
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn set(id: usize) -> BatchOperation {
        BatchOperation::Set(Document::new("users", format!("u{id}"), Map::new()))
    }

    #[test]
    fn test_push_reports_full_at_limit() {
        let mut batch = WriteBatch::with_limit(3);
        assert!(!batch.push(set(1)));
        assert!(!batch.push(set(2)));
        assert!(batch.push(set(3)));
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_take_resets_batch() {
        let mut batch = WriteBatch::with_limit(2);
        batch.push(set(1));
        batch.push(set(2));
        let taken = batch.take();
        assert_eq!(taken.len(), 2);
        assert!(batch.is_empty());
        assert!(!batch.is_full());
    }

    #[test]
    fn test_limit_is_clamped_to_backend_ceiling() {
        assert_eq!(WriteBatch::with_limit(10_000).limit(), MAX_BATCH_OPERATIONS);
        assert_eq!(WriteBatch::with_limit(0).limit(), 1);
        assert_eq!(WriteBatch::new().limit(), 500);
    }

    #[test]
    fn test_operation_collection() {
        assert_eq!(set(1).collection(), "users");
        assert_eq!(BatchOperation::delete("prayers", "p1").collection(), "prayers");
    }
}
