use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Firestore document identified by `(collection, id)`.
///
/// `fields` keeps the typed values exactly as the backend returned them
/// (`{"stringValue": ...}`, `{"mapValue": ...}` and so on), so a copy is
/// field-for-field without any schema knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            fields,
        }
    }

    /// Path relative to the database root, e.g. `users/abc123`
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}
