use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Object resource metadata as Cloud Storage reports it.
///
/// The same shape is sent back on upload, so everything except `name` and
/// the read-only `size` travels unchanged from source to target bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// Custom metadata, including Firebase's download tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Decimal byte count; the JSON API encodes it as a string
    #[serde(default, skip_serializing)]
    pub size: Option<String>,
}

impl ObjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// A storage object with its content held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct StorageObject {
    pub metadata: ObjectMetadata,
    pub data: Bytes,
}

impl StorageObject {
    pub fn new(metadata: ObjectMetadata, data: impl Into<Bytes>) -> Self {
        Self {
            metadata,
            data: data.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.metadata.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_resource_omits_size() {
        let mut meta = ObjectMetadata::new("avatars/u1.jpg");
        meta.content_type = Some("image/jpeg".to_string());
        meta.size = Some("1024".to_string());
        meta.metadata = Some(BTreeMap::from([(
            "firebaseStorageDownloadTokens".to_string(),
            "tok".to_string(),
        )]));

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "avatars/u1.jpg");
        assert_eq!(json["contentType"], "image/jpeg");
        assert_eq!(json["metadata"]["firebaseStorageDownloadTokens"], "tok");
        assert!(json.get("size").is_none());
        assert_eq!(meta.size_bytes(), Some(1024));
    }

    #[test]
    fn test_listing_resource_parses() {
        let meta: ObjectMetadata = serde_json::from_str(
            r#"{"kind":"storage#object","name":"test/a.txt","bucket":"b","size":"12","contentType":"text/plain"}"#,
        )
        .unwrap();
        assert_eq!(meta.name, "test/a.txt");
        assert_eq!(meta.size_bytes(), Some(12));
        assert!(meta.metadata.is_none());
    }
}
