//! Cloud Storage JSON API client bound to one bucket

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::http::{FirebaseHttp, next_token};
use crate::{
    error::{BackendError, BackendResult},
    models::{ObjectMetadata, StorageObject},
    store::ObjectStore,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectMetadata>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct CloudStorageClient {
    http: Arc<FirebaseHttp>,
    endpoint: String,
    bucket: String,
}

impl CloudStorageClient {
    pub fn new(http: Arc<FirebaseHttp>, endpoint: &str, bucket: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn objects_url(&self) -> String {
        format!(
            "{}/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url(), urlencoding::encode(path))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        )
    }
}

/// Body of a `multipart/related` upload: the metadata resource followed by
/// the media, so one request writes both
fn multipart_related_body(object: &StorageObject, boundary: &str) -> BackendResult<Bytes> {
    let metadata =
        serde_json::to_vec(&object.metadata).map_err(|e| BackendError::Serde(e.to_string()))?;
    let media_type = object
        .metadata
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let mut body = BytesMut::with_capacity(object.data.len() + metadata.len() + 256);
    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&metadata);
    body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.put_slice(&object.data);
    body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Ok(body.freeze())
}

#[async_trait]
impl ObjectStore for CloudStorageClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self, prefix: &str) -> BackendResult<Vec<ObjectMetadata>> {
        let url = self.objects_url();
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let page: ListObjectsResponse = self.http.get_json(&url, &query).await?;
            objects.extend(page.items);

            page_token = next_token(page.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        debug!(bucket = %self.bucket, prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn download(&self, path: &str) -> BackendResult<Bytes> {
        self.http
            .get_bytes(&self.object_url(path), &[("alt", "media".to_string())])
            .await
    }

    async fn upload(&self, object: &StorageObject) -> BackendResult<()> {
        let boundary = format!("firebase-migrate-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(object, &boundary)?;
        self.http
            .post_raw(
                &self.upload_url(),
                &[("uploadType", "multipart".to_string())],
                &format!("multipart/related; boundary={}", boundary),
                body,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::credentials::TokenSource;

    fn client() -> CloudStorageClient {
        let http = Arc::new(FirebaseHttp::new(TokenSource::emulator()).unwrap());
        CloudStorageClient::new(http, "https://storage.googleapis.com", "demo.appspot.com")
    }

    #[test]
    fn test_object_path_is_percent_encoded() {
        assert_eq!(
            client().object_url("avatars/u 1.jpg"),
            "https://storage.googleapis.com/storage/v1/b/demo.appspot.com/o/avatars%2Fu%201.jpg"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let mut metadata = ObjectMetadata::new("test/a.txt");
        metadata.content_type = Some("text/plain".to_string());
        let object = StorageObject::new(metadata, Bytes::from_static(b"hello"));

        let body = multipart_related_body(&object, "XYZ").unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            text,
            "--XYZ\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
             {\"name\":\"test/a.txt\",\"contentType\":\"text/plain\"}\
             \r\n--XYZ\r\nContent-Type: text/plain\r\n\r\nhello\r\n--XYZ--\r\n"
        );
    }

    #[test]
    fn test_multipart_defaults_media_type() {
        let object = StorageObject::new(ObjectMetadata::new("x"), Bytes::new());
        let body = multipart_related_body(&object, "B").unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Content-Type: application/octet-stream\r\n"));
    }
}
