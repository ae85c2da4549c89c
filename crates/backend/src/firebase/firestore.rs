//! Firestore REST client

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::http::{FirebaseHttp, next_token};
use crate::{
    error::BackendResult,
    models::{BatchOperation, Document},
    store::DocumentStore,
};

const LIST_PAGE_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Write {
    Update(RawDocument),
    Delete(String),
}

pub struct FirestoreClient {
    http: Arc<FirebaseHttp>,
    /// `{endpoint}/v1/projects/{id}/databases/(default)/documents`
    documents_url: String,
    /// `projects/{id}/databases/(default)/documents`, the prefix of every document name
    database_path: String,
}

impl FirestoreClient {
    pub fn new(http: Arc<FirebaseHttp>, endpoint: &str, project_id: &str) -> Self {
        let database_path = format!("projects/{}/databases/(default)/documents", project_id);
        Self {
            http,
            documents_url: format!("{}/v1/{}", endpoint.trim_end_matches('/'), database_path),
            database_path,
        }
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.database_path, collection, id)
    }

    fn to_write(&self, operation: &BatchOperation) -> Write {
        match operation {
            BatchOperation::Set(document) => Write::Update(RawDocument {
                name: self.document_name(&document.collection, &document.id),
                fields: document.fields.clone(),
            }),
            BatchOperation::Delete { collection, id } => {
                Write::Delete(self.document_name(collection, id))
            }
        }
    }

    async fn list_page(
        &self,
        collection: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> BackendResult<ListDocumentsResponse> {
        let url = format!("{}/{}", self.documents_url, collection);
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.http.get_json(&url, &query).await
    }
}

/// Last path segment of a fully-qualified document name
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> BackendResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(collection, LIST_PAGE_SIZE, page_token.as_deref())
                .await?;
            documents.extend(page.documents.into_iter().map(|raw| {
                let id = document_id(&raw.name).to_string();
                Document::new(collection, id, raw.fields)
            }));

            page_token = next_token(page.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        debug!(collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    async fn commit(&self, operations: &[BatchOperation]) -> BackendResult<()> {
        if operations.is_empty() {
            return Ok(());
        }
        let request = CommitRequest {
            writes: operations.iter().map(|op| self.to_write(op)).collect(),
        };
        let url = format!("{}:commit", self.documents_url);
        let _: Value = self.http.post_json(&url, &request).await?;
        Ok(())
    }

    async fn probe(&self, collection: &str) -> BackendResult<()> {
        self.list_page(collection, 1, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::firebase::credentials::TokenSource;

    fn client() -> FirestoreClient {
        let http = Arc::new(FirebaseHttp::new(TokenSource::emulator()).unwrap());
        FirestoreClient::new(http, "http://localhost:8080/", "demo")
    }

    #[test]
    fn test_document_id_from_name() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/users/abc"),
            "abc"
        );
        assert_eq!(document_id("abc"), "abc");
    }

    #[test]
    fn test_urls_are_rooted_at_default_database() {
        let client = client();
        assert_eq!(
            client.documents_url,
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
        assert_eq!(
            client.document_name("users", "u1"),
            "projects/demo/databases/(default)/documents/users/u1"
        );
    }

    #[test]
    fn test_commit_request_shape() {
        let client = client();
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!({"stringValue": "Ann"}));
        let operations = [
            BatchOperation::Set(Document::new("users", "u1", fields)),
            BatchOperation::delete("users", "u2"),
        ];
        let request = CommitRequest {
            writes: operations.iter().map(|op| client.to_write(op)).collect(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "writes": [
                    {"update": {
                        "name": "projects/demo/databases/(default)/documents/users/u1",
                        "fields": {"name": {"stringValue": "Ann"}}
                    }},
                    {"delete": "projects/demo/databases/(default)/documents/users/u2"}
                ]
            })
        );
    }
}
