//! Authenticated JSON/bytes transport shared by the Firebase REST clients

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use super::credentials::TokenSource;
use crate::error::{BackendError, BackendResult};

/// Google API error envelope: `{"error": {"code": 400, "message": "...", "status": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct FirebaseHttp {
    http: Client,
    tokens: TokenSource,
}

impl FirebaseHttp {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(tokens: TokenSource) -> BackendResult<Self> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("firebase-migrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self { http, tokens })
    }

    /// Send the request produced by `build`, retrying transient failures.
    /// `build` runs once per attempt so the request body can be replayed.
    pub async fn execute<F>(&self, build: F) -> BackendResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        (|| async {
            let token = self.tokens.access_token().await?;
            let res = build(&self.http)
                .bearer_auth(token)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            check_status(res).await
        })
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(3)
                .with_jitter(),
        )
        .when(|e: &BackendError| e.should_retry())
        .notify(|e, dur| {
            warn!(
                "Firebase API call failed, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                e
            )
        })
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> BackendResult<T> {
        let res = self.execute(|http| http.get(url).query(query)).await?;
        res.json::<T>()
            .await
            .map_err(|e| BackendError::Serde(e.to_string()))
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> BackendResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.execute(|http| http.post(url).json(body)).await?;
        res.json::<T>()
            .await
            .map_err(|e| BackendError::Serde(e.to_string()))
    }

    /// GET raw bytes exactly as stored. Asking for gzip keeps the server from
    /// decoding objects stored with `Content-Encoding: gzip`, and the client
    /// never decodes, so such objects arrive byte-for-byte.
    pub async fn get_bytes(&self, url: &str, query: &[(&str, String)]) -> BackendResult<Bytes> {
        let res = self
            .execute(|http| {
                http.get(url)
                    .query(query)
                    .header(reqwest::header::ACCEPT_ENCODING, "gzip")
            })
            .await?;
        res.bytes().await.map_err(map_reqwest_error)
    }

    /// POST a raw body and ignore the response content
    pub async fn post_raw(
        &self,
        url: &str,
        query: &[(&str, String)],
        content_type: &str,
        body: Bytes,
    ) -> BackendResult<()> {
        self.execute(|http| {
            http.post(url)
                .query(query)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body.clone())
        })
        .await?;
        Ok(())
    }
}

async fn check_status(res: Response) -> BackendResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(classify_error(status, &body))
}

/// Map an unsuccessful response onto the error taxonomy the services act on
pub(crate) fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());
    let api_status = envelope
        .as_ref()
        .and_then(|e| e.error.status.clone())
        .unwrap_or_default();

    if message.starts_with("DUPLICATE_LOCAL_ID") || message.starts_with("UID_ALREADY_EXISTS") {
        return BackendError::UidAlreadyExists(message);
    }
    if api_status == "FAILED_PRECONDITION" || message.starts_with("CONFIGURATION_NOT_FOUND") {
        return BackendError::NotConfigured(message);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        s => BackendError::Http {
            status: s.as_u16(),
            body: message,
        },
    }
}

fn map_reqwest_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(e.to_string())
    }
}

/// Empty page tokens mean "no more pages" just like absent ones
pub(crate) fn next_token(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_uid_is_recognised() {
        let body = r#"{"error":{"code":400,"message":"DUPLICATE_LOCAL_ID","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, body),
            BackendError::UidAlreadyExists(_)
        ));
    }

    #[test]
    fn test_failed_precondition_means_not_configured() {
        let body = r#"{"error":{"code":400,"message":"The Cloud Firestore API is not available for Firestore in Datastore Mode database","status":"FAILED_PRECONDITION"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, BackendError::NotConfigured(_)));
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, "nope"),
            BackendError::PermissionDenied(m) if m == "nope"
        ));
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            BackendError::RateLimited
        ));
        assert!(matches!(
            classify_error(StatusCode::BAD_GATEWAY, "<html>"),
            BackendError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_empty_page_token_ends_paging() {
        assert_eq!(next_token(Some(String::new())), None);
        assert_eq!(next_token(Some("abc".into())), Some("abc".into()));
        assert_eq!(next_token(None), None);
    }
}
