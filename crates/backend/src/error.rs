use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("service not configured: {0}")]
    NotConfigured(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("user {0} already exists")]
    UidAlreadyExists(String),
    #[error("rejected by backend: {0}")]
    Rejected(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("credentials error: {0}")]
    Credentials(String),
}

impl BackendError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Errors a freshly provisioned project returns until its services are enabled
    /// and the service account's roles have propagated.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::NotConfigured(_) | Self::NotFound(_)
        )
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
