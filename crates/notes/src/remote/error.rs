//! Error taxonomy for notes service requests

/// Failure of a single request to the notes service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        /// `Retry-After` header in seconds, when sent
        retry_after: Option<u64>,
        body: String,
    },

    /// No response at all (DNS, TLS, connection reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The credential cannot be recovered for this run
    #[error("Authentication failed: {0}")]
    AuthFatal(String),

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status, when the service responded
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `Retry-After` hint in seconds
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// 401/403: the short-lived token was rejected
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Rate limiting, server errors and transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            ApiError::Network(_) => true,
            _ => false,
        }
    }

    pub fn is_auth_fatal(&self) -> bool {
        matches!(self, ApiError::AuthFatal(_))
    }

    /// Promote any failure to an unrecoverable credential failure
    pub fn into_auth_fatal(self) -> ApiError {
        match self {
            ApiError::AuthFatal(_) => self,
            other => ApiError::AuthFatal(other.to_string()),
        }
    }
}

/// Check whether an error chain carries an [`ApiError::AuthFatal`]
pub fn is_auth_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<ApiError>().is_some_and(ApiError::is_auth_fatal))
}
