//! # Cloud Error Types
//!
//! Errors returned by the cloud client interfaces, classified the way the
//! engine needs them: benign not-found, transient (retry with backoff) and
//! permanent (retry bounded, surface to the user).

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    /// 404; also what the cloud answers when the caller lacks permission to see the resource
    #[error("NotAuthorizedOrNotFound: {0}")]
    NotAuthorizedOrNotFound(String),
    /// 401 / 403
    #[error("NotAuthorized: {0}")]
    NotAuthorized(String),
    /// 400
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),
    /// 409
    #[error("Conflict: {0}")]
    Conflict(String),
    /// 409 raised because a delete is already in flight
    #[error("AlreadyDeleting: {0}")]
    AlreadyDeleting(String),
    /// 429
    #[error("TooManyRequests: {0}")]
    TooManyRequests(String),
    /// 5xx
    #[error("ServiceUnavailable: {0}")]
    ServiceUnavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl CloudError {
    /// Map an HTTP status code and service message onto the taxonomy
    pub fn from_status(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotAuthorizedOrNotFound(message),
            401 | 403 => Self::NotAuthorized(message),
            400 | 422 => Self::InvalidParameter(message),
            409 if is_already_deleting(code, &message) => Self::AlreadyDeleting(message),
            409 | 412 => Self::Conflict(message),
            429 => Self::TooManyRequests(message),
            500..=599 => Self::ServiceUnavailable(message),
            _ => Self::InvalidResponse(format!("unexpected status {status}: {message}")),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotAuthorizedOrNotFound(_))
    }

    pub fn is_already_deleting(&self) -> bool {
        matches!(self, Self::AlreadyDeleting(_))
    }

    /// Transient errors are expected to clear on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_)
                | Self::AlreadyDeleting(_)
                | Self::TooManyRequests(_)
                | Self::ServiceUnavailable(_)
                | Self::Transport(_)
        )
    }

    /// Reason string for metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthorizedOrNotFound(_) => "not_found",
            Self::NotAuthorized(_) => "not_authorized",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::Conflict(_) => "conflict",
            Self::AlreadyDeleting(_) => "already_deleting",
            Self::TooManyRequests(_) => "too_many_requests",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

fn is_already_deleting(code: Option<&str>, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    code == Some("IncorrectState")
        && (message.contains("being deleted")
            || message.contains("deleting")
            || message.contains("terminat"))
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(CloudError::from_status(404, None, "gone").is_not_found());
        assert!(matches!(
            CloudError::from_status(403, None, "no"),
            CloudError::NotAuthorized(_)
        ));
        assert!(CloudError::from_status(503, None, "busy").is_transient());
        assert!(CloudError::from_status(429, None, "slow down").is_transient());
        assert!(!CloudError::from_status(400, None, "bad").is_transient());
    }

    #[test]
    fn test_already_deleting_needs_incorrect_state_code() {
        let deleting =
            CloudError::from_status(409, Some("IncorrectState"), "Resource is being deleted");
        assert!(deleting.is_already_deleting());

        let conflict = CloudError::from_status(409, Some("Conflict"), "Resource is being deleted");
        assert!(!conflict.is_already_deleting());
        assert_eq!(conflict.as_str(), "conflict");
    }
}
