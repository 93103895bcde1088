use std::time::Duration;

use reqwest::StatusCode;

/// Failures a classification attempt can end in.
///
/// `EmptyMessage` is raised before any backend is consulted. `InvalidRule`
/// and `InvalidConfig` only surface while a classifier is being built and
/// are fatal at startup. Everything else belongs to the remote backend or to request
/// sequencing.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("message is empty or contains only whitespace")]
    EmptyMessage,

    #[error("rule '{label}' has an invalid pattern: {source}")]
    InvalidRule {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("classification timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request was cancelled before it completed")]
    Cancelled,
}

impl ClassifyError {
    /// True for failures of the network round trip itself.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ClassifyError::Timeout { .. }
                | ClassifyError::Http { .. }
                | ClassifyError::Transport(_)
                | ClassifyError::Decode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_grouping() {
        assert!(ClassifyError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transport_failure());
        assert!(ClassifyError::Decode("bad".to_string()).is_transport_failure());
        assert!(!ClassifyError::EmptyMessage.is_transport_failure());
        assert!(!ClassifyError::Cancelled.is_transport_failure());
        assert!(!ClassifyError::InvalidConfig("floor".to_string()).is_transport_failure());
    }

    #[test]
    fn test_http_error_message() {
        let err = ClassifyError::Http {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream down");
    }
}
