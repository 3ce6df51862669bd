//! Error types for labelsync-client

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the catalog client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Policy not found.
    #[error("Policy not found: {policy_id}")]
    NotFound { policy_id: String },

    /// Response body did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The policy kind has no detail endpoint.
    #[error("Unsupported policy type: {0}")]
    UnsupportedKind(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Transient failures persisted through every attempt.
    #[error("Gave up after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether the request may succeed if retried
    ///
    /// Connection errors, timeouts, HTTP 429 and 5xx responses are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<ClientError> for labelsync_core::Error {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::RetriesExhausted { attempts, source } => Self::TransientFetch {
                attempts,
                message: source.to_string(),
            },
            ClientError::NotFound { policy_id } => Self::PolicyNotFound { policy_id },
            ClientError::Config(message) => Self::InvalidConfig { message },
            other => Self::Platform {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        for status in [429, 500, 502, 503] {
            let error = ClientError::Api {
                status,
                message: String::new(),
            };
            assert!(error.is_transient(), "status {status}");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [400, 401, 403, 404] {
            let error = ClientError::Api {
                status,
                message: String::new(),
            };
            assert!(!error.is_transient(), "status {status}");
        }
    }

    #[test]
    fn exhausted_retries_become_transient_fetch() {
        let error = ClientError::RetriesExhausted {
            attempts: 4,
            source: Box::new(ClientError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        };

        let core: labelsync_core::Error = error.into();
        assert!(core.is_transient());
        assert!(core.to_string().contains("unavailable"));
    }

    #[test]
    fn api_error_keeps_status() {
        let core: labelsync_core::Error = ClientError::Api {
            status: 400,
            message: "bad payload".to_string(),
        }
        .into();

        match core {
            labelsync_core::Error::Platform { status, .. } => assert_eq!(status, Some(400)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
