//! Error types for labelsync-core

/// Result type for labelsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in labelsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fetch kept failing with transient errors until retries ran out
    #[error("Fetch failed after {attempts} attempt(s): {message}")]
    TransientFetch { attempts: u32, message: String },

    /// The platform rejected a request
    #[error(
        "Platform error{}: {message}",
        status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    Platform {
        status: Option<u16>,
        message: String,
    },

    /// Policy does not exist on the platform
    #[error("Policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    /// Settings failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error in registry operations
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Filesystem error from labelsync-fs
    #[error(transparent)]
    Fs(#[from] labelsync_fs::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }
}
