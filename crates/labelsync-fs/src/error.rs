//! Error types for labelsync-fs

use std::path::PathBuf;

/// Result type for labelsync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Direction of a failed format conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Decode,
    Encode,
}

impl std::fmt::Display for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode => f.write_str("decode"),
            Self::Encode => f.write_str("encode"),
        }
    }
}

/// Errors from file access and config conversion
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sidecar lock could not be taken
    #[error("could not lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not {conversion} {} as {format}: {message}", path.display())]
    Format {
        path: PathBuf,
        format: &'static str,
        conversion: Conversion,
        message: String,
    },

    /// Extension is not one of toml, json, yaml, yml
    #[error("unsupported settings format {extension:?}")]
    UnsupportedFormat { extension: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn lock(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Lock {
            path: path.into(),
            source,
        }
    }
}
