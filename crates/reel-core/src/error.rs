//! Error types for Reel Core

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Provider errors
    #[error("No suitable provider found for source: {file} (type: {media_type})")]
    NoSuitableProvider { file: String, media_type: String },

    #[error("Provider kind not registered: {0}")]
    ProviderNotRegistered(String),

    // Playlist errors
    #[error("Invalid playlist: {0}")]
    InvalidPlaylist(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Settings persistence errors
    #[error("Failed to persist setting '{key}': {reason}")]
    Persistence { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a persistence error
    pub fn persistence(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::Persistence {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error indicates a misconfigured player
    /// rather than a runtime condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NoSuitableProvider { .. } | Error::ProviderNotRegistered(_)
        )
    }

    /// Returns true if the session can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidPlaylist(_) | Error::Persistence { .. } | Error::Io(_)
        )
    }

    /// Returns the error code for logs and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NoSuitableProvider { .. } => "NO_PROVIDER",
            Error::ProviderNotRegistered(_) => "PROVIDER_NOT_REGISTERED",
            Error::InvalidPlaylist(_) => "INVALID_PLAYLIST",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Persistence { .. } => "PERSISTENCE",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_provider_is_fatal() {
        let err = Error::NoSuitableProvider {
            file: "clip.xyz".to_string(),
            media_type: "xyz".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "NO_PROVIDER");
        assert!(err.to_string().contains("clip.xyz"));
    }

    #[test]
    fn test_persistence_is_recoverable() {
        let err = Error::persistence("volume", "disk full");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Failed to persist setting 'volume': disk full");
    }
}
