//! Marketplace error types
//!
//! Validation problems are never represented here: they are data carried by
//! [`crate::validator::ValidationResult`]. Everything in this enum aborts the
//! operation that raised it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by catalog lookups and the install pipeline
#[derive(Error, Debug)]
pub enum MarketplaceError {
    /// Catalog id has no matching component
    #[error("Component with ID '{id}' not found")]
    ComponentNotFound { id: String },

    /// A declared subpath does not exist in the retrieved tree
    #[error("Component source path not found: {path}")]
    SubpathNotFound { path: PathBuf },

    /// Target install directory is already present
    #[error("Component directory already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Component name cannot be used as a directory name
    #[error("Component name '{name}' is not a valid directory name")]
    InvalidComponentName { name: String },

    /// Network or VCS failure while fetching the repository
    #[error("Failed to retrieve {url} (branch '{branch}'): {message}")]
    Retrieval {
        url: String,
        branch: String,
        message: String,
    },

    /// Repository retrieval exceeded the configured clone timeout
    #[error("Retrieval of {url} timed out after {seconds}s")]
    RetrievalTimeout { url: String, seconds: u64 },

    /// Resolved source tree exceeds the configured size ceiling
    #[error("Component is {actual_bytes} bytes, exceeding the {limit_bytes} byte limit")]
    ComponentTooLarge { actual_bytes: u64, limit_bytes: u64 },

    /// Filesystem failure during staging, materialization or stamping
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog backend failure
    #[error("Catalog error: {0}")]
    Catalog(#[source] anyhow::Error),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Offloaded work could not be scheduled or panicked
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl MarketplaceError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable kind, used in tool responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ComponentNotFound { .. } | Self::SubpathNotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidComponentName { .. } => "invalid_name",
            Self::Retrieval { .. } | Self::RetrievalTimeout { .. } => "retrieval_failure",
            Self::ComponentTooLarge { .. } | Self::Io { .. } => "io_failure",
            Self::Catalog(_) => "catalog_failure",
            Self::Config(_) => "configuration_error",
            Self::WorkerPool(_) => "internal",
        }
    }
}

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, MarketplaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketplaceError::ComponentNotFound {
            id: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Component with ID 'missing' not found");

        let err = MarketplaceError::ComponentTooLarge {
            actual_bytes: 2048,
            limit_bytes: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Component is 2048 bytes, exceeding the 1024 byte limit"
        );
    }

    #[test]
    fn test_error_kinds() {
        let err = MarketplaceError::SubpathNotFound {
            path: PathBuf::from("/tmp/x/sub"),
        };
        assert_eq!(err.kind(), "not_found");

        let err = MarketplaceError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "io_failure");
        assert!(err.to_string().contains("/tmp/x"));
    }
}
