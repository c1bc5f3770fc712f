//! Error taxonomy for dataset indexing, loading, and batching.
//!
//! Nothing here is retried or swallowed internally: every failure surfaces at
//! the operation that hit it. A failed item access leaves the owning dataset
//! usable for every other index.

use thiserror::Error;

/// Primary error type for all segset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    // ========== Access Errors ==========
    /// A listed entry no longer exists at access time.
    #[error("resource not found: {location}")]
    ResourceNotFound { location: String },

    /// The bytes at `location` do not parse as a supported image.
    #[error("failed to decode image {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },

    /// Remote listing or fetch failed (network, permission, encryption mismatch).
    #[error("transfer failed for {location}: {message}")]
    Transfer { location: String, message: String },

    /// Local IO failed for something other than a missing file.
    #[error("io error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Index outside `[0, len)`.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    // ========== Indexing Errors ==========
    /// The source directory could not be scanned.
    #[error("failed to list {location}: {source}")]
    Listing {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Two entries share an identifier and the index rejects collisions.
    #[error("duplicate identifier '{identifier}' ({first} and {second})")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },

    // ========== Batching Errors ==========
    /// Items in one batch have different tensor shapes.
    #[error("shape mismatch at item {index}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Collation was asked to stack zero items.
    #[error("cannot assemble a batch from zero items")]
    EmptyBatch,

    /// Tensor construction or transform failure.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    // ========== Configuration ==========
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure raised by a caller-provided collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatasetError {
    /// Returns true if repeating the same call may succeed.
    ///
    /// Only transfer failures qualify; a vanished entry or undecodable bytes
    /// will fail the same way again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    /// Returns true if the failure is specific to one item and the dataset
    /// remains valid for other indices.
    #[must_use]
    pub const fn is_item_local(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound { .. }
                | Self::Decode { .. }
                | Self::Transfer { .. }
                | Self::Io { .. }
                | Self::Tensor(_)
        )
    }

    /// Classifies an IO error raised while opening `location`.
    ///
    /// `NotFound` becomes [`DatasetError::ResourceNotFound`], anything else
    /// stays an [`DatasetError::Io`].
    #[must_use]
    pub fn from_open(location: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::ResourceNotFound {
                location: location.to_string(),
            }
        } else {
            Self::Io {
                location: location.to_string(),
                source: err,
            }
        }
    }
}

/// Result type alias for segset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transfer_is_retryable() {
        let transfer = DatasetError::Transfer {
            location: "bucket/a.jpg".into(),
            message: "connection reset".into(),
        };
        let missing = DatasetError::ResourceNotFound {
            location: "bucket/a.jpg".into(),
        };
        assert!(transfer.is_retryable());
        assert!(!missing.is_retryable());
        assert!(!DatasetError::EmptyBatch.is_retryable());
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let err = DatasetError::from_open(
            "/data/a.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let DatasetError::ResourceNotFound { location } = err else {
            panic!("expected ResourceNotFound, got {err:?}");
        };
        assert_eq!(location, "/data/a.jpg");
    }

    #[test]
    fn test_other_io_errors_stay_io() {
        let err = DatasetError::from_open(
            "/data/a.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(err.is_item_local());
    }

    #[test]
    fn test_display_includes_shapes() {
        let err = DatasetError::ShapeMismatch {
            index: 1,
            expected: vec![3, 10, 10],
            actual: vec![3, 8, 8],
        };
        let msg = err.to_string();
        assert!(msg.contains("[3, 10, 10]"));
        assert!(msg.contains("[3, 8, 8]"));
    }
}
