//! Error types for SwarmAudit core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using SwarmAuditError
pub type Result<T> = std::result::Result<T, SwarmAuditError>;

/// Errors that can occur in SwarmAudit core operations
#[derive(Error, Debug)]
pub enum SwarmAuditError {
    /// Benchmark output directory could not be created
    #[error("Failed to create benchmark directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Benchmark record could not be written
    #[error("Failed to write benchmark record {path}: {source}")]
    WriteRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Benchmark store could not be read
    #[error("Failed to read benchmark store {path}: {source}")]
    ReadRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every index up to `u32::MAX` is already used in this store
    #[error("No benchmark index left in {path}")]
    IndexExhausted { path: PathBuf },

    /// Duration is NaN or infinite and cannot be stored
    #[error("Invalid benchmark duration: {0}")]
    InvalidDuration(f64),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SwarmAuditError {
    /// True when the error means a run could not be persisted
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            SwarmAuditError::CreateDir { .. }
                | SwarmAuditError::WriteRecord { .. }
                | SwarmAuditError::IndexExhausted { .. }
        )
    }
}
