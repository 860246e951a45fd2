//! Error types for fingerprinting and admission operations.
//!
//! Duplicate detections are successful outcomes and never appear here; see
//! [`crate::store::Admission`].

use thiserror::Error;

/// Errors that can occur while fingerprinting content or admitting it into a
/// membership store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SieveError {
    /// Invalid configuration (bit width, threshold range, component disagreement)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fingerprints of different widths were mixed in one operation
    #[error("bit width mismatch: {left} vs {right}")]
    WidthMismatch {
        /// Width of the fingerprint on the left of the operation.
        left: u32,
        /// Width of the fingerprint on the right of the operation.
        right: u32,
    },

    /// The feature extractor failed or produced malformed output
    #[error("feature extraction failed: {0}")]
    Extraction(String),

    /// The shared fingerprint store could not complete a call
    #[error("fingerprint store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type for fingerprinting and admission operations.
pub type Result<T> = std::result::Result<T, SieveError>;
