//! Error types for teltrack-core.

use thiserror::Error;

/// Result type alias for teltrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for teltrack operations.
///
/// Reconstruction itself never fails; empty results are normal outcomes.
/// Errors only arise while building a configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fewer cut pairs than the four mandatory stages need.
    #[error("expected at least 4 cut pairs (doublet, triplet, slope, position), found {found}")]
    InvalidCuts { found: usize },

    /// More cut pairs than there are stages.
    #[error("expected at most 5 cut pairs, found {found}")]
    TooManyCuts { found: usize },

    /// A cut value that is negative or not finite.
    #[error("invalid cut #{index}: ({x}, {y})")]
    InvalidCut { index: usize, x: f64, y: f64 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
