//! Error types for the gaze orientation library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A landmark index required by an estimator is missing from the input set
    #[error("Insufficient landmarks: index {index} required, only {available} available")]
    InsufficientLandmarks {
        /// Landmark index that was requested
        index: usize,
        /// Number of landmarks present in the set
        available: usize,
    },

    /// The perspective-n-point solve did not produce a usable pose
    #[error("Pose solve failure: {0}")]
    PoseSolveFailure(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether the error only affects the current frame.
    ///
    /// Recoverable errors leave the frame unannotated and produce no label;
    /// the next frame is processed independently.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientLandmarks { .. } | Self::PoseSolveFailure(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::InsufficientLandmarks { index: 477, available: 468 }.is_recoverable());
        assert!(Error::PoseSolveFailure("degenerate".to_string()).is_recoverable());
        assert!(!Error::ConfigError("bad".to_string()).is_recoverable());
        assert!(!Error::InvalidInput("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InsufficientLandmarks { index: 152, available: 10 };
        assert_eq!(
            err.to_string(),
            "Insufficient landmarks: index 152 required, only 10 available"
        );
    }
}
