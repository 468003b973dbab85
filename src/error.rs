//! Error handling for Aura
//!
//! One enum covers the whole taxonomy: configuration validation fails fast
//! before any processing, I/O boundary errors are surfaced verbatim, stage
//! errors terminate the owning chunk, and cancellation is a distinct terminal
//! state rather than a failure.

use thiserror::Error;

/// Result type alias for Aura operations
pub type Result<T> = std::result::Result<T, AuraError>;

/// Main error type for Aura operations
#[derive(Error, Debug)]
pub enum AuraError {
    // File / codec boundary
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Configuration validation
    #[error("Invalid {stage} parameter '{param}': {value} (expected {expected})")]
    InvalidParameter {
        stage: &'static str,
        param: &'static str,
        value: String,
        expected: &'static str,
    },

    // Stage execution
    #[error("{stage} stage failed: {reason}")]
    Stage {
        stage: &'static str,
        reason: String,
    },

    #[error("Separation model '{model}' unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    #[error("Resource exhausted: {details}")]
    ResourceExhausted { details: String },

    // Terminal states
    #[error("Job cancelled")]
    Cancelled,

    #[error("Another job is already running on this engine")]
    EngineBusy,

    // I/O and serialization passthrough
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuraError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AuraError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AuraError::Decode { .. } => "DECODE_ERROR",
            AuraError::Encode { .. } => "ENCODE_ERROR",
            AuraError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AuraError::EmptyAudio => "EMPTY_AUDIO",
            AuraError::InvalidParameter { .. } => "INVALID_PARAMETER",
            AuraError::Stage { .. } => "STAGE_ERROR",
            AuraError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            AuraError::Inference { .. } => "INFERENCE_ERROR",
            AuraError::ResourceExhausted { .. } => "RESOURCE_EXHAUSTED",
            AuraError::Cancelled => "CANCELLED",
            AuraError::EngineBusy => "ENGINE_BUSY",
            AuraError::Io(_) => "IO_ERROR",
            AuraError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for the user-requested terminal state, which callers should not
    /// report as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuraError::Cancelled)
    }

    /// True for errors the caller can fix by correcting input or configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuraError::FileNotFound { .. }
                | AuraError::InvalidParameter { .. }
                | AuraError::UnsupportedFormat { .. }
                | AuraError::Decode { .. }
                | AuraError::ResourceExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AuraError::InvalidParameter {
            stage: "eq",
            param: "low_gain_db",
            value: "99".to_string(),
            expected: "-24 to +24 dB",
        };
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_cancelled_is_not_a_failure() {
        let err = AuraError::Cancelled;
        assert!(err.is_cancelled());
        assert!(!err.is_recoverable());
    }
}
