//! Error types for the recording core
//!
//! One enum per collaborator concern, folded into [`SessionError`] at the
//! session boundary.

use thiserror::Error;

use crate::capture::CaptureSource;

/// Failure to acquire a capture stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Permission denied for {source_kind}: {reason}")]
    PermissionDenied {
        source_kind: CaptureSource,
        reason: String,
    },

    #[error("No {source_kind} device available: {reason}")]
    DeviceUnavailable {
        source_kind: CaptureSource,
        reason: String,
    },
}

impl CaptureError {
    pub fn source_kind(&self) -> CaptureSource {
        match self {
            CaptureError::PermissionDenied { source_kind, .. }
            | CaptureError::DeviceUnavailable { source_kind, .. } => *source_kind,
        }
    }
}

/// Failure reported by the encoder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("Encoder could not be created for {mime_type}: {reason}")]
    Create { mime_type: String, reason: String },

    #[error("Encoder operation '{operation}' failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },
}

/// Failure of an output collaborator (artifact sink or overlay host)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("Artifact delivery failed: {0}")]
    Delivery(String),

    #[error("Preview overlay failed: {0}")]
    Overlay(String),
}

/// Invalid recorder configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown video format: {0}")]
    UnknownFormat(String),

    #[error("Unknown video quality: {0}")]
    UnknownQuality(String),

    #[error("Frame rate must be between 1 and 240, got {0}")]
    FrameRate(u32),

    #[error("Invalid file prefix: {0:?}")]
    FilePrefix(String),

    #[error("Malformed configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Errors surfaced by [`crate::RecordingSession`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Permission denied for {source_kind}: {reason}")]
    PermissionDenied {
        source_kind: CaptureSource,
        reason: String,
    },

    #[error("No {source_kind} device available: {reason}")]
    DeviceUnavailable {
        source_kind: CaptureSource,
        reason: String,
    },

    #[error("Encoder fault: {0}")]
    EncoderFault(String),

    #[error("A recording session is already active")]
    AlreadyActive,

    #[error("Recorder is busy waiting for capture permission")]
    Busy,

    #[error("Artifact delivery failed: {0}")]
    DeliveryFailed(String),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied {
                source_kind,
                reason,
            } => SessionError::PermissionDenied {
                source_kind,
                reason,
            },
            CaptureError::DeviceUnavailable {
                source_kind,
                reason,
            } => SessionError::DeviceUnavailable {
                source_kind,
                reason,
            },
        }
    }
}

impl From<EncoderError> for SessionError {
    fn from(err: EncoderError) -> Self {
        SessionError::EncoderFault(err.to_string())
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
