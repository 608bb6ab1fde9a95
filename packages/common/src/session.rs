use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::format::{Format, Quality};

/// Unique identifier for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recording session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No session active
    #[default]
    Idle,

    /// Capturing and encoding
    Recording,

    /// Session alive, encoder suspended
    Paused,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "idle"),
            RecordingState::Recording => write!(f, "recording"),
            RecordingState::Paused => write!(f, "paused"),
        }
    }
}

/// Snapshot read by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_recording: bool,
    pub is_paused: bool,
    pub is_mic_enabled: bool,
    pub video_format: Format,
    pub video_quality: Quality,
}

impl SessionStatus {
    pub fn state(&self) -> RecordingState {
        match (self.is_recording, self.is_paused) {
            (false, _) => RecordingState::Idle,
            (true, false) => RecordingState::Recording,
            (true, true) => RecordingState::Paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_status_serializes_for_ui() {
        let status = SessionStatus {
            is_recording: true,
            is_paused: false,
            is_mic_enabled: true,
            video_format: Format::Mp4,
            video_quality: Quality::High,
        };
        assert_eq!(status.state(), RecordingState::Recording);

        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["isRecording"], true);
        assert_eq!(json["isMicEnabled"], true);
        assert_eq!(json["videoFormat"], "mp4");
        assert_eq!(json["videoQuality"], "high");
    }
}
