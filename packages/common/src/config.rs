//! Recorder configuration
//!
//! Handed over by the presentation layer as JSON when the recorder is
//! created. Nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::{Format, Quality};

/// What to do when the microphone cannot be opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MicFailurePolicy {
    /// Abort the whole start
    #[default]
    Abort,

    /// Record display video and system audio only
    VideoOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RecorderConfig {
    pub format: Format,
    pub quality: Quality,
    pub mic_enabled: bool,
    pub frame_rate: u32,
    pub capture_system_audio: bool,
    pub mic_failure_policy: MicFailurePolicy,
    pub file_prefix: String,

    /// `tracing` filter directive, e.g. `info` or `screen_recorder_common=debug`
    pub log_filter: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            format: Format::default(),
            quality: Quality::default(),
            mic_enabled: false,
            frame_rate: 60,
            capture_system_audio: true,
            mic_failure_policy: MicFailurePolicy::default(),
            file_prefix: "screen-recording".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl RecorderConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RecorderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=240).contains(&self.frame_rate) {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        if self.file_prefix.trim().is_empty()
            || self.file_prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::FilePrefix(self.file_prefix.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.format, Format::Mp4);
        assert_eq!(config.quality, Quality::High);
        assert!(!config.mic_enabled);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.mic_failure_policy, MicFailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config =
            RecorderConfig::from_json(r#"{"format":"webm-vp8","micFailurePolicy":"video-only"}"#)
                .unwrap();
        assert_eq!(config.format, Format::WebmVp8);
        assert_eq!(config.quality, Quality::High);
        assert_eq!(config.mic_failure_policy, MicFailurePolicy::VideoOnly);
        assert_eq!(config.file_prefix, "screen-recording");
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = RecorderConfig::from_json(r#"{"bitrate":1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            RecorderConfig::from_json(r#"{"frameRate":0}"#).unwrap_err(),
            ConfigError::FrameRate(0)
        );
        assert!(matches!(
            RecorderConfig::from_json(r#"{"filePrefix":"../x"}"#).unwrap_err(),
            ConfigError::FilePrefix(_)
        ));
        assert!(matches!(
            RecorderConfig::from_json(r#"{"quality":"ultra"}"#).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
