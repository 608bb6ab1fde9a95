//! Capture streams and the providers that grant them
//!
//! Tracks are platform handles behind [`MediaTrack`]. [`CaptureStreams`]
//! owns every track granted for one session and stops them when released
//! or dropped, so an aborted start never leaves a capture indicator on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CaptureError;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Where a stream was captured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Display,
    Microphone,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Display => write!(f, "display"),
            CaptureSource::Microphone => write!(f, "microphone"),
        }
    }
}

/// A live media track handle. Clones refer to the same underlying track.
pub trait MediaTrack: Clone + fmt::Debug {
    fn id(&self) -> String;

    fn kind(&self) -> TrackKind;

    /// Stop the track and release the device behind it. Idempotent.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Parameters for a display capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRequest {
    pub frame_rate: u32,

    /// Ask for system audio alongside the display video
    pub audio: bool,
}

/// Grants whole-screen capture streams
#[async_trait(?Send)]
pub trait DisplayCapture<T: MediaTrack> {
    async fn request_display(&self, request: DisplayRequest) -> Result<Vec<T>, CaptureError>;
}

/// Grants audio-only microphone streams
#[async_trait(?Send)]
pub trait MicrophoneCapture<T: MediaTrack> {
    async fn request_microphone(&self) -> Result<Vec<T>, CaptureError>;
}

/// All tracks granted for one session
#[derive(Debug)]
pub struct CaptureStreams<T: MediaTrack> {
    display: Vec<T>,
    microphone: Vec<T>,
}

impl<T: MediaTrack> CaptureStreams<T> {
    pub fn new() -> Self {
        Self {
            display: Vec::new(),
            microphone: Vec::new(),
        }
    }

    /// Take ownership of a display grant. A grant without video is unusable;
    /// its tracks stay owned here and are stopped on release.
    pub fn attach_display(&mut self, tracks: Vec<T>) -> Result<(), CaptureError> {
        self.display.extend(tracks);
        if self.display_video().next().is_none() {
            return Err(CaptureError::DeviceUnavailable {
                source_kind: CaptureSource::Display,
                reason: "display grant contained no video track".to_string(),
            });
        }
        Ok(())
    }

    pub fn attach_microphone(&mut self, tracks: Vec<T>) {
        self.microphone.extend(tracks);
    }

    pub fn display_video(&self) -> impl Iterator<Item = &T> {
        self.display.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn display_audio(&self) -> impl Iterator<Item = &T> {
        self.display.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn microphone_audio(&self) -> impl Iterator<Item = &T> {
        self.microphone
            .iter()
            .filter(|t| t.kind() == TrackKind::Audio)
    }

    /// First display video track, bound to the preview overlay
    pub fn preview_track(&self) -> Option<&T> {
        self.display_video().next()
    }

    pub fn has_microphone(&self) -> bool {
        self.microphone_audio().next().is_some()
    }

    pub fn track_count(&self) -> usize {
        self.display.len() + self.microphone.len()
    }

    /// Compose a fresh stream: display video, display audio, then microphone audio
    pub fn combine(&self) -> CombinedStream<T> {
        let tracks = self
            .display_video()
            .chain(self.display_audio())
            .chain(self.microphone_audio())
            .cloned()
            .collect();
        CombinedStream { tracks }
    }

    /// Stop every track. Safe to call more than once.
    pub fn release(&mut self) {
        for track in self.display.drain(..).chain(self.microphone.drain(..)) {
            track.stop();
        }
    }
}

impl<T: MediaTrack> Default for CaptureStreams<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MediaTrack> Drop for CaptureStreams<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Track set handed to the encoder. Does not own the tracks.
#[derive(Debug, Clone)]
pub struct CombinedStream<T: MediaTrack> {
    tracks: Vec<T>,
}

impl<T: MediaTrack> CombinedStream<T> {
    pub fn tracks(&self) -> &[T] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &T> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &T> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }
}
