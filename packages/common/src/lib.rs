//! Platform-independent core of the screen recorder
//!
//! [`RecordingSession`] drives capture, encoding and delivery through the
//! collaborator traits in [`capture`], [`encoder`], [`artifact`] and
//! [`overlay`]. Browser implementations of those traits live in the wasm
//! crate.

pub mod artifact;
pub mod capture;
pub mod chunk;
pub mod config;
pub mod encoder;
pub mod error;
pub mod format;
pub mod handle;
pub mod overlay;
pub mod recorder;
pub mod session;

#[cfg(test)]
mod mock;

pub use artifact::{Artifact, ArtifactMetadata, ArtifactSink};
pub use capture::{
    CaptureSource, CaptureStreams, CombinedStream, DisplayCapture, DisplayRequest, MediaTrack,
    MicrophoneCapture, TrackKind,
};
pub use chunk::{ChunkBuffer, ChunkId, EncodedChunk};
pub use config::{MicFailurePolicy, RecorderConfig};
pub use encoder::{Encoder, EncoderEvent, EncoderEvents, EncoderFactory};
pub use error::{CaptureError, ConfigError, EncoderError, OutputError, SessionError, SessionResult};
pub use format::{negotiate, EncodingProfile, Format, NegotiatedProfile, Quality};
pub use handle::{SessionHandle, WeakSessionHandle};
pub use overlay::{OverlayHost, PreviewOverlay};
pub use recorder::{Collaborators, RecordingSession};
pub use session::{RecordingState, SessionId, SessionStatus};
