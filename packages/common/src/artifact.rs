//! Finished recordings and where they go

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::chunk::EncodedChunk;
use crate::error::OutputError;
use crate::format::{Format, NegotiatedProfile};
use crate::session::SessionId;

/// Recording metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub session_id: SessionId,

    /// Format actually recorded, after negotiation
    pub format: Format,

    pub mime_type: String,

    /// Bitrate requested from the encoder, in bits per second
    pub video_bits_per_second: u32,

    pub chunk_count: usize,

    pub byte_len: usize,

    /// BLAKE3 hash of the artifact content
    pub digest: String,

    pub started_at: DateTime<Utc>,

    pub stopped_at: DateTime<Utc>,

    /// Wall-clock length, paused spans included
    pub duration_ms: i64,
}

/// A single downloadable recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    /// Concatenate chunks in arrival order into one artifact
    pub fn assemble(
        session_id: SessionId,
        negotiated: &NegotiatedProfile,
        chunks: Vec<EncodedChunk>,
        file_name: String,
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
    ) -> Self {
        let chunk_count = chunks.len();
        let data: Vec<u8> = chunks.into_iter().flat_map(|chunk| chunk.data).collect();
        let digest = blake3::hash(&data).to_hex().to_string();

        let metadata = ArtifactMetadata {
            session_id,
            format: negotiated.format,
            mime_type: negotiated.profile.mime_type.to_string(),
            video_bits_per_second: negotiated.profile.video_bits_per_second,
            chunk_count,
            byte_len: data.len(),
            digest,
            started_at,
            stopped_at,
            duration_ms: (stopped_at - started_at).num_milliseconds(),
        };

        Self {
            file_name,
            mime_type: negotiated.profile.mime_type.to_string(),
            data,
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `<prefix>-<ISO-8601 UTC timestamp>.<extension>`
pub fn artifact_file_name(prefix: &str, stopped_at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        stopped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        extension
    )
}

/// Hands a finished artifact to the user (save/download)
pub trait ArtifactSink {
    fn deliver(&self, artifact: Artifact) -> Result<(), OutputError>;
}
