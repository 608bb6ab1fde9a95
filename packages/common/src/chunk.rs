use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk within its session's buffer
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkId(pub u64);

impl ChunkId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One encoded fragment as delivered by the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
}

/// Append-only buffer of one session's encoded fragments, in arrival order
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<EncodedChunk>,
    next_id: ChunkId,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are ignored and get no id.
    pub fn push(&mut self, data: Vec<u8>) -> Option<ChunkId> {
        if data.is_empty() {
            return None;
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.chunks.push(EncodedChunk { id, data });
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total encoded bytes held
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.data.len()).sum()
    }

    /// Drain every chunk, leaving the buffer empty
    pub fn take(&mut self) -> Vec<EncodedChunk> {
        std::mem::take(&mut self.chunks)
    }
}
