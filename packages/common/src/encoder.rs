//! Encoder contract and its event channel
//!
//! Encoders report asynchronously (data available, stopped, error). Events go
//! through an unbounded channel and are drained by the session on the
//! control thread, in the order the encoder emitted them.

use tokio::sync::mpsc;

use crate::capture::{CombinedStream, MediaTrack};
use crate::error::EncoderError;
use crate::format::EncodingProfile;

/// Something the encoder reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// An encoded fragment, in delivery order
    Data(Vec<u8>),

    /// Finalize signal: no more data will follow
    Stopped,

    /// The encoder failed mid-session
    Fault(String),
}

/// Sending half handed to an encoder
#[derive(Debug, Clone)]
pub struct EncoderEvents {
    tx: mpsc::UnboundedSender<EncoderEvent>,
}

impl EncoderEvents {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, EventReceiver { rx })
    }

    pub fn data(&self, bytes: Vec<u8>) {
        self.send(EncoderEvent::Data(bytes));
    }

    pub fn stopped(&self) {
        self.send(EncoderEvent::Stopped);
    }

    pub fn fault(&self, reason: impl Into<String>) {
        self.send(EncoderEvent::Fault(reason.into()));
    }

    pub fn send(&self, event: EncoderEvent) {
        // The receiver is gone once its session has been finalized or torn
        // down; late events have nowhere to go.
        if self.tx.send(event).is_err() {
            tracing::debug!("Dropping encoder event for a closed session");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the session
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<EncoderEvent>,
}

impl EventReceiver {
    /// Next queued event, without waiting
    pub fn try_next(&mut self) -> Option<EncoderEvent> {
        self.rx.try_recv().ok()
    }
}

/// A running encoder bound to one combined stream
pub trait Encoder {
    fn start(&mut self) -> Result<(), EncoderError>;

    fn pause(&mut self) -> Result<(), EncoderError>;

    fn resume(&mut self) -> Result<(), EncoderError>;

    /// Request finalization. Buffered data is flushed as `Data` events,
    /// followed by exactly one `Stopped`.
    fn stop(&mut self) -> Result<(), EncoderError>;
}

/// Creates encoders and answers capability queries
pub trait EncoderFactory<T: MediaTrack> {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create(
        &self,
        stream: &CombinedStream<T>,
        profile: &EncodingProfile,
        events: EncoderEvents,
    ) -> Result<Box<dyn Encoder>, EncoderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (events, mut rx) = EncoderEvents::channel();
        events.data(vec![1]);
        events.data(vec![2]);
        events.stopped();

        assert_eq!(rx.try_next(), Some(EncoderEvent::Data(vec![1])));
        assert_eq!(rx.try_next(), Some(EncoderEvent::Data(vec![2])));
        assert_eq!(rx.try_next(), Some(EncoderEvent::Stopped));
        assert_eq!(rx.try_next(), None);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (events, rx) = EncoderEvents::channel();
        drop(rx);
        assert!(events.is_closed());
        events.fault("late");
    }
}
