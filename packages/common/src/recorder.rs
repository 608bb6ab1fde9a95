//! The recording session state machine
//!
//! `Idle -> Recording <-> Paused -> Idle`. The session exclusively owns the
//! capture tracks, the encoder, the chunk buffer and the preview overlay of
//! the one active recording. Everything runs on a single control thread:
//! `start` is the only operation that suspends (permission prompts), and
//! encoder callbacks are queued on a channel and applied by
//! [`RecordingSession::process_events`].
//!
//! `stop` returns the session to `Idle` immediately. The encoder's final
//! flush may arrive later, so the stopped session's buffer moves into a
//! pending finalization that delivers the artifact once the encoder signals
//! it is done.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::artifact::{artifact_file_name, Artifact, ArtifactSink};
use crate::capture::{
    CaptureStreams, DisplayCapture, DisplayRequest, MediaTrack, MicrophoneCapture,
};
use crate::chunk::ChunkBuffer;
use crate::config::{MicFailurePolicy, RecorderConfig};
use crate::encoder::{Encoder, EncoderEvent, EncoderEvents, EncoderFactory, EventReceiver};
use crate::error::{SessionError, SessionResult};
use crate::format::{negotiate, Format, NegotiatedProfile, Quality};
use crate::overlay::{OverlayHost, PreviewOverlay};
use crate::session::{RecordingState, SessionId, SessionStatus};

/// Platform capabilities the session drives
pub struct Collaborators<T: MediaTrack> {
    pub display: Box<dyn DisplayCapture<T>>,
    pub microphone: Box<dyn MicrophoneCapture<T>>,
    pub encoder: Box<dyn EncoderFactory<T>>,
    pub sink: Box<dyn ArtifactSink>,
    pub overlay: Box<dyn OverlayHost<T>>,
}

/// Resources of the live recording
struct ActiveSession<T: MediaTrack> {
    id: SessionId,
    streams: CaptureStreams<T>,
    encoder: Box<dyn Encoder>,
    events: EventReceiver,
    chunks: ChunkBuffer,
    negotiated: NegotiatedProfile,
    started_at: DateTime<Utc>,
    paused: bool,
}

impl<T: MediaTrack> ActiveSession<T> {
    /// Buffer data already queued by the encoder, ignoring control events
    fn drain_queued(&mut self) {
        while let Some(event) = self.events.try_next() {
            match event {
                EncoderEvent::Data(bytes) => {
                    self.chunks.push(bytes);
                }
                other => debug!(session_id = %self.id, ?other, "Dropping control event"),
            }
        }
    }
}

/// A stopped session waiting for the encoder's finalize signal
struct Finalizing {
    id: SessionId,
    // Kept alive until the finalize signal so its callbacks stay attached
    _encoder: Box<dyn Encoder>,
    events: EventReceiver,
    chunks: ChunkBuffer,
    negotiated: NegotiatedProfile,
    started_at: DateTime<Utc>,
    stopped_at: DateTime<Utc>,
    file_name: String,
    signalled: bool,
}

enum Drain {
    Pending,
    Complete,
    Failed(String),
}

impl Finalizing {
    fn drain(&mut self) -> Drain {
        while let Some(event) = self.events.try_next() {
            match event {
                EncoderEvent::Data(bytes) if !self.signalled => {
                    self.chunks.push(bytes);
                }
                EncoderEvent::Data(_) => {
                    debug!(session_id = %self.id, "Ignoring data after finalize signal");
                }
                EncoderEvent::Stopped => self.signalled = true,
                EncoderEvent::Fault(reason) => return Drain::Failed(reason),
            }
        }
        if self.signalled {
            Drain::Complete
        } else {
            Drain::Pending
        }
    }
}

/// Owns one recording at a time and its supporting resources
pub struct RecordingSession<T: MediaTrack> {
    config: RecorderConfig,
    collaborators: Collaborators<T>,
    format: Format,
    quality: Quality,
    mic_enabled: bool,
    active: Option<ActiveSession<T>>,
    overlay: Option<Box<dyn PreviewOverlay>>,
    finalizing: Vec<Finalizing>,
    last_error: Option<SessionError>,
    last_profile: Option<NegotiatedProfile>,
}

impl<T: MediaTrack> RecordingSession<T> {
    pub fn new(config: RecorderConfig, collaborators: Collaborators<T>) -> Self {
        Self {
            format: config.format,
            quality: config.quality,
            mic_enabled: config.mic_enabled,
            config,
            collaborators,
            active: None,
            overlay: None,
            finalizing: Vec::new(),
            last_error: None,
            last_profile: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        match &self.active {
            None => RecordingState::Idle,
            Some(session) if session.paused => RecordingState::Paused,
            Some(_) => RecordingState::Recording,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            is_recording: self.is_recording(),
            is_paused: self.is_paused(),
            is_mic_enabled: self.mic_enabled,
            video_format: self.format,
            video_quality: self.quality,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.active.as_ref().is_some_and(|session| session.paused)
    }

    pub fn is_mic_enabled(&self) -> bool {
        self.mic_enabled
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Id of the live session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|session| session.id)
    }

    /// Chunks held by the live session
    pub fn buffered_chunks(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |session| session.chunks.len())
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Stopped sessions still waiting for their encoder to finish
    pub fn pending_finalizations(&self) -> usize {
        self.finalizing.len()
    }

    /// Most recent failure, cleared by the next successful start
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Profile negotiated by the most recent successful start
    pub fn last_profile(&self) -> Option<&NegotiatedProfile> {
        self.last_profile.as_ref()
    }

    /// Takes effect on the next start
    pub fn set_format(&mut self, format: Format) {
        debug!(%format, recording = self.is_recording(), "Video format selected");
        self.format = format;
    }

    /// Takes effect on the next start
    pub fn set_quality(&mut self, quality: Quality) {
        debug!(%quality, recording = self.is_recording(), "Video quality selected");
        self.quality = quality;
    }

    /// Flip microphone capture for the next start. A live session keeps the
    /// tracks it started with.
    pub fn toggle_mic(&mut self) {
        self.set_mic_enabled(!self.mic_enabled);
    }

    /// Like [`Self::toggle_mic`], with an explicit target
    pub fn set_mic_enabled(&mut self, enabled: bool) {
        self.mic_enabled = enabled;
        debug!(enabled, "Microphone toggled");
    }

    /// Acquire capture streams, negotiate a profile and begin encoding.
    ///
    /// # Errors
    ///
    /// `AlreadyActive` if a session is live (state is left untouched).
    /// `PermissionDenied`/`DeviceUnavailable` if capture is refused, and
    /// `EncoderFault` if the encoder cannot be created or started. On any
    /// error every track granted so far has been stopped and the state is
    /// `Idle`.
    #[instrument(skip(self), fields(format = %self.format, quality = %self.quality, mic = self.mic_enabled))]
    pub async fn start(&mut self) -> SessionResult<()> {
        if self.active.is_some() {
            warn!("Start requested while a session is active");
            return Err(SessionError::AlreadyActive);
        }

        let session = match self.open().await {
            Ok(session) => session,
            Err(err) => {
                error!(error = %err, "Failed to start recording");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if self.overlay.is_none() {
            if let Some(track) = session.streams.preview_track() {
                match self.collaborators.overlay.mount(track) {
                    Ok(overlay) => self.overlay = Some(overlay),
                    Err(err) => warn!(error = %err, "Recording without preview"),
                }
            }
        }

        info!(
            session_id = %session.id,
            format = %session.negotiated.format,
            mime_type = session.negotiated.profile.mime_type,
            bitrate = session.negotiated.profile.video_bits_per_second,
            tracks = session.streams.track_count(),
            "Recording started"
        );

        self.last_profile = Some(session.negotiated);
        self.last_error = None;
        self.active = Some(session);
        self.process_events();
        Ok(())
    }

    async fn open(&self) -> SessionResult<ActiveSession<T>> {
        let mut streams = CaptureStreams::new();

        if self.mic_enabled {
            match self.collaborators.microphone.request_microphone().await {
                Ok(tracks) => streams.attach_microphone(tracks),
                Err(err) => match self.config.mic_failure_policy {
                    MicFailurePolicy::Abort => return Err(err.into()),
                    MicFailurePolicy::VideoOnly => {
                        warn!(error = %err, "Microphone unavailable, recording without it");
                    }
                },
            }
        }

        let request = DisplayRequest {
            frame_rate: self.config.frame_rate,
            audio: self.config.capture_system_audio,
        };
        let display = self.collaborators.display.request_display(request).await?;
        streams.attach_display(display)?;
        debug!(
            microphone = streams.has_microphone(),
            tracks = streams.track_count(),
            "Capture streams granted"
        );

        let factory = &self.collaborators.encoder;
        let negotiated = negotiate(self.format, self.quality, |mime| {
            factory.is_type_supported(mime)
        });
        if !negotiated.verified {
            warn!(
                requested = %negotiated.requested,
                mime_type = negotiated.profile.mime_type,
                "No supported encoding profile, using last resort"
            );
        } else if negotiated.fell_back() {
            info!(
                requested = %negotiated.requested,
                resolved = %negotiated.format,
                "Requested format unsupported, falling back"
            );
        }

        let (events, receiver) = EncoderEvents::channel();
        let combined = streams.combine();
        let mut encoder = factory.create(&combined, &negotiated.profile, events)?;
        encoder.start()?;

        Ok(ActiveSession {
            id: SessionId::new(),
            streams,
            encoder,
            events: receiver,
            chunks: ChunkBuffer::new(),
            negotiated,
            started_at: Utc::now(),
            paused: false,
        })
    }

    /// Toggle between recording and paused. No-op while idle.
    pub fn pause(&mut self) {
        let Some(session) = self.active.as_mut() else {
            debug!("Pause ignored while idle");
            return;
        };

        let result = if session.paused {
            session.encoder.resume()
        } else {
            session.encoder.pause()
        };

        match result {
            Ok(()) => {
                session.paused = !session.paused;
                info!(session_id = %session.id, paused = session.paused, "Pause toggled");
            }
            Err(err) => self.abort_active(err.to_string()),
        }
    }

    /// Finalize the live session. No-op while idle.
    ///
    /// Tracks are released and the overlay destroyed before this returns.
    /// The artifact is delivered as soon as the encoder signals completion,
    /// which may be during this call or a later [`Self::process_events`].
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        let Some(mut session) = self.active.take() else {
            debug!("Stop ignored while idle");
            return;
        };

        let stopped_at = Utc::now();
        if let Err(err) = session.encoder.stop() {
            // No finalize signal will follow; deliver what has arrived so far
            session.drain_queued();
            error!(
                session_id = %session.id,
                error = %err,
                chunks = session.chunks.len(),
                "Encoder failed to finalize, delivering buffered data"
            );
            self.retire(session, stopped_at, true);
            self.last_error = Some(err.into());
            self.process_events();
            return;
        }

        info!(
            session_id = %session.id,
            chunks = session.chunks.len(),
            bytes = session.chunks.byte_len(),
            "Recording stopped"
        );
        self.retire(session, stopped_at, false);
        self.process_events();
    }

    /// Apply queued encoder events on the control thread.
    pub fn process_events(&mut self) {
        let mut ended = None;
        if let Some(session) = self.active.as_mut() {
            while let Some(event) = session.events.try_next() {
                match event {
                    EncoderEvent::Data(bytes) => {
                        if let Some(id) = session.chunks.push(bytes) {
                            debug!(session_id = %session.id, chunk = %id, "Chunk buffered");
                        }
                    }
                    EncoderEvent::Stopped => {
                        ended = Some(None);
                        break;
                    }
                    EncoderEvent::Fault(reason) => {
                        ended = Some(Some(reason));
                        break;
                    }
                }
            }
        }

        match ended {
            Some(Some(reason)) => self.abort_active(reason),
            Some(None) => {
                if let Some(session) = self.active.take() {
                    warn!(session_id = %session.id, "Encoder stopped on its own, finalizing");
                    self.retire(session, Utc::now(), true);
                }
            }
            None => {}
        }

        let mut index = 0;
        while index < self.finalizing.len() {
            match self.finalizing[index].drain() {
                Drain::Pending => index += 1,
                Drain::Complete => {
                    let job = self.finalizing.remove(index);
                    self.deliver(job);
                }
                Drain::Failed(reason) => {
                    let job = self.finalizing.remove(index);
                    error!(session_id = %job.id, %reason, "Encoder failed while finalizing");
                    self.last_error = Some(SessionError::EncoderFault(reason));
                }
            }
        }
    }

    /// Release the live resources of a stopped session and queue it for delivery
    fn retire(&mut self, session: ActiveSession<T>, stopped_at: DateTime<Utc>, signalled: bool) {
        let ActiveSession {
            id,
            mut streams,
            encoder,
            events,
            chunks,
            negotiated,
            started_at,
            ..
        } = session;

        streams.release();
        self.destroy_overlay();

        let file_name = artifact_file_name(
            &self.config.file_prefix,
            stopped_at,
            negotiated.profile.extension,
        );
        self.finalizing.push(Finalizing {
            id,
            _encoder: encoder,
            events,
            chunks,
            negotiated,
            started_at,
            stopped_at,
            file_name,
            signalled,
        });
    }

    fn deliver(&mut self, mut job: Finalizing) {
        let artifact = Artifact::assemble(
            job.id,
            &job.negotiated,
            job.chunks.take(),
            job.file_name,
            job.started_at,
            job.stopped_at,
        );

        info!(
            session_id = %job.id,
            file_name = %artifact.file_name,
            bytes = artifact.len(),
            chunks = artifact.metadata.chunk_count,
            digest = %artifact.metadata.digest,
            "Delivering recording"
        );

        if let Err(err) = self.collaborators.sink.deliver(artifact) {
            error!(session_id = %job.id, error = %err, "Recording could not be delivered");
            self.last_error = Some(SessionError::DeliveryFailed(err.to_string()));
        }
    }

    /// Tear the live session down after an encoder fault. Buffered chunks are
    /// discarded.
    fn abort_active(&mut self, reason: String) {
        let Some(mut session) = self.active.take() else {
            return;
        };

        error!(
            session_id = %session.id,
            %reason,
            dropped_chunks = session.chunks.len(),
            "Encoder fault, recording aborted"
        );
        if let Err(err) = session.encoder.stop() {
            debug!(error = %err, "Encoder already inactive");
        }
        session.streams.release();
        self.destroy_overlay();
        self.last_error = Some(SessionError::EncoderFault(reason));
    }

    fn destroy_overlay(&mut self) {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.unmount();
        }
    }
}

impl<T: MediaTrack> Drop for RecordingSession<T> {
    fn drop(&mut self) {
        if let Some(mut session) = self.active.take() {
            if let Err(err) = session.encoder.stop() {
                debug!(error = %err, "Encoder already inactive");
            }
        }
        self.destroy_overlay();
    }
}
