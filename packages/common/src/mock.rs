//! In-memory collaborators for exercising the session state machine

use async_trait::async_trait;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;
use tokio::sync::oneshot;

use crate::artifact::{Artifact, ArtifactSink};
use crate::capture::{
    CaptureSource, CombinedStream, DisplayCapture, DisplayRequest, MediaTrack, MicrophoneCapture,
    TrackKind,
};
use crate::config::RecorderConfig;
use crate::encoder::{Encoder, EncoderEvent, EncoderEvents, EncoderFactory};
use crate::error::{CaptureError, EncoderError, OutputError};
use crate::format::EncodingProfile;
use crate::overlay::{OverlayHost, PreviewOverlay};
use crate::recorder::{Collaborators, RecordingSession};

#[derive(Debug, Clone)]
pub struct MockTrack {
    id: String,
    kind: TrackKind,
    live: Rc<Cell<bool>>,
}

impl MockTrack {
    pub fn video(id: &str) -> Self {
        Self::new(id, TrackKind::Video)
    }

    pub fn audio(id: &str) -> Self {
        Self::new(id, TrackKind::Audio)
    }

    fn new(id: &str, kind: TrackKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            live: Rc::new(Cell::new(true)),
        }
    }
}

impl MediaTrack for MockTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.live.set(false);
    }

    fn is_live(&self) -> bool {
        self.live.get()
    }
}

/// Knobs and observations shared by every mock collaborator
#[derive(Debug)]
pub struct MockState {
    pub display_error: Option<CaptureError>,
    pub display_audio: bool,
    pub mic_error: Option<CaptureError>,
    pub supported: Vec<&'static str>,
    pub create_error: Option<EncoderError>,
    pub pause_error: Option<EncoderError>,
    pub stop_error: Option<EncoderError>,
    /// Suspend `request_display` until this resolves
    pub display_gate: Option<oneshot::Receiver<()>>,
    /// Emit `Stopped` from inside `Encoder::stop`
    pub finalize_synchronously: bool,
    pub sink_error: Option<OutputError>,
    pub overlay_error: Option<OutputError>,

    pub granted: Vec<MockTrack>,
    pub display_requests: Vec<DisplayRequest>,
    pub mic_requests: usize,
    pub encoders_created: usize,
    pub encoder_profile: Option<EncodingProfile>,
    pub encoder_track_ids: Vec<String>,
    pub encoder_calls: Vec<&'static str>,
    pub events: Option<EncoderEvents>,
    pub delivered: Vec<Artifact>,
    pub overlays_mounted: usize,
    pub overlay_mounts: usize,
    pub overlay_track: Option<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            display_error: None,
            display_audio: true,
            mic_error: None,
            supported: vec!["video/webm;codecs=vp9", "video/webm;codecs=vp8", "video/mp4"],
            create_error: None,
            pause_error: None,
            stop_error: None,
            display_gate: None,
            finalize_synchronously: true,
            sink_error: None,
            overlay_error: None,
            granted: Vec::new(),
            display_requests: Vec::new(),
            mic_requests: 0,
            encoders_created: 0,
            encoder_profile: None,
            encoder_track_ids: Vec::new(),
            encoder_calls: Vec::new(),
            events: None,
            delivered: Vec::new(),
            overlays_mounted: 0,
            overlay_mounts: 0,
            overlay_track: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPlatform(Rc<RefCell<MockState>>);

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Ref<'_, MockState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, MockState> {
        self.0.borrow_mut()
    }

    pub fn session(&self, config: RecorderConfig) -> RecordingSession<MockTrack> {
        RecordingSession::new(config, self.collaborators())
    }

    pub fn collaborators(&self) -> Collaborators<MockTrack> {
        Collaborators {
            display: Box::new(MockDisplay(self.clone())),
            microphone: Box::new(MockMicrophone(self.clone())),
            encoder: Box::new(MockEncoderFactory(self.clone())),
            sink: Box::new(MockSink(self.clone())),
            overlay: Box::new(MockOverlayHost(self.clone())),
        }
    }

    /// Sender of the most recently created encoder
    pub fn events(&self) -> EncoderEvents {
        match &self.state().events {
            Some(events) => events.clone(),
            None => panic!("no encoder has been created"),
        }
    }

    pub fn emit(&self, event: EncoderEvent) {
        self.events().send(event);
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.state().granted.iter().all(|t| !t.is_live())
    }

    fn grant(&self, track: MockTrack) -> MockTrack {
        self.state_mut().granted.push(track.clone());
        track
    }
}

struct MockDisplay(MockPlatform);

#[async_trait(?Send)]
impl DisplayCapture<MockTrack> for MockDisplay {
    async fn request_display(&self, request: DisplayRequest) -> Result<Vec<MockTrack>, CaptureError> {
        let gate = self.0.state_mut().display_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let (error, with_audio, n) = {
            let mut state = self.0.state_mut();
            state.display_requests.push(request);
            (
                state.display_error.clone(),
                state.display_audio && request.audio,
                state.display_requests.len(),
            )
        };
        if let Some(err) = error {
            return Err(err);
        }

        let mut tracks = vec![self.0.grant(MockTrack::video(&format!("screen-{}", n)))];
        if with_audio {
            tracks.push(self.0.grant(MockTrack::audio(&format!("system-audio-{}", n))));
        }
        Ok(tracks)
    }
}

struct MockMicrophone(MockPlatform);

#[async_trait(?Send)]
impl MicrophoneCapture<MockTrack> for MockMicrophone {
    async fn request_microphone(&self) -> Result<Vec<MockTrack>, CaptureError> {
        let (error, n) = {
            let mut state = self.0.state_mut();
            state.mic_requests += 1;
            (state.mic_error.clone(), state.mic_requests)
        };
        match error {
            Some(err) => Err(err),
            None => Ok(vec![self.0.grant(MockTrack::audio(&format!("mic-{}", n)))]),
        }
    }
}

struct MockEncoderFactory(MockPlatform);

impl EncoderFactory<MockTrack> for MockEncoderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.0.state().supported.iter().any(|s| *s == mime_type)
    }

    fn create(
        &self,
        stream: &CombinedStream<MockTrack>,
        profile: &EncodingProfile,
        events: EncoderEvents,
    ) -> Result<Box<dyn Encoder>, EncoderError> {
        let mut state = self.0.state_mut();
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        state.encoders_created += 1;
        state.encoder_profile = Some(*profile);
        state.encoder_track_ids = stream.tracks().iter().map(|t| t.id()).collect();
        state.events = Some(events.clone());
        Ok(Box::new(MockEncoder {
            platform: self.0.clone(),
            events,
        }))
    }
}

struct MockEncoder {
    platform: MockPlatform,
    events: EncoderEvents,
}

impl Encoder for MockEncoder {
    fn start(&mut self) -> Result<(), EncoderError> {
        self.platform.state_mut().encoder_calls.push("start");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EncoderError> {
        let mut state = self.platform.state_mut();
        if let Some(err) = state.pause_error.clone() {
            return Err(err);
        }
        state.encoder_calls.push("pause");
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EncoderError> {
        self.platform.state_mut().encoder_calls.push("resume");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncoderError> {
        let synchronous = {
            let mut state = self.platform.state_mut();
            state.encoder_calls.push("stop");
            if let Some(err) = state.stop_error.clone() {
                return Err(err);
            }
            state.finalize_synchronously
        };
        if synchronous {
            self.events.stopped();
        }
        Ok(())
    }
}

struct MockSink(MockPlatform);

impl ArtifactSink for MockSink {
    fn deliver(&self, artifact: Artifact) -> Result<(), OutputError> {
        let mut state = self.0.state_mut();
        if let Some(err) = state.sink_error.clone() {
            return Err(err);
        }
        state.delivered.push(artifact);
        Ok(())
    }
}

struct MockOverlayHost(MockPlatform);

impl OverlayHost<MockTrack> for MockOverlayHost {
    fn mount(&self, video: &MockTrack) -> Result<Box<dyn PreviewOverlay>, OutputError> {
        let mut state = self.0.state_mut();
        if let Some(err) = state.overlay_error.clone() {
            return Err(err);
        }
        state.overlays_mounted += 1;
        state.overlay_mounts += 1;
        state.overlay_track = Some(video.id());
        Ok(Box::new(MockOverlay {
            platform: self.0.clone(),
            mounted: true,
        }))
    }
}

struct MockOverlay {
    platform: MockPlatform,
    mounted: bool,
}

impl PreviewOverlay for MockOverlay {
    fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.platform.state_mut().overlays_mounted -= 1;
        }
    }
}

pub fn permission_denied(source_kind: CaptureSource) -> CaptureError {
    CaptureError::PermissionDenied {
        source_kind,
        reason: "NotAllowedError".to_string(),
    }
}
