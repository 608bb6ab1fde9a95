//! Display and microphone capture through `navigator.mediaDevices`

use async_trait::async_trait;
use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DisplayMediaStreamConstraints, DomException, MediaDevices, MediaStream, MediaStreamConstraints,
    MediaStreamTrack, MediaStreamTrackState,
};

use screen_recorder_common::{
    CaptureError, CaptureSource, DisplayCapture, DisplayRequest, MediaTrack, MicrophoneCapture,
    TrackKind,
};

use crate::describe;

/// A browser media track
#[derive(Debug, Clone)]
pub struct WebTrack(MediaStreamTrack);

impl WebTrack {
    pub fn new(track: MediaStreamTrack) -> Self {
        Self(track)
    }

    pub fn as_raw(&self) -> &MediaStreamTrack {
        &self.0
    }
}

impl MediaTrack for WebTrack {
    fn id(&self) -> String {
        self.0.id()
    }

    fn kind(&self) -> TrackKind {
        if self.0.kind() == "video" {
            TrackKind::Video
        } else {
            TrackKind::Audio
        }
    }

    fn stop(&self) {
        self.0.stop();
    }

    fn is_live(&self) -> bool {
        self.0.ready_state() == MediaStreamTrackState::Live
    }
}

/// Whole-screen capture via `getDisplayMedia`
#[derive(Debug, Default)]
pub struct DisplayMediaCapture;

#[async_trait(?Send)]
impl DisplayCapture<WebTrack> for DisplayMediaCapture {
    async fn request_display(&self, request: DisplayRequest) -> Result<Vec<WebTrack>, CaptureError> {
        let source = CaptureSource::Display;
        let devices = media_devices(source)?;

        let video = Object::new();
        set_property(&video, "displaySurface", &JsValue::from_str("monitor"))
            .and_then(|_| set_property(&video, "frameRate", &JsValue::from(request.frame_rate)))
            .map_err(|err| capture_error(source, &err))?;

        let constraints = DisplayMediaStreamConstraints::new();
        constraints.set_video(&video);
        constraints.set_audio(&JsValue::from_bool(request.audio));

        let promise = devices
            .get_display_media_with_constraints(&constraints)
            .map_err(|err| capture_error(source, &err))?;
        let stream = await_stream(source, promise).await?;
        Ok(tracks_of(&stream))
    }
}

/// Microphone capture via `getUserMedia({ audio: true })`
#[derive(Debug, Default)]
pub struct UserMediaMicrophone;

#[async_trait(?Send)]
impl MicrophoneCapture<WebTrack> for UserMediaMicrophone {
    async fn request_microphone(&self) -> Result<Vec<WebTrack>, CaptureError> {
        let source = CaptureSource::Microphone;
        let devices = media_devices(source)?;

        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::TRUE);

        let promise = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|err| capture_error(source, &err))?;
        let stream = await_stream(source, promise).await?;
        Ok(tracks_of(&stream))
    }
}

fn media_devices(source: CaptureSource) -> Result<MediaDevices, CaptureError> {
    let window = web_sys::window().ok_or_else(|| CaptureError::DeviceUnavailable {
        source_kind: source,
        reason: "no window".to_string(),
    })?;
    window
        .navigator()
        .media_devices()
        .map_err(|err| CaptureError::DeviceUnavailable {
            source_kind: source,
            reason: format!("mediaDevices unavailable: {}", describe(&err)),
        })
}

async fn await_stream(
    source: CaptureSource,
    promise: js_sys::Promise,
) -> Result<MediaStream, CaptureError> {
    let value = JsFuture::from(promise)
        .await
        .map_err(|err| capture_error(source, &err))?;
    value
        .dyn_into::<MediaStream>()
        .map_err(|err| capture_error(source, &err))
}

fn tracks_of(stream: &MediaStream) -> Vec<WebTrack> {
    stream
        .get_tracks()
        .iter()
        .filter_map(|value| value.dyn_into::<MediaStreamTrack>().ok())
        .map(WebTrack::new)
        .collect()
}

fn set_property(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

fn capture_error(source: CaptureSource, err: &JsValue) -> CaptureError {
    match err.dyn_ref::<DomException>() {
        Some(exception) => classify(source, &exception.name(), &exception.message()),
        None => classify(source, "", &describe(err)),
    }
}

/// Map a `DOMException` name to the capture error taxonomy
pub(crate) fn classify(source: CaptureSource, name: &str, message: &str) -> CaptureError {
    let reason = if name.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", name, message)
    };

    match name {
        "NotAllowedError" | "SecurityError" => CaptureError::PermissionDenied {
            source_kind: source,
            reason,
        },
        _ => CaptureError::DeviceUnavailable {
            source_kind: source,
            reason,
        },
    }
}
