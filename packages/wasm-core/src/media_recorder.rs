//! `MediaRecorder` as the session encoder
//!
//! MediaRecorder callbacks fire on the event loop and hand over Blobs, which
//! must be read asynchronously. A single local task reads them one at a time
//! so `Data` events reach the session in emission order and the final
//! `Stopped` follows the last byte.

use js_sys::{Reflect, Uint8Array};
use std::rc::Rc;
use tokio::sync::mpsc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Blob, BlobEvent, DomException, Event, MediaRecorder, MediaRecorderOptions, MediaStream};

use screen_recorder_common::{
    CombinedStream, Encoder, EncoderError, EncoderEvent, EncoderEvents, EncoderFactory,
    EncodingProfile,
};

use crate::capture::WebTrack;
use crate::describe;

/// Raw MediaRecorder callback, before the Blob is read
enum RecorderEvent {
    Data(Blob),
    Stopped,
    Error(String),
}

/// Builds `MediaRecorder` encoders. `notify` runs after each forwarded event
/// so the owner can drain its queue.
pub struct MediaRecorderFactory {
    notify: Rc<dyn Fn()>,
}

impl MediaRecorderFactory {
    pub fn new(notify: Rc<dyn Fn()>) -> Self {
        Self { notify }
    }
}

impl EncoderFactory<WebTrack> for MediaRecorderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        MediaRecorder::is_type_supported(mime_type)
    }

    fn create(
        &self,
        stream: &CombinedStream<WebTrack>,
        profile: &EncodingProfile,
        events: EncoderEvents,
    ) -> Result<Box<dyn Encoder>, EncoderError> {
        let create_error = |err: JsValue| EncoderError::Create {
            mime_type: profile.mime_type.to_string(),
            reason: describe(&err),
        };

        let media_stream = MediaStream::new().map_err(create_error)?;
        for track in stream.tracks() {
            media_stream.add_track(track.as_raw());
        }

        let options = MediaRecorderOptions::new();
        options.set_mime_type(profile.mime_type);
        options.set_video_bits_per_second(profile.video_bits_per_second);

        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(&media_stream, &options)
                .map_err(create_error)?;

        tracing::debug!(
            mime_type = profile.mime_type,
            bitrate = profile.video_bits_per_second,
            tracks = stream.tracks().len(),
            "MediaRecorder created"
        );

        Ok(Box::new(MediaRecorderEncoder::attach(
            recorder,
            events,
            self.notify.clone(),
        )))
    }
}

pub struct MediaRecorderEncoder {
    recorder: MediaRecorder,
    _on_data: Closure<dyn FnMut(BlobEvent)>,
    _on_stop: Closure<dyn FnMut(Event)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl MediaRecorderEncoder {
    fn attach(recorder: MediaRecorder, events: EncoderEvents, notify: Rc<dyn Fn()>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let on_data = {
            let tx = tx.clone();
            Closure::<dyn FnMut(BlobEvent)>::new(move |event: BlobEvent| {
                if let Some(blob) = event.data() {
                    if blob.size() > 0.0 {
                        let _ = tx.send(RecorderEvent::Data(blob));
                    }
                }
            })
        };

        let on_stop = {
            let tx = tx.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                let _ = tx.send(RecorderEvent::Stopped);
            })
        };

        let on_error = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let _ = tx.send(RecorderEvent::Error(error_reason(&event)));
        });

        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));
        recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));
        recorder.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        spawn_local(forward(rx, events, notify));

        Self {
            recorder,
            _on_data: on_data,
            _on_stop: on_stop,
            _on_error: on_error,
        }
    }

    fn call(
        &self,
        operation: &'static str,
        result: Result<(), JsValue>,
    ) -> Result<(), EncoderError> {
        result.map_err(|err| EncoderError::Operation {
            operation,
            reason: describe(&err),
        })
    }
}

impl Encoder for MediaRecorderEncoder {
    fn start(&mut self) -> Result<(), EncoderError> {
        self.call("start", self.recorder.start())
    }

    fn pause(&mut self) -> Result<(), EncoderError> {
        self.call("pause", self.recorder.pause())
    }

    fn resume(&mut self) -> Result<(), EncoderError> {
        self.call("resume", self.recorder.resume())
    }

    fn stop(&mut self) -> Result<(), EncoderError> {
        if self.recorder.state() == web_sys::RecordingState::Inactive {
            // Already stopped on its own; the stop event is queued
            return Ok(());
        }
        self.call("stop", self.recorder.stop())
    }
}

impl Drop for MediaRecorderEncoder {
    fn drop(&mut self) {
        // The closures die with this struct
        self.recorder.set_ondataavailable(None);
        self.recorder.set_onstop(None);
        self.recorder.set_onerror(None);
    }
}

async fn forward(
    mut rx: mpsc::UnboundedReceiver<RecorderEvent>,
    events: EncoderEvents,
    notify: Rc<dyn Fn()>,
) {
    while let Some(raw) = rx.recv().await {
        let event = match raw {
            RecorderEvent::Data(blob) => match JsFuture::from(blob.array_buffer()).await {
                Ok(buffer) => EncoderEvent::Data(Uint8Array::new(&buffer).to_vec()),
                Err(err) => EncoderEvent::Fault(format!(
                    "could not read encoded data: {}",
                    describe(&err)
                )),
            },
            RecorderEvent::Stopped => EncoderEvent::Stopped,
            RecorderEvent::Error(reason) => EncoderEvent::Fault(reason),
        };

        let last = !matches!(event, EncoderEvent::Data(_));
        events.send(event);
        notify();
        if last {
            break;
        }
    }
}

fn error_reason(event: &Event) -> String {
    Reflect::get(event, &JsValue::from_str("error"))
        .ok()
        .and_then(|err| {
            err.dyn_ref::<DomException>()
                .map(|exception| format!("{}: {}", exception.name(), exception.message()))
        })
        .unwrap_or_else(|| format!("MediaRecorder {} event", event.type_()))
}
