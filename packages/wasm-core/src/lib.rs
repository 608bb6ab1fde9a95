use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::Document;

use screen_recorder_common::{
    Collaborators, Format, Quality, RecorderConfig, SessionHandle, SessionStatus,
};

mod capture;
mod download;
mod logging;
mod media_recorder;
mod overlay;

pub use capture::{DisplayMediaCapture, UserMediaMicrophone, WebTrack};
pub use download::BlobDownloadSink;
pub use media_recorder::{MediaRecorderEncoder, MediaRecorderFactory};
pub use overlay::{DomOverlayHost, OVERLAY_ATTRIBUTE};

type Listener = Rc<RefCell<Option<js_sys::Function>>>;

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Browser collaborators for a recording session
pub fn web_collaborators(notify: Rc<dyn Fn()>) -> Collaborators<WebTrack> {
    Collaborators {
        display: Box::new(DisplayMediaCapture),
        microphone: Box::new(UserMediaMicrophone),
        encoder: Box::new(MediaRecorderFactory::new(notify)),
        sink: Box::new(BlobDownloadSink),
        overlay: Box::new(DomOverlayHost),
    }
}

// ===== Recorder WASM Bindings =====

/// Screen recorder driven by the presentation layer.
///
/// Settings changed while `start()` waits on a permission prompt apply to
/// the next start; a `stop()` in that window stops the session as soon as
/// it begins.
#[wasm_bindgen]
pub struct ScreenRecorder {
    handle: SessionHandle<WebTrack>,
    listener: Listener,
}

#[wasm_bindgen]
impl ScreenRecorder {
    /// Create a recorder from an optional JSON configuration
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ScreenRecorder, JsValue> {
        let config = match config_json {
            Some(json) => RecorderConfig::from_json(&json).map_err(to_js)?,
            None => RecorderConfig::default(),
        };
        logging::init(&config.log_filter);

        let listener: Listener = Rc::default();
        let handle = SessionHandle::new_cyclic(config, |weak| {
            let listener = listener.clone();
            let notify: Rc<dyn Fn()> = Rc::new(move || {
                if let Some(handle) = weak.upgrade() {
                    if handle.sync() {
                        publish(&listener, handle.status());
                    }
                }
            });
            web_collaborators(notify)
        });

        tracing::info!(version = env!("CARGO_PKG_VERSION"), "Screen recorder ready");

        Ok(Self { handle, listener })
    }

    /// Ask for capture permission and begin recording. Rejects with the error text.
    #[wasm_bindgen]
    pub fn start(&self) -> js_sys::Promise {
        let handle = self.handle.clone();
        let listener = self.listener.clone();

        future_to_promise(async move {
            let result = handle.start().await;
            publish(&listener, handle.status());
            result.map(|()| JsValue::UNDEFINED).map_err(to_js)
        })
    }

    /// Stop recording and download the result
    #[wasm_bindgen]
    pub fn stop(&self) {
        self.handle.stop();
        self.publish();
    }

    /// Toggle pause/resume
    #[wasm_bindgen]
    pub fn pause(&self) {
        self.handle.pause();
        self.publish();
    }

    #[wasm_bindgen]
    pub fn toggle_mic(&self) {
        self.handle.toggle_mic();
        self.publish();
    }

    /// Rejects names that are not a known format
    #[wasm_bindgen]
    pub fn set_format(&self, format: &str) -> Result<(), JsValue> {
        let format: Format = format.parse().map_err(to_js)?;
        self.handle.set_format(format);
        self.publish();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_quality(&self, quality: &str) -> Result<(), JsValue> {
        let quality: Quality = quality.parse().map_err(to_js)?;
        self.handle.set_quality(quality);
        self.publish();
        Ok(())
    }

    /// Called with the status JSON after every state change
    #[wasm_bindgen]
    pub fn set_on_status_change(&self, callback: Option<js_sys::Function>) {
        *self.listener.borrow_mut() = callback;
    }

    #[wasm_bindgen(getter)]
    pub fn is_recording(&self) -> bool {
        self.handle.status().is_recording
    }

    #[wasm_bindgen(getter)]
    pub fn is_paused(&self) -> bool {
        self.handle.status().is_paused
    }

    #[wasm_bindgen(getter)]
    pub fn is_mic_enabled(&self) -> bool {
        self.handle.status().is_mic_enabled
    }

    #[wasm_bindgen(getter)]
    pub fn video_format(&self) -> String {
        self.handle.status().video_format.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn video_quality(&self) -> String {
        self.handle.status().video_quality.to_string()
    }

    /// True while `start()` is waiting on a permission prompt
    #[wasm_bindgen(getter)]
    pub fn is_starting(&self) -> bool {
        self.handle.is_starting()
    }

    #[wasm_bindgen]
    pub fn status_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.handle.status()).map_err(to_js)
    }

    /// Text of the most recent failure, if any
    #[wasm_bindgen]
    pub fn last_error(&self) -> Option<String> {
        self.handle.last_error()
    }
}

impl ScreenRecorder {
    fn publish(&self) {
        publish(&self.listener, self.handle.status());
    }
}

fn publish(listener: &Listener, status: SessionStatus) {
    let Some(callback) = listener.borrow().clone() else {
        return;
    };
    let json = match serde_json::to_string(&status) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "Could not serialize status");
            return;
        }
    };
    if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
        tracing::warn!(error = %describe(&err), "Status listener threw");
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn document() -> Result<Document, String> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| "no document".to_string())
}

/// Best-effort text for a thrown JS value
pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use screen_recorder_common::MicFailurePolicy;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_initial_status_follows_config() {
        let config = RecorderConfig {
            format: Format::WebmVp9,
            quality: Quality::Low,
            mic_enabled: true,
            mic_failure_policy: MicFailurePolicy::VideoOnly,
            ..RecorderConfig::default()
        };
        let handle = SessionHandle::new(config, web_collaborators(Rc::new(|| {})));
        let status = handle.status();
        assert!(!status.is_recording);
        assert!(!status.is_paused);
        assert!(status.is_mic_enabled);
        assert_eq!(status.video_format, Format::WebmVp9);
        assert_eq!(status.video_quality, Quality::Low);
        assert!(!handle.is_starting());
    }
}
