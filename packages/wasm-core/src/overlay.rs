//! Floating "LIVE" preview of the captured display

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlVideoElement, MediaStream};

use screen_recorder_common::{OutputError, OverlayHost, PreviewOverlay};

use crate::capture::WebTrack;
use crate::{describe, document};

const CONTAINER_CLASS: &str = "fixed bottom-24 right-8 w-80 rounded-2xl overflow-hidden shadow-2xl border border-zinc-700/50 bg-black/20";
const LABEL_CLASS: &str = "absolute top-3 left-4 px-2 py-1 rounded-md bg-red-500 text-xs font-medium text-white flex items-center gap-1";
const LABEL_HTML: &str = r#"<div class="w-2 h-2 rounded-full bg-white animate-pulse"></div> LIVE"#;
const VIDEO_CLASS: &str = "w-full h-full object-cover rounded-2xl";

/// Marks the container so it can be found in the DOM
pub const OVERLAY_ATTRIBUTE: &str = "data-recorder-preview";

/// Mounts previews under `document.body`
#[derive(Debug, Default)]
pub struct DomOverlayHost;

impl OverlayHost<WebTrack> for DomOverlayHost {
    fn mount(&self, video: &WebTrack) -> Result<Box<dyn PreviewOverlay>, OutputError> {
        let document = document().map_err(OutputError::Overlay)?;
        build(&document, video)
            .map(|overlay| Box::new(overlay) as Box<dyn PreviewOverlay>)
            .map_err(|err| OutputError::Overlay(describe(&err)))
    }
}

fn build(document: &Document, video: &WebTrack) -> Result<DomOverlay, JsValue> {
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;

    let container = document.create_element("div")?;
    container.set_class_name(CONTAINER_CLASS);
    container.set_attribute(OVERLAY_ATTRIBUTE, "")?;

    let label = document.create_element("div")?;
    label.set_class_name(LABEL_CLASS);
    label.set_inner_html(LABEL_HTML);
    container.append_child(&label)?;

    let player = document
        .create_element("video")?
        .dyn_into::<HtmlVideoElement>()?;
    player.set_autoplay(true);
    player.set_muted(true);
    player.set_class_name(VIDEO_CLASS);

    let stream = MediaStream::new()?;
    stream.add_track(video.as_raw());
    player.set_src_object(Some(&stream));
    container.append_child(&player)?;

    body.append_child(&container)?;
    Ok(DomOverlay { container, player })
}

struct DomOverlay {
    container: Element,
    player: HtmlVideoElement,
}

impl PreviewOverlay for DomOverlay {
    fn unmount(&mut self) {
        self.player.set_src_object(None);
        self.container.remove();
    }
}
