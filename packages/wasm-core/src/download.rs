use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use screen_recorder_common::{Artifact, ArtifactSink, OutputError};

use crate::{describe, document};

/// Saves artifacts through a temporary object URL and a download anchor
#[derive(Debug, Default)]
pub struct BlobDownloadSink;

impl ArtifactSink for BlobDownloadSink {
    fn deliver(&self, artifact: Artifact) -> Result<(), OutputError> {
        let fail = |err: wasm_bindgen::JsValue| OutputError::Delivery(describe(&err));

        let bytes = Uint8Array::from(artifact.data.as_slice());
        let options = BlobPropertyBag::new();
        options.set_type(&artifact.mime_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&Array::of1(&bytes), &options)
            .map_err(fail)?;

        let url = Url::create_object_url_with_blob(&blob).map_err(fail)?;
        let clicked = click_download(&url, &artifact.file_name);

        // The download has its own reference to the Blob once clicked
        if let Err(err) = Url::revoke_object_url(&url) {
            tracing::warn!(error = %describe(&err), "Could not revoke object URL");
        }
        clicked
    }
}

fn click_download(url: &str, file_name: &str) -> Result<(), OutputError> {
    let document = document().map_err(OutputError::Delivery)?;
    let anchor = document
        .create_element("a")
        .map_err(|err| OutputError::Delivery(describe(&err)))?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|err| OutputError::Delivery(describe(&err)))?;

    anchor.set_href(url);
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}
