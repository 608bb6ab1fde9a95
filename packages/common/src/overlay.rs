//! Live preview surface shown while recording

use crate::capture::MediaTrack;
use crate::error::OutputError;

/// A mounted preview element
pub trait PreviewOverlay {
    /// Remove the element from the UI tree
    fn unmount(&mut self);
}

/// Mounts preview overlays into the ambient UI
pub trait OverlayHost<T: MediaTrack> {
    fn mount(&self, video: &T) -> Result<Box<dyn PreviewOverlay>, OutputError>;
}
