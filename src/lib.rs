//! maskkit — interactive mask/selection engine for generative image editing.
//!
//! Turns pointer/touch gestures and algorithmic selection requests into a
//! binary mask at the source image's native resolution, keeps a tinted
//! preview buffer in sync with that mask, and bridges externally computed
//! masks in and encoded mask artifacts out.
//!
//! The engine is headless: it owns pixels and state, never windows. A host
//! application feeds it [`session::GestureEvent`]s in display coordinates,
//! renders [`canvas::MaskCanvas::preview`] over the photo, and forwards the
//! committed [`io::MaskArtifact`] to whatever performs the actual edit.

pub mod canvas;
pub mod coords;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;

pub use canvas::{CanvasError, MaskCanvas, MaskStats};
pub use coords::{CoordMapper, DisplayRect};
pub use io::{MaskArtifact, MaskIoError};
pub use session::{
    GestureEvent, MaskSession, SegmentationRequest, SessionOverlay, SessionState, Tool,
    ToolProperties,
};
