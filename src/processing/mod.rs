//! Video processing module
//!
//! Provides:
//! - frame scaling and cropping
//! - live zoom state
//! - webcam picture-in-picture overlay
//! - the compositor draw loop

mod compositor;
mod overlay;
mod scale;
mod zoom;

pub use compositor::{Compositor, CompositorStats};
pub use overlay::{
    blit_rounded, stroke_rounded, PipPosition, WebcamOverlayConfig, BORDER_ALPHA, BORDER_RGB,
    BORDER_WIDTH, PIP_ASPECT, PIP_PADDING, PIP_RADIUS, PIP_WIDTH_RATIO,
};
pub use scale::{ScaleAlgorithm, Scaler};
pub use zoom::{ZoomController, ZoomGesture, ZoomState, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
