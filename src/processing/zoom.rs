//! Live pan/zoom state
//!
//! Zoom is driven by a held gesture (key + wheel): wheel steps change the level
//! by [`ZOOM_STEP`], pointer movement moves the center, releasing the gesture
//! resets the view.

use crate::types::{Rect, Resolution};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 5.0;
pub const ZOOM_STEP: f64 = 0.25;

/// Zoom level and normalized center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub level: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            level: MIN_ZOOM,
            center_x: 0.5,
            center_y: 0.5,
        }
    }
}

impl ZoomState {
    /// Create a zoom state, clamping every field into range
    pub fn new(level: f64, center_x: f64, center_y: f64) -> Self {
        Self {
            level: clamp_level(level),
            center_x: clamp_unit(center_x),
            center_y: clamp_unit(center_y),
        }
    }

    /// Zoom is active only above 1x
    pub fn enabled(&self) -> bool {
        self.level > MIN_ZOOM
    }

    /// Source region to draw scaled onto the full surface
    pub fn crop_rect(&self, surface: Resolution) -> Rect {
        let full = Rect::of(surface);
        if !self.enabled() {
            return full;
        }

        let width = full.width / self.level;
        let height = full.height / self.level;
        let x = self.center_x * full.width - width / 2.0;
        let y = self.center_y * full.height - height / 2.0;

        Rect::new(
            x.clamp(0.0, full.width - width),
            y.clamp(0.0, full.height - height),
            width,
            height,
        )
    }

    pub fn zoom_in(&mut self) {
        self.level = clamp_level(self.level + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.level = clamp_level(self.level - ZOOM_STEP);
    }

    pub fn set_center(&mut self, x: f64, y: f64) {
        self.center_x = clamp_unit(x);
        self.center_y = clamp_unit(y);
    }

    pub fn reset(&mut self) {
        self.level = MIN_ZOOM;
    }
}

fn clamp_level(level: f64) -> f64 {
    if level.is_nan() {
        MIN_ZOOM
    } else {
        level.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Input gesture affecting zoom; coordinates are normalized to `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomGesture {
    /// Zoom key pressed
    Hold,
    /// Zoom key released
    Release,
    /// Wheel moved; negative `delta_y` zooms in
    Wheel { delta_y: f64, x: f64, y: f64 },
    /// Pointer moved
    Move { x: f64, y: f64 },
}

/// Applies gestures to a [`ZoomState`]
#[derive(Debug, Clone, Default)]
pub struct ZoomController {
    state: ZoomState,
    held: bool,
}

impl ZoomController {
    pub fn state(&self) -> ZoomState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Apply a gesture; returns true when the zoom state changed
    pub fn apply(&mut self, gesture: ZoomGesture) -> bool {
        let before = self.state;
        match gesture {
            ZoomGesture::Hold => self.held = true,
            ZoomGesture::Release => {
                self.held = false;
                if self.state.enabled() {
                    self.state.reset();
                    tracing::debug!("Zoom reset");
                }
            }
            ZoomGesture::Wheel { delta_y, x, y } => {
                if !self.held {
                    return false;
                }
                self.state.set_center(x, y);
                if delta_y < 0.0 {
                    self.state.zoom_in();
                } else {
                    self.state.zoom_out();
                }
                if self.state.enabled() {
                    tracing::debug!("Zoom: {:.1}x", self.state.level);
                }
            }
            ZoomGesture::Move { x, y } => {
                if self.held && self.state.enabled() {
                    self.state.set_center(x, y);
                }
            }
        }
        self.state != before
    }

    /// Drop any held gesture and return to 1x
    pub fn clear(&mut self) {
        self.held = false;
        self.state.reset();
    }
}
