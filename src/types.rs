//! Common types used throughout SnapRec

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    // Quality tier ceilings
    pub const SD_480P: Self = Self::new(854, 480);
    pub const HD_720P: Self = Self::new(1280, 720);
    pub const FHD_1080P: Self = Self::new(1920, 1080);

    /// Calculate total pixels
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Largest resolution with the same aspect ratio that fits inside `ceiling`
    pub fn fit_within(&self, ceiling: Resolution) -> Resolution {
        if self.width <= ceiling.width && self.height <= ceiling.height {
            return *self;
        }
        let scale = f64::min(
            ceiling.width as f64 / self.width as f64,
            ceiling.height as f64 / self.height as f64,
        );
        Resolution::new(
            ((self.width as f64 * scale).floor() as u32).max(1),
            ((self.height as f64 * scale).floor() as u32).max(1),
        )
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FHD_1080P
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Framerate representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

impl Framerate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    // Common framerates
    pub const FPS_15: Self = Self::new(15, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);

    /// Get framerate as f64
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }

    /// Get framerate as integer fps
    pub fn fps(&self) -> u32 {
        if self.den == 0 {
            self.num
        } else {
            self.num / self.den
        }
    }

    /// Draw interval, rounded to whole milliseconds
    pub fn frame_interval(&self) -> Duration {
        let fps = self.as_f64().max(1.0);
        Duration::from_millis((1000.0 / fps).round().max(1.0) as u64)
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{} fps", self.num)
        } else {
            write!(f, "{:.2} fps", self.as_f64())
        }
    }
}

/// An RGBA video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Tightly packed RGBA rows
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Presentation timestamp in microseconds
    pub pts: i64,
}

impl Frame {
    /// Create a black, opaque frame
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 255;
        }
        Self {
            data,
            width,
            height,
            pts: 0,
        }
    }

    /// Create a frame filled with one color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height);
        for px in frame.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
        frame
    }

    /// Create a frame from existing data
    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            pts: 0,
        }
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Row stride in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Does the buffer hold a full frame?
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Read one pixel
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Axis-aligned rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-surface rectangle
    pub fn of(resolution: Resolution) -> Self {
        Self::new(0.0, 0.0, resolution.width as f64, resolution.height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Is `other` fully inside this rectangle (with a small float tolerance)?
    pub fn contains_rect(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}
