//! Webcam picture-in-picture overlay
//!
//! The PIP is a rounded rectangle, 15% of the surface width with a 4:3 aspect,
//! inset from one corner and outlined with a translucent white border.

use crate::types::{Frame, Rect, Resolution, BYTES_PER_PIXEL};
use serde::{Deserialize, Serialize};

/// PIP width as a fraction of the surface width
pub const PIP_WIDTH_RATIO: f64 = 0.15;
/// PIP height as a fraction of its width
pub const PIP_ASPECT: f64 = 0.75;
/// Inset from the surface edges, in pixels
pub const PIP_PADDING: f64 = 20.0;
/// Corner radius, in pixels
pub const PIP_RADIUS: f64 = 8.0;
/// Border stroke width, in pixels
pub const BORDER_WIDTH: f64 = 2.0;
/// Border color (white) and opacity
pub const BORDER_RGB: [u8; 3] = [255, 255, 255];
pub const BORDER_ALPHA: f64 = 0.4;

/// Surface corner the webcam is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl PipPosition {
    pub const ALL: [PipPosition; 4] = [
        PipPosition::TopLeft,
        PipPosition::TopRight,
        PipPosition::BottomLeft,
        PipPosition::BottomRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipPosition::TopLeft => "top-left",
            PipPosition::TopRight => "top-right",
            PipPosition::BottomLeft => "bottom-left",
            PipPosition::BottomRight => "bottom-right",
        }
    }
}

impl std::str::FromStr for PipPosition {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        PipPosition::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| crate::Error::Config(format!("Unknown webcam position: {}", s)))
    }
}

impl std::fmt::Display for PipPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Webcam overlay state read by the compositor on every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WebcamOverlayConfig {
    pub enabled: bool,
    pub position: PipPosition,
}

impl WebcamOverlayConfig {
    pub fn new(enabled: bool, position: PipPosition) -> Self {
        Self { enabled, position }
    }

    /// PIP size on a surface
    pub fn pip_size(surface: Resolution) -> Resolution {
        let width = (surface.width as f64 * PIP_WIDTH_RATIO).round();
        let height = (width * PIP_ASPECT).round();
        Resolution::new(width.max(1.0) as u32, height.max(1.0) as u32)
    }

    /// PIP rectangle on a surface
    pub fn pip_rect(&self, surface: Resolution) -> Rect {
        let size = Self::pip_size(surface);
        let (w, h) = (size.width as f64, size.height as f64);
        let (sw, sh) = (surface.width as f64, surface.height as f64);

        let (x, y) = match self.position {
            PipPosition::TopLeft => (PIP_PADDING, PIP_PADDING),
            PipPosition::TopRight => (sw - w - PIP_PADDING, PIP_PADDING),
            PipPosition::BottomLeft => (PIP_PADDING, sh - h - PIP_PADDING),
            PipPosition::BottomRight => (sw - w - PIP_PADDING, sh - h - PIP_PADDING),
        };

        Rect::new(x, y, w, h)
    }
}

/// Signed distance from a point to a rounded rectangle; negative inside
fn rounded_rect_sdf(px: f64, py: f64, rect: &Rect, radius: f64) -> f64 {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let cx = rect.x + rect.width / 2.0;
    let cy = rect.y + rect.height / 2.0;
    let qx = (px - cx).abs() - (rect.width / 2.0 - radius);
    let qy = (py - cy).abs() - (rect.height / 2.0 - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    outside + qx.max(qy).min(0.0) - radius
}

/// Pixel range covered by `rect`, clipped to the frame
fn pixel_bounds(frame: &Frame, rect: &Rect) -> (u32, u32, u32, u32) {
    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    let x1 = (rect.right().ceil().max(0.0) as u32).min(frame.width);
    let y1 = (rect.bottom().ceil().max(0.0) as u32).min(frame.height);
    (x0, y0, x1, y1)
}

/// Copy `src` into `dst` at `rect`, clipped to rounded corners.
///
/// `src` is expected to already be scaled to the rectangle's size.
pub fn blit_rounded(dst: &mut Frame, src: &Frame, rect: Rect, radius: f64) {
    if !src.is_complete() || src.width == 0 || src.height == 0 {
        return;
    }
    let (x0, y0, x1, y1) = pixel_bounds(dst, &rect);
    let dst_stride = dst.stride();

    for y in y0..y1 {
        let sy = ((y as f64 - rect.y).floor().max(0.0) as u32).min(src.height - 1);
        for x in x0..x1 {
            if rounded_rect_sdf(x as f64 + 0.5, y as f64 + 0.5, &rect, radius) > 0.0 {
                continue;
            }
            let sx = ((x as f64 - rect.x).floor().max(0.0) as u32).min(src.width - 1);
            let s = sy as usize * src.stride() + sx as usize * BYTES_PER_PIXEL;
            let d = y as usize * dst_stride + x as usize * BYTES_PER_PIXEL;
            dst.data[d..d + 3].copy_from_slice(&src.data[s..s + 3]);
            dst.data[d + 3] = 255;
        }
    }
}

/// Stroke the outline of a rounded rectangle with a translucent color
pub fn stroke_rounded(dst: &mut Frame, rect: Rect, radius: f64, width: f64, rgb: [u8; 3], alpha: f64) {
    let half = width / 2.0;
    let outer = Rect::new(rect.x - half, rect.y - half, rect.width + width, rect.height + width);
    let (x0, y0, x1, y1) = pixel_bounds(dst, &outer);
    let stride = dst.stride();
    let alpha = alpha.clamp(0.0, 1.0);

    for y in y0..y1 {
        for x in x0..x1 {
            let d = rounded_rect_sdf(x as f64 + 0.5, y as f64 + 0.5, &rect, radius);
            if d.abs() > half {
                continue;
            }
            let idx = y as usize * stride + x as usize * BYTES_PER_PIXEL;
            for c in 0..3 {
                let base = dst.data[idx + c] as f64;
                dst.data[idx + c] = (base * (1.0 - alpha) + rgb[c] as f64 * alpha).round() as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Resolution = Resolution::new(1920, 1080);

    #[test]
    fn test_pip_size() {
        assert_eq!(WebcamOverlayConfig::pip_size(HD), Resolution::new(288, 216));
        assert_eq!(
            WebcamOverlayConfig::pip_size(Resolution::new(1280, 720)),
            Resolution::new(192, 144)
        );
    }

    #[test]
    fn test_pip_rect_all_corners() {
        let rect = |position| WebcamOverlayConfig::new(true, position).pip_rect(HD);

        assert_eq!(rect(PipPosition::TopLeft), Rect::new(20.0, 20.0, 288.0, 216.0));
        assert_eq!(rect(PipPosition::TopRight), Rect::new(1612.0, 20.0, 288.0, 216.0));
        assert_eq!(rect(PipPosition::BottomLeft), Rect::new(20.0, 844.0, 288.0, 216.0));
        assert_eq!(rect(PipPosition::BottomRight), Rect::new(1612.0, 844.0, 288.0, 216.0));
    }

    #[test]
    fn test_default_is_bottom_right() {
        assert_eq!(PipPosition::default(), PipPosition::BottomRight);
        assert_eq!("top-right".parse::<PipPosition>().unwrap(), PipPosition::TopRight);
        assert!("middle".parse::<PipPosition>().is_err());
    }

    #[test]
    fn test_blit_clips_corners() {
        let mut dst = Frame::filled(100, 100, [0, 0, 0, 255]);
        let src = Frame::filled(40, 30, [200, 10, 10, 255]);
        let rect = Rect::new(10.0, 10.0, 40.0, 30.0);
        blit_rounded(&mut dst, &src, rect, PIP_RADIUS);

        assert_eq!(dst.pixel(30, 25), [200, 10, 10, 255]);
        // corner pixel lies outside the radius
        assert_eq!(dst.pixel(10, 10), [0, 0, 0, 255]);
        assert_eq!(dst.pixel(49, 39), [0, 0, 0, 255]);
        // outside the rect entirely
        assert_eq!(dst.pixel(60, 60), [0, 0, 0, 255]);
    }

    #[test]
    fn test_border_blends_white() {
        let mut dst = Frame::filled(100, 100, [0, 0, 0, 255]);
        let rect = Rect::new(10.0, 10.0, 40.0, 30.0);
        stroke_rounded(&mut dst, rect, PIP_RADIUS, BORDER_WIDTH, BORDER_RGB, BORDER_ALPHA);

        // middle of the top edge
        let px = dst.pixel(30, 10);
        assert_eq!(px, [102, 102, 102, 255]);
        // interior untouched
        assert_eq!(dst.pixel(30, 25), [0, 0, 0, 255]);
    }
}
