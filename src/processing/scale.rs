//! Frame scaling

use crate::error::{Error, Result};
use crate::types::{Frame, Rect, Resolution, BYTES_PER_PIXEL};

/// Scaling algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScaleAlgorithm {
    /// Nearest neighbor (fastest, pixelated)
    Nearest,
    /// Bilinear (fast, smooth)
    #[default]
    Bilinear,
}

/// Frame scaler
#[derive(Debug, Clone, Copy, Default)]
pub struct Scaler {
    algorithm: ScaleAlgorithm,
}

impl Scaler {
    pub fn new(algorithm: ScaleAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> ScaleAlgorithm {
        self.algorithm
    }

    /// Scale a whole frame to `dst`
    pub fn scale(&self, frame: &Frame, dst: Resolution) -> Result<Frame> {
        if frame.resolution() == dst {
            return Ok(frame.clone());
        }
        self.crop_scale(frame, Rect::of(frame.resolution()), dst)
    }

    /// Sample the `crop` region of `frame` into a new frame of size `dst`
    pub fn crop_scale(&self, frame: &Frame, crop: Rect, dst: Resolution) -> Result<Frame> {
        if !frame.is_complete() {
            return Err(Error::Scaling("Input buffer too small".into()));
        }
        if frame.width == 0 || frame.height == 0 || dst.width == 0 || dst.height == 0 {
            return Err(Error::Scaling("Zero-sized frame".into()));
        }
        if crop.width <= 0.0 || crop.height <= 0.0 {
            return Err(Error::Scaling("Empty crop region".into()));
        }

        let data = match self.algorithm {
            ScaleAlgorithm::Nearest => nearest(frame, crop, dst),
            ScaleAlgorithm::Bilinear => bilinear(frame, crop, dst),
        };

        Ok(Frame {
            data,
            width: dst.width,
            height: dst.height,
            pts: frame.pts,
        })
    }
}

fn nearest(frame: &Frame, crop: Rect, dst: Resolution) -> Vec<u8> {
    let src_w = frame.width as usize;
    let max_x = frame.width as f64 - 1.0;
    let max_y = frame.height as f64 - 1.0;
    let dst_w = dst.width as usize;
    let dst_h = dst.height as usize;
    let sx = crop.width / dst.width as f64;
    let sy = crop.height / dst.height as f64;

    let mut output = vec![0u8; dst_w * dst_h * BYTES_PER_PIXEL];

    for y in 0..dst_h {
        let src_y = (crop.y + (y as f64 + 0.5) * sy).floor().clamp(0.0, max_y) as usize;
        for x in 0..dst_w {
            let src_x = (crop.x + (x as f64 + 0.5) * sx).floor().clamp(0.0, max_x) as usize;

            let src_idx = (src_y * src_w + src_x) * BYTES_PER_PIXEL;
            let dst_idx = (y * dst_w + x) * BYTES_PER_PIXEL;

            output[dst_idx..dst_idx + BYTES_PER_PIXEL]
                .copy_from_slice(&frame.data[src_idx..src_idx + BYTES_PER_PIXEL]);
        }
    }

    output
}

fn bilinear(frame: &Frame, crop: Rect, dst: Resolution) -> Vec<u8> {
    let src_w = frame.width as usize;
    let max_x = frame.width as f64 - 1.0;
    let max_y = frame.height as f64 - 1.0;
    let dst_w = dst.width as usize;
    let dst_h = dst.height as usize;
    let sx = crop.width / dst.width as f64;
    let sy = crop.height / dst.height as f64;

    let mut output = vec![0u8; dst_w * dst_h * BYTES_PER_PIXEL];

    for y in 0..dst_h {
        let fy = (crop.y + (y as f64 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(frame.height as usize - 1);
        let wy = fy - y0 as f64;

        for x in 0..dst_w {
            let fx = (crop.x + (x as f64 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let wx = fx - x0 as f64;

            let p00 = (y0 * src_w + x0) * BYTES_PER_PIXEL;
            let p01 = (y0 * src_w + x1) * BYTES_PER_PIXEL;
            let p10 = (y1 * src_w + x0) * BYTES_PER_PIXEL;
            let p11 = (y1 * src_w + x1) * BYTES_PER_PIXEL;
            let dst_idx = (y * dst_w + x) * BYTES_PER_PIXEL;

            for c in 0..BYTES_PER_PIXEL {
                let top = frame.data[p00 + c] as f64 * (1.0 - wx) + frame.data[p01 + c] as f64 * wx;
                let bottom =
                    frame.data[p10 + c] as f64 * (1.0 - wx) + frame.data[p11 + c] as f64 * wx;
                output[dst_idx + c] = (top * (1.0 - wy) + bottom * wy).round() as u8;
            }
        }
    }

    output
}
