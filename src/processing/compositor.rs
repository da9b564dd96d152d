//! Frame compositor
//!
//! Draws the screen track onto a fixed-size surface at the configured
//! framerate, applying the live zoom crop and the webcam overlay.

use super::overlay::{
    blit_rounded, stroke_rounded, WebcamOverlayConfig, BORDER_ALPHA, BORDER_RGB, BORDER_WIDTH,
    PIP_RADIUS,
};
use super::scale::Scaler;
use super::zoom::ZoomState;
use crate::capture::VideoTrack;
use crate::error::{Error, Result};
use crate::types::{Frame, Framerate, Resolution};

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Compositor statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorStats {
    pub frames_drawn: u64,
    pub frames_skipped: u64,
    pub frames_dropped: u64,
}

/// Draws composited frames for one capture session
pub struct Compositor {
    surface: Resolution,
    framerate: Framerate,
    screen: Arc<dyn VideoTrack>,
    webcam: Option<Arc<dyn VideoTrack>>,
    scaler: Scaler,
    stats: CompositorStats,
}

impl Compositor {
    /// Create a compositor sized to the screen track
    pub fn new(
        screen: Arc<dyn VideoTrack>,
        webcam: Option<Arc<dyn VideoTrack>>,
        framerate: Framerate,
    ) -> Result<Self> {
        let surface = screen
            .resolution()
            .filter(|r| r.width > 0 && r.height > 0)
            .ok_or_else(|| {
                Error::Acquisition(format!("{} has no usable resolution", screen.label()))
            })?;

        Ok(Self {
            surface,
            framerate,
            screen,
            webcam,
            scaler: Scaler::default(),
            stats: CompositorStats::default(),
        })
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = scaler;
        self
    }

    /// Drawing surface size
    pub fn surface(&self) -> Resolution {
        self.surface
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    /// Draw one frame.
    ///
    /// Fails with `CompositingFrame` when the screen track has nothing to draw;
    /// the caller skips that tick.
    pub fn draw_frame(&mut self, zoom: &ZoomState, overlay: &WebcamOverlayConfig) -> Result<Frame> {
        let source = self
            .screen
            .latest_frame()
            .ok_or_else(|| Error::CompositingFrame(format!("{} has no frame", self.screen.label())))?;

        let mut surface = if zoom.enabled() {
            let crop = zoom.crop_rect(source.resolution());
            self.scaler.crop_scale(&source, crop, self.surface)?
        } else {
            self.scaler.scale(&source, self.surface)?
        };

        if overlay.enabled {
            if let Some(webcam) = &self.webcam {
                self.draw_webcam(&mut surface, webcam.as_ref(), overlay);
            }
        }

        Ok(surface)
    }

    fn draw_webcam(&self, surface: &mut Frame, webcam: &dyn VideoTrack, overlay: &WebcamOverlayConfig) {
        if !webcam.is_ready() {
            return;
        }
        let Some(cam) = webcam.latest_frame() else {
            return;
        };

        let rect = overlay.pip_rect(self.surface);
        let size = WebcamOverlayConfig::pip_size(self.surface);
        match self.scaler.scale(&cam, size) {
            Ok(scaled) => {
                blit_rounded(surface, &scaled, rect, PIP_RADIUS);
                stroke_rounded(surface, rect, PIP_RADIUS, BORDER_WIDTH, BORDER_RGB, BORDER_ALPHA);
            }
            Err(e) => tracing::debug!("Webcam overlay skipped: {}", e),
        }
    }

    /// Draw at the configured framerate until the output is closed.
    ///
    /// Waits for the screen track to become ready before the first frame.
    /// Frames are dropped, not queued, when the consumer falls behind.
    pub async fn run(
        mut self,
        zoom: watch::Receiver<ZoomState>,
        overlay: watch::Receiver<WebcamOverlayConfig>,
        output: mpsc::Sender<Frame>,
    ) -> CompositorStats {
        let period = self.framerate.frame_interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.screen.is_ready() {
            if output.is_closed() {
                return self.stats;
            }
            interval.tick().await;
        }

        tracing::info!(
            "Compositor drawing {} at {} from {}",
            self.surface,
            self.framerate,
            self.screen.label()
        );
        let started = tokio::time::Instant::now();

        loop {
            interval.tick().await;
            if output.is_closed() {
                break;
            }

            let zoom_state = *zoom.borrow();
            let overlay_state = *overlay.borrow();

            match self.draw_frame(&zoom_state, &overlay_state) {
                Ok(mut frame) => {
                    frame.pts = started.elapsed().as_micros() as i64;
                    self.stats.frames_drawn += 1;
                    match output.try_send(frame) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => self.stats.frames_dropped += 1,
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
                Err(e) => {
                    self.stats.frames_skipped += 1;
                    tracing::trace!("{}", e);
                }
            }
        }

        tracing::debug!("Compositor stopped: {:?}", self.stats);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StillVideoTrack;
    use crate::processing::PipPosition;
    use crate::types::BYTES_PER_PIXEL;

    fn quadrants(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize * BYTES_PER_PIXEL;
                let color = match (x < width / 2, y < height / 2) {
                    (true, true) => [255, 0, 0, 255],
                    (false, true) => [0, 255, 0, 255],
                    (true, false) => [0, 0, 255, 255],
                    (false, false) => [255, 255, 0, 255],
                };
                frame.data[idx..idx + 4].copy_from_slice(&color);
            }
        }
        frame
    }

    fn screen(frame: Frame) -> Arc<dyn VideoTrack> {
        Arc::new(StillVideoTrack::new("screen:0", frame))
    }

    #[test]
    fn test_level_one_draws_identical_frame() {
        let source = quadrants(64, 48);
        let mut compositor = Compositor::new(screen(source.clone()), None, Framerate::FPS_30).unwrap();
        let out = compositor
            .draw_frame(&ZoomState::default(), &WebcamOverlayConfig::default())
            .unwrap();
        assert_eq!(out.data, source.data);
    }

    #[test]
    fn test_zoom_into_corner_fills_surface() {
        let source = quadrants(64, 48);
        let mut compositor = Compositor::new(screen(source), None, Framerate::FPS_30).unwrap();
        let zoom = ZoomState::new(2.0, 0.0, 0.0);
        let out = compositor.draw_frame(&zoom, &WebcamOverlayConfig::default()).unwrap();
        assert_eq!(out.resolution(), Resolution::new(64, 48));
        assert_eq!(out.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(out.pixel(62, 46), [255, 0, 0, 255]);
    }

    #[test]
    fn test_webcam_drawn_in_chosen_corner() {
        let source = Frame::filled(400, 300, [0, 0, 0, 255]);
        let cam: Arc<dyn VideoTrack> =
            Arc::new(StillVideoTrack::new("webcam", Frame::filled(32, 24, [0, 200, 0, 255])));
        let mut compositor = Compositor::new(screen(source), Some(cam), Framerate::FPS_30).unwrap();

        let overlay = WebcamOverlayConfig::new(true, PipPosition::TopLeft);
        let out = compositor.draw_frame(&ZoomState::default(), &overlay).unwrap();
        // pip is 60x45 at (20, 20)
        assert_eq!(out.pixel(50, 40), [0, 200, 0, 255]);
        assert_eq!(out.pixel(350, 250), [0, 0, 0, 255]);

        let hidden = WebcamOverlayConfig::new(false, PipPosition::TopLeft);
        let out = compositor.draw_frame(&ZoomState::default(), &hidden).unwrap();
        assert_eq!(out.pixel(50, 40), [0, 0, 0, 255]);
    }

    #[test]
    fn test_missing_frame_is_skipped_error() {
        let track = Arc::new(StillVideoTrack::new("screen:0", Frame::new(8, 8)));
        let mut compositor = Compositor::new(track.clone(), None, Framerate::FPS_30).unwrap();
        track.stop();
        let err = compositor
            .draw_frame(&ZoomState::default(), &WebcamOverlayConfig::default())
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_frames_until_closed() {
        let compositor = Compositor::new(screen(Frame::new(16, 16)), None, Framerate::FPS_30).unwrap();
        let (_zoom_tx, zoom_rx) = watch::channel(ZoomState::default());
        let (_overlay_tx, overlay_rx) = watch::channel(WebcamOverlayConfig::default());
        let (tx, mut rx) = mpsc::channel(64);

        let handle = tokio::spawn(compositor.run(zoom_rx, overlay_rx, tx));

        let mut received = 0;
        while received < 10 {
            rx.recv().await.unwrap();
            received += 1;
        }
        drop(rx);
        let stats = handle.await.unwrap();
        assert!(stats.frames_drawn >= 10);
        assert_eq!(stats.frames_skipped, 0);
    }
}
