//! Desktop + microphone mixing

use super::{AudioFormat, AudioFrame, AudioTrack};
use crate::error::{Error, Result};

/// Combine the available audio sources into at most one track.
///
/// - no sources: no audio track
/// - one source: passed through unchanged
/// - two sources: summed sample by sample
///
/// When the two formats disagree the desktop track is kept and the
/// microphone dropped.
pub fn mix_sources(
    desktop: Option<Box<dyn AudioTrack>>,
    mic: Option<Box<dyn AudioTrack>>,
) -> Option<Box<dyn AudioTrack>> {
    match (desktop, mic) {
        (None, None) => None,
        (Some(track), None) | (None, Some(track)) => {
            tracing::info!("Audio: single source ({})", track.label());
            Some(track)
        }
        (Some(desktop), Some(mut mic)) => {
            if desktop.format() != mic.format() {
                let err = Error::MixingDegradation(format!(
                    "microphone format {} does not match desktop {}; recording desktop audio only",
                    mic.format(),
                    desktop.format()
                ));
                tracing::warn!("{}", err);
                mic.stop();
                return Some(desktop);
            }
            tracing::info!("Audio: mixing {} + {}", desktop.label(), mic.label());
            Some(Box::new(MixedTrack::new(desktop, mic)))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Input {
    Desktop,
    Mic,
}

/// Sum of two audio tracks; survives the loss of either one
pub struct MixedTrack {
    label: String,
    format: AudioFormat,
    desktop: Option<Box<dyn AudioTrack>>,
    mic: Option<Box<dyn AudioTrack>>,
}

impl MixedTrack {
    pub fn new(desktop: Box<dyn AudioTrack>, mic: Box<dyn AudioTrack>) -> Self {
        Self {
            label: format!("{} + {}", desktop.label(), mic.label()),
            format: desktop.format(),
            desktop: Some(desktop),
            mic: Some(mic),
        }
    }

    /// Number of sources still feeding the mix
    pub fn live_sources(&self) -> usize {
        self.desktop.is_some() as usize + self.mic.is_some() as usize
    }

    fn survive(&mut self, input: Input, result: Result<AudioFrame>) -> Option<AudioFrame> {
        match result {
            Ok(frame) => Some(frame),
            Err(e) => {
                let slot = match input {
                    Input::Desktop => &mut self.desktop,
                    Input::Mic => &mut self.mic,
                };
                if let Some(mut track) = slot.take() {
                    tracing::warn!(
                        "{}",
                        Error::MixingDegradation(format!("{} lost: {}", track.label(), e))
                    );
                    track.stop();
                }
                None
            }
        }
    }
}

/// Sum `b` into `a`, clamping to full scale
fn mix_frames(mut a: AudioFrame, b: &AudioFrame) -> AudioFrame {
    for (i, s) in b.samples.iter().enumerate() {
        match a.samples.get_mut(i) {
            Some(dst) => *dst = (*dst + s).clamp(-1.0, 1.0),
            None => a.samples.push(s.clamp(-1.0, 1.0)),
        }
    }
    a
}

#[async_trait::async_trait]
impl AudioTrack for MixedTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn is_live(&self) -> bool {
        self.desktop.as_ref().is_some_and(|t| t.is_live())
            || self.mic.as_ref().is_some_and(|t| t.is_live())
    }

    async fn next_frame(&mut self) -> Result<AudioFrame> {
        let (desktop, mic) = match (&mut self.desktop, &mut self.mic) {
            (Some(d), Some(m)) => {
                let (a, b) = futures::future::join(d.next_frame(), m.next_frame()).await;
                (Some(a), Some(b))
            }
            (Some(d), None) => (Some(d.next_frame().await), None),
            (None, Some(m)) => (None, Some(m.next_frame().await)),
            (None, None) => return Err(Error::TrackEnded),
        };

        let desktop = desktop.and_then(|r| self.survive(Input::Desktop, r));
        let mic = mic.and_then(|r| self.survive(Input::Mic, r));

        match (desktop, mic) {
            (Some(a), Some(b)) => Ok(mix_frames(a, &b)),
            (Some(frame), None) | (None, Some(frame)) => Ok(frame),
            (None, None) => Err(Error::TrackEnded),
        }
    }

    fn stop(&mut self) {
        if let Some(track) = &mut self.desktop {
            track.stop();
        }
        if let Some(track) = &mut self.mic {
            track.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChannelLayout;
    use std::collections::VecDeque;

    struct Scripted {
        label: &'static str,
        format: AudioFormat,
        frames: VecDeque<Result<AudioFrame>>,
        stopped: bool,
    }

    impl Scripted {
        fn new(label: &'static str, frames: Vec<Result<Vec<f32>>>) -> Self {
            let format = AudioFormat::new(48_000, ChannelLayout::Mono);
            Self {
                label,
                format,
                frames: frames
                    .into_iter()
                    .map(|r| r.map(|s| AudioFrame::from_samples(s, format)))
                    .collect(),
                stopped: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl AudioTrack for Scripted {
        fn label(&self) -> &str {
            self.label
        }
        fn format(&self) -> AudioFormat {
            self.format
        }
        fn is_live(&self) -> bool {
            !self.stopped
        }
        async fn next_frame(&mut self) -> Result<AudioFrame> {
            self.frames.pop_front().unwrap_or(Err(Error::TrackEnded))
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[test]
    fn test_no_sources_no_track() {
        assert!(mix_sources(None, None).is_none());
    }

    #[tokio::test]
    async fn test_single_source_passthrough() {
        let mic = Scripted::new("mic", vec![Ok(vec![0.25, 0.5])]);
        let mut track = mix_sources(None, Some(Box::new(mic))).unwrap();
        assert_eq!(track.label(), "mic");
        assert_eq!(track.next_frame().await.unwrap().samples, vec![0.25, 0.5]);
    }

    #[tokio::test]
    async fn test_two_sources_are_summed() {
        let desktop = Scripted::new("desktop", vec![Ok(vec![0.25, 0.75, -0.5])]);
        let mic = Scripted::new("mic", vec![Ok(vec![0.25, 0.75])]);
        let mut track = mix_sources(Some(Box::new(desktop)), Some(Box::new(mic))).unwrap();
        let frame = track.next_frame().await.unwrap();
        assert_eq!(frame.samples, vec![0.5, 1.0, -0.5]);
    }

    #[tokio::test]
    async fn test_survives_mic_loss() {
        let desktop = Scripted::new("desktop", vec![Ok(vec![0.1]), Ok(vec![0.2]), Ok(vec![0.3])]);
        let mic = Scripted::new("mic", vec![Ok(vec![0.1])]);
        let mut track = MixedTrack::new(Box::new(desktop), Box::new(mic));

        assert!((track.next_frame().await.unwrap().samples[0] - 0.2).abs() < 1e-6);
        // mic ends here; desktop frame still comes through
        assert!((track.next_frame().await.unwrap().samples[0] - 0.2).abs() < 1e-6);
        assert_eq!(track.live_sources(), 1);
        assert!((track.next_frame().await.unwrap().samples[0] - 0.3).abs() < 1e-6);
        assert!(matches!(track.next_frame().await, Err(Error::TrackEnded)));
        assert_eq!(track.live_sources(), 0);
    }

    #[test]
    fn test_format_mismatch_prefers_desktop() {
        let desktop = Scripted::new("desktop", vec![]);
        let mut mic = Scripted::new("mic", vec![]);
        mic.format = AudioFormat::new(44_100, ChannelLayout::Mono);
        let track = mix_sources(Some(Box::new(desktop)), Some(Box::new(mic))).unwrap();
        assert_eq!(track.label(), "desktop");
    }
}
