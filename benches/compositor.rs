use criterion::{black_box, criterion_group, criterion_main, Criterion};
use snaprec::capture::StillVideoTrack;
use snaprec::processing::{Compositor, PipPosition, WebcamOverlayConfig, ZoomState};
use snaprec::{Framerate, Resolution};
use std::sync::Arc;

fn compositor(webcam: bool) -> Compositor {
    let screen = Arc::new(StillVideoTrack::bars("screen", Resolution::FHD_1080P));
    let cam = webcam.then(|| {
        Arc::new(StillVideoTrack::bars("webcam", Resolution::new(640, 480)))
            as Arc<dyn snaprec::capture::VideoTrack>
    });
    Compositor::new(screen, cam, Framerate::FPS_30).unwrap()
}

fn bench_draw(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_frame_1080p");

    let mut plain = compositor(false);
    let overlay_off = WebcamOverlayConfig::default();
    group.bench_function("screen", |b| {
        b.iter(|| plain.draw_frame(black_box(&ZoomState::default()), &overlay_off).unwrap())
    });

    let zoom = ZoomState::new(2.5, 0.3, 0.6);
    group.bench_function("zoomed", |b| {
        b.iter(|| plain.draw_frame(black_box(&zoom), &overlay_off).unwrap())
    });

    let mut with_cam = compositor(true);
    let overlay_on = WebcamOverlayConfig::new(true, PipPosition::BottomRight);
    group.bench_function("zoomed_with_webcam", |b| {
        b.iter(|| with_cam.draw_frame(black_box(&zoom), &overlay_on).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_draw);
criterion_main!(benches);
