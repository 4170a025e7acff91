use super::*;
use crate::foundation::core::Fps;
use crate::surface::memory::{RecordingSurface, SurfaceCall, segment_color};
use crate::surface::protocol::SegmentSelector;
use crate::timeline::plan::plan;

async fn installed(segments: usize) -> RecordingSurface {
    let mut surface = RecordingSurface::new(segments);
    protocol::install(&mut surface, SegmentSelector::Marker)
        .await
        .unwrap();
    surface
}

fn frame_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn pixel(path: &Path) -> [u8; 3] {
    let img = image::open(path).unwrap().to_rgb8();
    img.get_pixel(0, 0).0
}

#[tokio::test(start_paused = true)]
async fn two_segments_at_ten_fps_write_fifty_ordered_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let frames_dir = tmp.path().join("frames");
    let plan = plan(&[2.0, 3.0], Fps::new(10, 1).unwrap()).unwrap();
    let mut surface = installed(2).await;

    let stats = capture_frames(&mut surface, &plan, &frames_dir, &CaptureOpts::default())
        .await
        .unwrap();

    assert_eq!(stats.frames_captured, 50);
    assert_eq!(stats.segments_shown, 2);
    assert_eq!(stats.segments_missing, 0);

    let expected: Vec<String> = (0..50).map(|i| FrameIndex(i).file_name()).collect();
    assert_eq!(frame_files(&frames_dir), expected);

    assert_eq!(pixel(&frames_dir.join("frame_000000.png")), segment_color(Some(0)));
    assert_eq!(pixel(&frames_dir.join("frame_000019.png")), segment_color(Some(0)));
    assert_eq!(pixel(&frames_dir.join("frame_000020.png")), segment_color(Some(1)));
    assert_eq!(pixel(&frames_dir.join("frame_000049.png")), segment_color(Some(1)));
    assert_eq!(surface.selections(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn settle_waits_are_honoured() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[0.1, 0.1], Fps::new(10, 1).unwrap()).unwrap();
    let mut surface = installed(2).await;

    let started = tokio::time::Instant::now();
    capture_frames(&mut surface, &plan, tmp.path(), &CaptureOpts::default())
        .await
        .unwrap();
    // 1000 ms stabilisation plus 800 ms per segment.
    assert!(started.elapsed() >= Duration::from_millis(2600));
}

#[tokio::test(start_paused = true)]
async fn zero_frame_segments_are_never_selected() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[1.0, 0.0, 0.01, 1.0], Fps::new(10, 1).unwrap()).unwrap();
    let mut surface = installed(4).await;

    let stats = capture_frames(&mut surface, &plan, tmp.path(), &CaptureOpts::default())
        .await
        .unwrap();

    assert_eq!(stats.frames_captured, 20);
    assert_eq!(stats.segments_skipped_empty, 2);
    assert_eq!(surface.selections(), vec![0, 3]);
    assert_eq!(frame_files(tmp.path()).len(), 20);
}

#[tokio::test(start_paused = true)]
async fn missing_segment_warns_and_keeps_capturing_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[1.0, 1.0, 1.0], Fps::new(2, 1).unwrap()).unwrap();
    let mut surface = installed(2).await;

    let stats = capture_frames(&mut surface, &plan, tmp.path(), &CaptureOpts::default())
        .await
        .unwrap();

    assert_eq!(stats.frames_captured, 6);
    assert_eq!(stats.segments_shown, 2);
    assert_eq!(stats.segments_missing, 1);
    // The last visible segment stays on screen.
    assert_eq!(pixel(&tmp.path().join("frame_000005.png")), segment_color(Some(1)));
}

#[tokio::test(start_paused = true)]
async fn missing_segment_fails_under_strict_policy() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[1.0, 1.0], Fps::new(2, 1).unwrap()).unwrap();
    let mut surface = installed(1).await;
    let opts = CaptureOpts {
        missing_segment: MissingSegmentPolicy::Fail,
        ..CaptureOpts::default()
    };

    let err = capture_frames(&mut surface, &plan, tmp.path(), &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Capture(_)));
    assert!(err.to_string().contains("segment 1"));
    assert_eq!(frame_files(tmp.path()).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_protocol_still_captures_every_frame() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[1.0], Fps::new(3, 1).unwrap()).unwrap();
    let mut surface = RecordingSurface::new(1).without_protocol();

    let stats = capture_frames(&mut surface, &plan, tmp.path(), &CaptureOpts::default())
        .await
        .unwrap();
    assert_eq!(stats.frames_captured, 3);
    assert_eq!(stats.segments_missing, 1);
}

#[tokio::test(start_paused = true)]
async fn screenshot_failure_aborts_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = plan(&[1.0, 1.0], Fps::new(5, 1).unwrap()).unwrap();
    let mut surface = installed(2).await.fail_screenshot_at(7);

    let err = capture_frames(&mut surface, &plan, tmp.path(), &CaptureOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Capture(_)));
    assert!(err.to_string().contains("frame 7"));
    assert_eq!(surface.screenshot_count(), 7);
    assert_eq!(frame_files(tmp.path()).len(), 7);
    // No retry and no further selections after the failure.
    let shots = surface
        .calls()
        .iter()
        .filter(|c| matches!(c, SurfaceCall::Screenshot { .. }))
        .count();
    assert_eq!(shots, 7);
}
