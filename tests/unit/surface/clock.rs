use super::*;
use crate::surface::memory::RecordingSurface;

#[test]
fn default_threshold_is_one_second() {
    assert_eq!(
        SuppressionPolicy::default().short_delay,
        Duration::from_millis(1000)
    );
}

#[test]
fn script_gates_timers_intervals_and_animation_frames() {
    let s = suppressor_script(SuppressionPolicy::default());
    assert!(s.contains("var THRESHOLD_MS = 1000;"));
    assert!(s.contains("if (ms < THRESHOLD_MS)"));
    assert!(s.contains("window.setInterval = function"));
    assert!(s.contains("window.requestAnimationFrame = function"));
    assert!(s.contains("m.currentTime = 0"));
    // Declarative transitions are never touched.
    assert!(!s.contains("transition"));
}

#[test]
fn script_uses_configured_threshold() {
    let s = suppressor_script(SuppressionPolicy {
        short_delay: Duration::from_millis(250),
    });
    assert!(s.contains("var THRESHOLD_MS = 250;"));
}

#[test]
fn stats_deserialize_from_camel_case() {
    let v = serde_json::json!({
        "allowedTimeouts": 2,
        "suppressedTimeouts": 1,
        "suppressedIntervals": 3,
        "suppressedFrames": 4,
        "pausedMedia": 1
    });
    let stats: ClockStats = serde_json::from_value(v).unwrap();
    assert_eq!(stats.allowed_timeouts, 2);
    assert_eq!(stats.suppressed_timeouts, 1);
    assert_eq!(stats.suppressed_intervals, 3);
    assert_eq!(stats.suppressed_frames, 4);
    assert_eq!(stats.paused_media, 1);
}

#[tokio::test]
async fn suppress_goes_through_the_control_seam() {
    let mut surface = RecordingSurface::new(1);
    let stats = suppress(&mut surface, SuppressionPolicy::default())
        .await
        .unwrap();
    assert_eq!(stats, ClockStats::default());
    assert!(matches!(
        surface.calls().as_slice(),
        [crate::surface::memory::SurfaceCall::Control(ControlCall::Suppress(_))]
    ));
}
