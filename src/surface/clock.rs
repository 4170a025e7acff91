use std::time::Duration;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::Surface;
use crate::surface::protocol::ControlCall;

/// Which asynchronous callbacks may still run inside the surface during capture.
///
/// One-shot timers shorter than `short_delay` run normally (settle helpers and short transition
/// helpers rely on them). Longer one-shot timers, repeating timers and animation-frame callbacks
/// never run. CSS transitions are untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SuppressionPolicy {
    /// Longest one-shot delay that is still allowed (exclusive).
    pub short_delay: Duration,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            short_delay: Duration::from_millis(1000),
        }
    }
}

/// Counters reported by the in-surface clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClockStats {
    /// One-shot timers passed through to the native scheduler.
    pub allowed_timeouts: u64,
    /// One-shot timers dropped for exceeding the short-delay threshold.
    pub suppressed_timeouts: u64,
    /// Repeating timers dropped.
    pub suppressed_intervals: u64,
    /// Animation-frame callbacks dropped.
    pub suppressed_frames: u64,
    /// Media elements paused and rewound.
    pub paused_media: u64,
}

const CLOCK_TEMPLATE: &str = r#"(function () {
  var clock = window.__slidecastClock;
  if (!clock) {
    var THRESHOLD_MS = __THRESHOLD_MS__;
    var nativeSetTimeout = window.setTimeout.bind(window);
    var stats = {
      allowedTimeouts: 0,
      suppressedTimeouts: 0,
      suppressedIntervals: 0,
      suppressedFrames: 0,
      pausedMedia: 0
    };

    window.setTimeout = function (callback, delay) {
      var ms = Number(delay) || 0;
      if (ms < THRESHOLD_MS) {
        stats.allowedTimeouts += 1;
        return nativeSetTimeout.apply(null, arguments);
      }
      stats.suppressedTimeouts += 1;
      return 0;
    };
    window.setInterval = function () {
      stats.suppressedIntervals += 1;
      return 0;
    };
    window.requestAnimationFrame = function () {
      stats.suppressedFrames += 1;
      return 0;
    };

    clock = {
      settle: function (ms) {
        return new Promise(function (resolve) { nativeSetTimeout(resolve, Number(ms) || 0); });
      },
      pauseMedia: function () {
        var media = document.querySelectorAll('audio, video');
        Array.prototype.forEach.call(media, function (m) {
          try { m.pause(); m.currentTime = 0; } catch (e) {}
          stats.pausedMedia += 1;
        });
      },
      stats: function () {
        return {
          allowedTimeouts: stats.allowedTimeouts,
          suppressedTimeouts: stats.suppressedTimeouts,
          suppressedIntervals: stats.suppressedIntervals,
          suppressedFrames: stats.suppressedFrames,
          pausedMedia: stats.pausedMedia
        };
      }
    };
    Object.defineProperty(window, '__slidecastClock', { value: clock });
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', clock.pauseMedia);
  } else {
    clock.pauseMedia();
  }
  return clock.stats();
})()"#;

/// Script installing the deterministic clock as `window.__slidecastClock`.
///
/// The clock keeps the native one-shot scheduler private and only exposes `settle(ms)`,
/// `pauseMedia()` and `stats()`. Installing twice keeps the first clock and only re-pauses media,
/// so the same script serves as a preload and as the post-load application.
pub fn suppressor_script(policy: SuppressionPolicy) -> String {
    CLOCK_TEMPLATE.replace("__THRESHOLD_MS__", &policy.short_delay.as_millis().to_string())
}

/// Apply the clock to a loaded surface and return its counters.
pub async fn suppress<S: Surface + ?Sized>(
    surface: &mut S,
    policy: SuppressionPolicy,
) -> SlidecastResult<ClockStats> {
    let v = surface.control(&ControlCall::Suppress(policy)).await?;
    if v.is_null() {
        return Ok(ClockStats::default());
    }
    serde_json::from_value(v)
        .map_err(|e| SlidecastError::surface(format!("unexpected clock stats: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/surface/clock.rs"]
mod tests;
