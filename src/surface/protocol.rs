use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::Surface;
use crate::surface::clock::{self, SuppressionPolicy};

/// Marker attribute content authors put on every segment element.
pub const SEGMENT_MARKER_ATTR: &str = "data-slide";

/// Class toggled on the visible segment so markup can key CSS transitions off it.
pub const ACTIVE_CLASS: &str = "active";

/// How segment elements are discovered inside the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentSelector {
    /// Elements carrying the [`SEGMENT_MARKER_ATTR`] attribute, in document order.
    #[default]
    Marker,
    /// Marker elements first; when none exist, fall back to `.slide`, `section` and any class
    /// containing `slide`. Compatibility shim for markup written without markers.
    Legacy,
}

impl SegmentSelector {
    fn css(self) -> &'static str {
        match self {
            Self::Marker => "[data-slide]",
            Self::Legacy => ".slide, section, [class*=\"slide\"]",
        }
    }
}

/// Calls understood by the in-surface control object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlCall {
    /// Define the control object (idempotent) and initialise it.
    Install(SegmentSelector),
    /// Rediscover segments and show the first one.
    InitSlides,
    /// Show exactly one segment and hide all others.
    SetSlide(usize),
    /// Number of discovered segments.
    TotalSlides,
    /// Index of the visible segment.
    CurrentSlide,
    /// Apply the deterministic clock and pause media.
    Suppress(SuppressionPolicy),
}

impl ControlCall {
    /// Script expression implementing this call.
    pub fn to_script(&self) -> String {
        match *self {
            Self::Install(selector) => control_script(selector),
            Self::InitSlides => guarded("c.initSlides()"),
            Self::SetSlide(index) => guarded(&format!("c.setSlide({index})")),
            Self::TotalSlides => guarded("c.getTotalSlides()"),
            Self::CurrentSlide => guarded("c.getCurrentSlide()"),
            Self::Suppress(policy) => clock::suppressor_script(policy),
        }
    }
}

fn guarded(expr: &str) -> String {
    format!("(function () {{ var c = window.__slidecast; if (!c) {{ return null; }} return {expr}; }})()")
}

const CONTROL_TEMPLATE: &str = r#"(function () {
  if (window.__slidecast) { return null; }
  var SELECTOR = __SELECTOR__;
  var FALLBACK = __FALLBACK__;
  var ACTIVE = __ACTIVE__;
  var state = { current: 0, slides: [] };

  function discover() {
    var found = Array.prototype.slice.call(document.querySelectorAll(SELECTOR));
    if (found.length === 0 && FALLBACK) {
      found = Array.prototype.slice.call(document.querySelectorAll(FALLBACK));
    }
    return found;
  }

  function show(el) {
    el.style.opacity = '1';
    el.style.visibility = 'visible';
    el.style.display = '';
    if (window.getComputedStyle(el).display === 'none') { el.style.display = 'block'; }
    el.classList.add(ACTIVE);
  }

  function hide(el) {
    el.style.opacity = '0';
    el.style.visibility = 'hidden';
    el.style.display = 'none';
    el.classList.remove(ACTIVE);
  }

  function apply(index) {
    state.slides.forEach(function (el, i) { if (i !== index) { hide(el); } });
    show(state.slides[index]);
    void state.slides[index].offsetWidth;
  }

  function report(found) {
    return { found: found, total: state.slides.length, current: state.current };
  }

  var api = {
    initSlides: function () {
      state.slides = discover();
      state.current = 0;
      if (state.slides.length > 0) { apply(0); }
      return state.slides.length;
    },
    setSlide: function (index) {
      if (state.slides.length === 0) { state.slides = discover(); }
      if (!(index >= 0 && index < state.slides.length)) { return report(false); }
      state.current = index;
      apply(index);
      return report(true);
    },
    getTotalSlides: function () { return state.slides.length; },
    getCurrentSlide: function () { return state.current; }
  };
  Object.defineProperty(window, '__slidecast', { value: api });

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', api.initSlides);
  } else {
    api.initSlides();
  }
  return null;
})()"#;

/// Control object definition for `selector`.
///
/// The script defines `window.__slidecast` once; re-running it is a no-op. Initialisation runs
/// immediately when the document is parsed, otherwise on `DOMContentLoaded`.
pub fn control_script(selector: SegmentSelector) -> String {
    let fallback = match selector {
        SegmentSelector::Marker => serde_json::Value::Null,
        SegmentSelector::Legacy => serde_json::Value::String(selector.css().to_string()),
    };
    CONTROL_TEMPLATE
        .replace("__SELECTOR__", &js_string(SegmentSelector::Marker.css()))
        .replace("__FALLBACK__", &fallback.to_string())
        .replace("__ACTIVE__", &js_string(ACTIVE_CLASS))
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn script_tag(script: &str) -> String {
    // `</script` inside the body would terminate the element early.
    format!("<script>{}</script>", script.replace("</script", "<\\/script"))
}

/// Insert the control script into markup.
///
/// Placed immediately before the last `</body>`, else before the last `</head>`, else prepended
/// to the document, so partial or malformed markup still loads it.
pub fn inject_control(html: &str, control: &str) -> String {
    let tag = script_tag(control);
    let lower = html.to_ascii_lowercase();
    let at = lower.rfind("</body>").or_else(|| lower.rfind("</head>"));
    match at {
        Some(i) => format!("{}{}{}", &html[..i], tag, &html[i..]),
        None => format!("{tag}{html}"),
    }
}

/// Insert the suppressor script as early as possible: right after the opening `<head>` tag,
/// else prepended.
pub fn inject_preload(html: &str, preload: &str) -> String {
    let tag = script_tag(preload);
    let lower = html.to_ascii_lowercase();
    let head_open = lower
        .match_indices("<head")
        .find(|(i, _)| {
            matches!(
                lower.as_bytes().get(i + 5),
                Some(b'>' | b' ' | b'\t' | b'\n' | b'\r')
            )
        })
        .and_then(|(i, _)| lower[i..].find('>').map(|j| i + j + 1));
    match head_open {
        Some(i) => format!("{}{}{}", &html[..i], tag, &html[i..]),
        None => format!("{tag}{html}"),
    }
}

/// Result of a segment selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideSelection {
    /// The segment is now the only visible one.
    Shown {
        /// Selected segment.
        index: usize,
        /// Segments discovered in the surface.
        total: usize,
    },
    /// The surface has fewer segments than `index + 1`; visibility is unchanged.
    OutOfRange {
        /// Requested segment.
        index: usize,
        /// Segments discovered in the surface.
        total: usize,
    },
    /// The control object is not present in the surface.
    ProtocolMissing,
}

#[derive(serde::Deserialize)]
struct SelectionReport {
    found: bool,
    total: usize,
}

/// Define the control object inside the surface.
pub async fn install<S: Surface + ?Sized>(
    surface: &mut S,
    selector: SegmentSelector,
) -> SlidecastResult<()> {
    surface.control(&ControlCall::Install(selector)).await?;
    Ok(())
}

/// Rediscover segments and show the first. Returns the number found, `None` when the control
/// object is missing.
pub async fn init_slides<S: Surface + ?Sized>(surface: &mut S) -> SlidecastResult<Option<usize>> {
    let v = surface.control(&ControlCall::InitSlides).await?;
    parse_count(v, "initSlides")
}

/// Show segment `index`.
pub async fn set_slide<S: Surface + ?Sized>(
    surface: &mut S,
    index: usize,
) -> SlidecastResult<SlideSelection> {
    let v = surface.control(&ControlCall::SetSlide(index)).await?;
    if v.is_null() {
        return Ok(SlideSelection::ProtocolMissing);
    }
    let report: SelectionReport = serde_json::from_value(v)
        .map_err(|e| SlidecastError::surface(format!("unexpected setSlide result: {e}")))?;
    Ok(if report.found {
        SlideSelection::Shown {
            index,
            total: report.total,
        }
    } else {
        SlideSelection::OutOfRange {
            index,
            total: report.total,
        }
    })
}

/// Number of segments the surface discovered (diagnostics only).
pub async fn total_slides<S: Surface + ?Sized>(surface: &mut S) -> SlidecastResult<Option<usize>> {
    let v = surface.control(&ControlCall::TotalSlides).await?;
    parse_count(v, "getTotalSlides")
}

/// Index of the visible segment (diagnostics only).
pub async fn current_slide<S: Surface + ?Sized>(surface: &mut S) -> SlidecastResult<Option<usize>> {
    let v = surface.control(&ControlCall::CurrentSlide).await?;
    parse_count(v, "getCurrentSlide")
}

fn parse_count(v: serde_json::Value, what: &str) -> SlidecastResult<Option<usize>> {
    if v.is_null() {
        return Ok(None);
    }
    v.as_u64()
        .map(|n| Some(n as usize))
        .ok_or_else(|| SlidecastError::surface(format!("unexpected {what} result: {v}")))
}

#[cfg(test)]
#[path = "../../tests/unit/surface/protocol.rs"]
mod tests;
