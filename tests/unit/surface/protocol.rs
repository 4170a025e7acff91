use super::*;
use crate::surface::memory::RecordingSurface;

#[test]
fn control_goes_before_closing_body() {
    let html = "<html><head></head><body><div data-slide>a</div></body></html>";
    let out = inject_control(html, "X()");
    assert!(out.ends_with("<div data-slide>a</div><script>X()</script></body></html>"));
}

#[test]
fn control_falls_back_to_head_then_prepend() {
    let head_only = "<html><head><title>t</title></HEAD><div>x</div>";
    let out = inject_control(head_only, "X()");
    assert!(out.contains("<title>t</title><script>X()</script></HEAD>"));

    let fragment = "<div data-slide>only</div>";
    assert_eq!(
        inject_control(fragment, "X()"),
        "<script>X()</script><div data-slide>only</div>"
    );
}

#[test]
fn control_matches_body_case_insensitively_and_uses_last() {
    let html = "<BODY><pre>&lt;/body&gt;</pre></BODY>";
    let out = inject_control(html, "X()");
    assert_eq!(out, "<BODY><pre>&lt;/body&gt;</pre><script>X()</script></BODY>");
}

#[test]
fn preload_goes_right_after_head_open_tag() {
    let html = concat!(
        "<!doctype html><html><head lang=\"en\">",
        "<script>app()</script></head><body></body></html>"
    );
    let out = inject_preload(html, "C()");
    assert!(out.starts_with(concat!(
        "<!doctype html><html><head lang=\"en\">",
        "<script>C()</script><script>app()</script>"
    )));

    let with_header = "<header>no head here</header>";
    assert_eq!(
        inject_preload(with_header, "C()"),
        "<script>C()</script><header>no head here</header>"
    );
}

#[test]
fn script_tag_escapes_closing_sequence() {
    let out = inject_control("<body></body>", "var s = '</script>';");
    assert!(out.contains("var s = '<\\/script>';"));
    assert_eq!(out.matches("</script>").count(), 1);
}

#[test]
fn control_script_embeds_selector_and_active_class() {
    let marker = control_script(SegmentSelector::Marker);
    assert!(marker.contains(&format!("\"[{SEGMENT_MARKER_ATTR}]\"")));
    assert!(marker.contains("var FALLBACK = null;"));
    assert!(marker.contains("var ACTIVE = \"active\";"));
    assert!(marker.contains("window.__slidecast"));
    assert!(!marker.contains("__SELECTOR__"));

    let legacy = control_script(SegmentSelector::Legacy);
    assert!(legacy.contains(r#"var FALLBACK = ".slide, section, [class*=\"slide\"]";"#));
}

#[test]
fn guarded_calls_tolerate_missing_control_object() {
    let s = ControlCall::SetSlide(3).to_script();
    assert!(s.contains("if (!c) { return null; }"));
    assert!(s.contains("c.setSlide(3)"));
}

#[tokio::test]
async fn set_slide_reports_shown_out_of_range_and_missing() {
    let mut surface = RecordingSurface::new(2);
    assert_eq!(
        set_slide(&mut surface, 0).await.unwrap(),
        SlideSelection::ProtocolMissing
    );

    install(&mut surface, SegmentSelector::Marker).await.unwrap();
    assert_eq!(init_slides(&mut surface).await.unwrap(), Some(2));
    assert_eq!(
        set_slide(&mut surface, 1).await.unwrap(),
        SlideSelection::Shown { index: 1, total: 2 }
    );
    assert_eq!(current_slide(&mut surface).await.unwrap(), Some(1));
    assert_eq!(
        set_slide(&mut surface, 5).await.unwrap(),
        SlideSelection::OutOfRange { index: 5, total: 2 }
    );
    // Out-of-range selection leaves the visible segment alone.
    assert_eq!(current_slide(&mut surface).await.unwrap(), Some(1));
    assert_eq!(total_slides(&mut surface).await.unwrap(), Some(2));
}

#[tokio::test]
async fn queries_return_none_without_protocol() {
    let mut surface = RecordingSurface::new(3).without_protocol();
    install(&mut surface, SegmentSelector::Marker).await.unwrap();
    assert_eq!(init_slides(&mut surface).await.unwrap(), None);
    assert_eq!(total_slides(&mut surface).await.unwrap(), None);
}
