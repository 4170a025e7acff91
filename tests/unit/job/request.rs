use super::*;

fn request(durations: &[f64]) -> RenderRequest {
    RenderRequest {
        content: ContentSource::Html("<div data-slide>a</div>".to_string()),
        durations: durations.to_vec(),
        fps: Fps::new(10, 1).unwrap(),
        canvas: Preset::Youtube.canvas(),
        audio: None,
        output: None,
    }
}

#[test]
fn presets_match_platform_sizes() {
    assert_eq!(
        Preset::Youtube.canvas(),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(
        Preset::Instagram.canvas(),
        Canvas {
            width: 1080,
            height: 1080
        }
    );
    assert_eq!(
        Preset::Tiktok.canvas(),
        Canvas {
            width: 1080,
            height: 1920
        }
    );
    assert_eq!(
        Preset::Custom.canvas(),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(Preset::default(), Preset::Youtube);
}

#[test]
fn preset_parsing_and_overrides() {
    assert_eq!("TikTok".parse::<Preset>().unwrap(), Preset::Tiktok);
    assert!("vimeo".parse::<Preset>().unwrap_err().is_validation());
    assert_eq!(
        Preset::Instagram.resolve(Some(720), None),
        Canvas {
            width: 720,
            height: 1080
        }
    );
    assert_eq!(Preset::Tiktok.to_string(), "tiktok");
}

#[test]
fn valid_request_returns_plan() {
    let plan = request(&[2.0, 3.0]).validate().unwrap();
    assert_eq!(plan.total_frames, 50);
    assert_eq!(plan.segments.len(), 2);
}

#[test]
fn total_duration_ceiling_is_inclusive() {
    assert!(request(&[100.0, 100.0, 100.0]).validate().is_ok());
    // Naive f64 summation of these lands just above 300.
    assert!(request(&[0.3; 1000]).validate().is_ok());
    assert!(request(&[0.1; 3000]).validate().is_ok());
    let err = request(&[100.0, 100.0, 100.0001]).validate().unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("300"));
}

#[test]
fn rejects_bad_durations() {
    for bad in [vec![], vec![-1.0], vec![1.0, 0.0], vec![f64::NAN], vec![f64::INFINITY]] {
        let err = request(&bad).validate().unwrap_err();
        assert!(err.is_validation(), "{bad:?} should be rejected");
    }
}

#[test]
fn rejects_sub_frame_total() {
    let err = request(&[0.01, 0.02]).validate().unwrap_err();
    assert!(err.to_string().contains("less than one frame"));
}

#[test]
fn rejects_odd_canvas_empty_content_and_missing_audio() {
    let mut r = request(&[1.0]);
    r.canvas = Canvas {
        width: 1081,
        height: 1080,
    };
    assert!(r.validate().unwrap_err().is_validation());

    let mut r = request(&[1.0]);
    r.content = ContentSource::Url("  ".to_string());
    assert!(r.validate().unwrap_err().is_validation());

    let mut r = request(&[1.0]);
    r.audio = Some(PathBuf::from("/definitely/not/here.mp3"));
    let err = r.validate().unwrap_err();
    assert!(err.to_string().contains("here.mp3"));
}

#[test]
fn request_round_trips_through_json_manifest_shape() {
    let r = request(&[1.5]);
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["content"]["kind"], "html");
    assert!(v.get("audio").is_none());
    let back: RenderRequest = serde_json::from_value(v).unwrap();
    assert_eq!(back, r);
}

#[test]
fn parses_duration_lists() {
    assert_eq!(parse_durations("2, 3.5,1").unwrap(), vec![2.0, 3.5, 1.0]);
    assert_eq!(parse_durations("4,").unwrap(), vec![4.0]);
    assert!(parse_durations("2,x").unwrap_err().is_validation());
}
