use super::*;

#[test]
fn frame_file_names_sort_numerically() {
    assert_eq!(FrameIndex(0).file_name(), "frame_000000.png");
    assert_eq!(FrameIndex(49).file_name(), "frame_000049.png");
    assert_eq!(FrameIndex(MAX_FRAME_INDEX).file_name(), "frame_999999.png");

    let mut names: Vec<String> = [10u64, 9, 100, 2]
        .iter()
        .map(|&i| FrameIndex(i).file_name())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "frame_000002.png",
            "frame_000009.png",
            "frame_000010.png",
            "frame_000100.png"
        ]
    );
}

#[test]
fn frame_range_last_is_inclusive_end() {
    let r = FrameRange::new(FrameIndex(20), FrameIndex(50)).unwrap();
    assert_eq!(r.len_frames(), 30);
    assert_eq!(r.last(), Some(FrameIndex(49)));
    assert!(r.contains(FrameIndex(20)));
    assert!(!r.contains(FrameIndex(50)));

    let empty = FrameRange::new(FrameIndex(7), FrameIndex(7)).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.last(), None);
    assert_eq!(empty.iter().count(), 0);
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(2)).is_err());
}

#[test]
fn fps_parses_integer_rational_and_decimal() {
    assert_eq!("30".parse::<Fps>().unwrap(), Fps { num: 30, den: 1 });
    assert_eq!(
        "30000/1001".parse::<Fps>().unwrap(),
        Fps {
            num: 30000,
            den: 1001
        }
    );
    assert_eq!("2.5".parse::<Fps>().unwrap(), Fps { num: 5, den: 2 });
    assert_eq!("24.000".parse::<Fps>().unwrap(), Fps { num: 24, den: 1 });
    assert_eq!(".5".parse::<Fps>().unwrap(), Fps { num: 1, den: 2 });
}

#[test]
fn fps_rejects_zero_and_garbage() {
    assert!("0".parse::<Fps>().is_err());
    assert!("0.0".parse::<Fps>().is_err());
    assert!("30/0".parse::<Fps>().is_err());
    assert!("-1".parse::<Fps>().is_err());
    assert!("abc".parse::<Fps>().is_err());
    assert!(".".parse::<Fps>().is_err());
    assert!("1.0000001".parse::<Fps>().is_err());
}

#[test]
fn fps_reduces_and_formats() {
    let fps = Fps::new(60, 2).unwrap();
    assert_eq!(fps, Fps { num: 30, den: 1 });
    assert_eq!(fps.to_string(), "30");
    assert_eq!(fps.ffmpeg_arg(), "30/1");
    assert_eq!(Fps::new(5, 2).unwrap().to_string(), "5/2");
    assert!((Fps::new(25, 1).unwrap().frames_to_secs(50) - 2.0).abs() < 1e-12);
}

#[test]
fn canvas_requires_even_non_zero_dimensions() {
    let canvas = |width, height| Canvas { width, height };
    assert!(canvas(1920, 1080).validate().is_ok());
    assert!(canvas(0, 1080).validate().is_err());
    assert!(canvas(1921, 1080).validate().is_err());
    assert_eq!(canvas(64, 32).to_string(), "64x32");
}
