use super::*;

fn cfg(audio: Option<&str>) -> EncodeConfig {
    EncodeConfig {
        frames_dir: PathBuf::from("/jobs/a/frames"),
        fps: Fps::new(10, 1).unwrap(),
        total_frames: 50,
        out_path: PathBuf::from("/jobs/a/output.mp4"),
        audio: audio.map(PathBuf::from),
        opts: EncodeOpts::default(),
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn video_only_args_bound_frames_and_drop_audio() {
    let args = build_ffmpeg_args(&cfg(None));

    assert_eq!(args.first().map(String::as_str), Some("-y"));
    assert_eq!(value_after(&args, "-framerate"), Some("10/1"));
    assert_eq!(value_after(&args, "-start_number"), Some("0"));
    assert_eq!(value_after(&args, "-i"), Some("/jobs/a/frames/frame_%06d.png"));
    assert_eq!(value_after(&args, "-frames:v"), Some("50"));
    assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
    assert_eq!(value_after(&args, "-pix_fmt"), Some("yuv420p"));
    assert_eq!(value_after(&args, "-crf"), Some("18"));
    assert_eq!(value_after(&args, "-progress"), Some("pipe:1"));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(!args.iter().any(|a| a == "-shortest"));
    assert_eq!(args.last().map(String::as_str), Some("/jobs/a/output.mp4"));
}

#[test]
fn audio_adds_second_input_and_shortest() {
    let args = build_ffmpeg_args(&cfg(Some("/music/track.mp3")));

    let inputs: Vec<&str> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-i")
        .filter_map(|(i, _)| args.get(i + 1).map(String::as_str))
        .collect();
    assert_eq!(inputs, vec!["/jobs/a/frames/frame_%06d.png", "/music/track.mp3"]);
    assert_eq!(value_after(&args, "-c:a"), Some("aac"));
    assert_eq!(value_after(&args, "-b:a"), Some("192k"));
    assert!(args.iter().any(|a| a == "-shortest"));
    assert!(!args.iter().any(|a| a == "-an"));
}

#[test]
fn rational_fps_is_passed_as_fraction() {
    let mut c = cfg(None);
    c.fps = Fps::new(30000, 1001).unwrap();
    c.opts.overwrite = false;
    let args = build_ffmpeg_args(&c);
    assert_eq!(args.first().map(String::as_str), Some("-n"));
    assert_eq!(value_after(&args, "-framerate"), Some("30000/1001"));
    assert_eq!(value_after(&args, "-r"), Some("30000/1001"));
}

#[test]
fn progress_prefers_frame_counter() {
    let fps = Fps::new(10, 1).unwrap();
    let mut state = ProgressState::default();
    for line in ["frame=25", "out_time_us=1000000", "progress=continue"] {
        let (k, v) = line.split_once('=').unwrap();
        state.update(k, v);
    }
    assert_eq!(state.frame, Some(25));
    assert!((state.out_time_secs - 1.0).abs() < 1e-9);
    assert!((state.percent(50, fps) - 50.0).abs() < 1e-9);

    state.update("progress", "end");
    assert_eq!(state.percent(50, fps), 100.0);
}

#[test]
fn progress_falls_back_to_output_time_and_clamps() {
    let fps = Fps::new(10, 1).unwrap();
    let mut state = ProgressState::default();
    state.update("out_time_ms", "2500000");
    assert!((state.percent(50, fps) - 50.0).abs() < 1e-9);

    state.update("out_time_us", "N/A");
    assert!((state.out_time_secs - 2.5).abs() < 1e-9);

    state.update("frame", "80");
    assert_eq!(state.percent(50, fps), 100.0);
    assert_eq!(state.percent(0, fps), 0.0);
}

#[tokio::test]
async fn zero_frames_is_rejected_before_spawning() {
    let mut c = cfg(None);
    c.total_frames = 0;
    let mut events = Vec::new();
    let err = encode(&c, &mut |e: &EncodeEvent| events.push(e.clone()))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(events.as_slice(), [EncodeEvent::Failed { .. }]));
}

#[tokio::test]
async fn missing_audio_is_rejected_before_spawning() {
    let tmp = tempfile::tempdir().unwrap();
    let mut c = cfg(None);
    c.audio = Some(tmp.path().join("nope.mp3"));
    let err = encode(&c, &mut |_: &EncodeEvent| {}).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("nope.mp3"));
}

#[tokio::test(start_paused = true)]
async fn silent_ffmpeg_still_triggers_stall_warnings() {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    let (mut tx, rx) = tokio::io::duplex(64);
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.write_all(b"progress=end\n").await.unwrap();
    });

    let mut lines = BufReader::new(rx).lines();
    let mut watch = StallWatch::new();
    let line = next_progress_line(&mut lines, &mut watch).await.unwrap();
    assert_eq!(line.as_deref(), Some("progress=end"));
    assert_eq!(watch.warnings, 2);
    writer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn advancing_frames_reset_the_stall_window() {
    let mut watch = StallWatch::new();
    tokio::time::advance(Duration::from_secs(11)).await;
    watch.observe(5);
    assert_eq!(watch.warnings, 0);

    tokio::time::advance(Duration::from_secs(11)).await;
    watch.observe(5);
    assert_eq!(watch.warnings, 1);
    watch.observe(5);
    assert_eq!(watch.warnings, 1);
}
