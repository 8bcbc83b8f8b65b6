use std::path::Path;
use std::process::{Command, Output};

const RECORDING_EPOCH_US: u64 = 1_700_000_000_000_000;

fn run(bin: &str, args: &[&str]) -> Output {
    Command::new(bin)
        .args(args)
        .env_remove("ZED_CAPTURE_CONFIG")
        .env_remove("ZED_CAPTURE_IMAGE_EXT")
        .env("ZED_CAPTURE_RETRY_DELAY_MS", "0")
        .env("RUST_LOG", "info")
        .output()
        .expect("run binary")
}

fn svo2png(args: &[&str]) -> Output {
    run(env!("CARGO_BIN_EXE_svo2png"), args)
}

fn svo2avi(args: &[&str]) -> Output {
    run(env!("CARGO_BIN_EXE_svo2avi"), args)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn sorted_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn svo2png_without_arguments_prints_usage() {
    let output = svo2png(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage"));
}

#[test]
fn svo2png_with_one_argument_fails() {
    let output = svo2png(&["input.svo"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage"));
}

#[test]
fn svo2avi_with_too_many_arguments_fails() {
    let output = svo2avi(&["a.svo", "b.avi", "c"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_successfully() {
    let output = svo2png(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn svo2png_rejects_missing_output_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("frames");
    let output = svo2png(&["stub://rec?frames=3", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("output directory doesn't exist"));
    assert!(!missing.exists());
}

#[test]
fn svo2png_fails_when_the_recording_cannot_be_opened() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("missing.svo");
    let output = svo2png(&[input.to_str().unwrap(), dir.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to open SVO file"));
    assert!(sorted_entries(dir.path()).is_empty());
}

#[test]
fn svo2avi_fails_when_the_recording_cannot_be_opened() {
    let dir = tempfile::tempdir().expect("tempdir");
    let video = dir.path().join("out.avi");
    let output = svo2avi(&["/nonexistent/recording.svo", video.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!video.exists());
}

#[test]
fn svo2png_exports_every_frame_with_timestamped_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = svo2png(&[
        "stub://rec?frames=5&fps=10&width=8&height=4&fail_every=3",
        dir.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let expected: Vec<String> = {
        let mut names: Vec<String> = (0..5u64)
            .map(|i| format!("{}_{}.jpg", i, RECORDING_EPOCH_US + i * 100_000))
            .collect();
        names.sort();
        names
    };
    assert_eq!(sorted_entries(dir.path()), expected);
}

#[test]
fn svo2png_honours_the_image_extension_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_svo2png"))
        .args(["stub://rec?frames=2&width=4&height=4", dir.path().to_str().unwrap()])
        .env_remove("ZED_CAPTURE_CONFIG")
        .env("ZED_CAPTURE_IMAGE_EXT", "png")
        .output()
        .expect("run svo2png");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let names = sorted_entries(dir.path());
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name| name.ends_with(".png")));
}

#[test]
fn svo2png_ignores_streaming_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_svo2png"))
        .args(["stub://rec?frames=2&width=4&height=4", dir.path().to_str().unwrap()])
        .env_remove("ZED_CAPTURE_CONFIG")
        .env_remove("ZED_CAPTURE_IMAGE_EXT")
        .env("ZED_CAPTURE_STREAM_PORT", "30001")
        .env("ZED_CAPTURE_STREAM_BITRATE", "10")
        .output()
        .expect("run svo2png");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(sorted_entries(dir.path()).len(), 2);
}

#[test]
fn live_input_cannot_be_exported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = svo2png(&["stub://live", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("recorded input"));
}

#[cfg(not(feature = "video-ffmpeg"))]
#[test]
fn svo2avi_reports_writer_open_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let video = dir.path().join("out.avi");
    let output = svo2avi(&["stub://rec?frames=3&width=16&height=16", video.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("video writer cannot be opened"));
}

#[cfg(feature = "video-ffmpeg")]
#[test]
fn svo2avi_writes_a_video_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let video = dir.path().join("out.avi");
    let output = svo2avi(&["stub://rec?frames=10&width=64&height=48", video.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(std::fs::metadata(&video).expect("video exists").len() > 0);
}
