//! svo2avi - export the left view of an SVO recording to a video file
//!
//! The container follows the output extension (e.g. `.avi`); frames are
//! encoded as MPEG-4 part 2 at `max(camera fps, 30)`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use zed_capture::{
    cli, export_recording, Camera, CaptureConfig, DepthMode, ExportOptions, InitParameters,
    InputSource, Progress, ShutdownSignal, Unit, VideoWriter,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert an SVO recording to a video file",
    after_help = "Example:\n  svo2avi path/to/file.svo path/to/output/file.avi"
)]
struct Args {
    /// SVO file path (input), e.g. path/to/file.svo
    svo_input: String,

    /// Video file path (output), e.g. path/to/output/file.avi
    video_output: PathBuf,
}

fn main() -> Result<()> {
    cli::init_logging();
    let args: Args = cli::parse_args();
    let cfg = CaptureConfig::load()?;

    let params = InitParameters {
        input: InputSource::recording(&args.svo_input),
        depth_mode: DepthMode::None,
        coordinate_units: Unit::Millimeter,
        ..InitParameters::default()
    };
    let camera = Camera::open(&params)
        .with_context(|| format!("failed to open SVO file {}", args.svo_input))?;

    let info = camera.information();
    let fps = (info.fps.round() as u32).max(cfg.video.min_fps);
    let writer = VideoWriter::create(&args.video_output, info.width, info.height, fps)
        .context("video writer cannot be opened, check the output path and write permissions")?;

    let total = camera
        .replay_position()
        .map(|replay| replay.total)
        .unwrap_or_default();
    let shutdown = ShutdownSignal::install()?;
    log::info!("converting SVO ({} frames), use Ctrl-C to interrupt", total);

    let progress = Progress::new(total, std::io::stderr().is_terminal());
    let options = ExportOptions {
        view: cfg.video.view,
        retry_delay: cfg.retry_delay,
    };
    let summary = export_recording(camera, writer, &options, &shutdown, &progress)?;
    log::info!(
        "wrote {} frames to {} ({:?})",
        summary.frames_written,
        args.video_output.display(),
        summary.reason
    );
    Ok(())
}
