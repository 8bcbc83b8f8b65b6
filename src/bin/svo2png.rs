//! svo2png - export an SVO recording as a sequence of images
//!
//! Each frame of the unrectified left view is written to the output
//! directory as `<frame-index>_<timestamp-us>.<ext>`. The directory must
//! exist before the program runs.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use zed_capture::{
    cli, export_recording, Camera, CaptureConfig, DepthMode, ExportOptions, ImageSequenceWriter,
    InitParameters, InputSource, Progress, ShutdownSignal,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert an SVO recording to an image sequence",
    after_help = "Example:\n  svo2png path/to/file.svo path/to/output/folder"
)]
struct Args {
    /// SVO file path (input), e.g. path/to/file.svo
    svo_input: String,

    /// Existing output folder, e.g. path/to/output/folder
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    cli::init_logging();
    let args: Args = cli::parse_args();
    let cfg = CaptureConfig::load()?;

    let writer = ImageSequenceWriter::create(&args.output_dir, &cfg.images.extension)?;

    let params = InitParameters {
        input: InputSource::recording(&args.svo_input),
        depth_mode: DepthMode::None,
        ..InitParameters::default()
    };
    let camera = Camera::open(&params)
        .with_context(|| format!("failed to open SVO file {}", args.svo_input))?;

    let total = camera
        .replay_position()
        .map(|replay| replay.total)
        .unwrap_or_default();
    let shutdown = ShutdownSignal::install()?;
    log::info!("converting SVO ({} frames), use Ctrl-C to interrupt", total);

    let progress = Progress::new(total, std::io::stderr().is_terminal());
    let options = ExportOptions {
        view: cfg.images.view,
        retry_delay: cfg.retry_delay,
    };
    let summary = export_recording(camera, writer, &options, &shutdown, &progress)?;
    log::info!(
        "wrote {} images to {} ({:?})",
        summary.frames_written,
        args.output_dir.display(),
        summary.reason
    );
    Ok(())
}
