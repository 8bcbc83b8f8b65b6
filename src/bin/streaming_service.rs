//! streaming_service - stream a live ZED camera over the network
//!
//! This program:
//! 1. Opens the configured camera (HD1080, depth disabled)
//! 2. Enables the SDK's hardware H.265 streaming
//! 3. Grabs frames until Ctrl-C, retrying failed grabs after a short pause
//! 4. Disables streaming and closes the camera

use anyhow::{Context, Result};
use clap::Parser;

use zed_capture::{
    cli, run_loop, Camera, CaptureConfig, DepthMode, Flow, InitParameters, InputSource,
    ShutdownSignal,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stream a live ZED camera with hardware H.265 encoding until Ctrl-C"
)]
struct Args {}

fn main() -> Result<()> {
    cli::init_logging();
    let _args: Args = cli::parse_args();
    let cfg = CaptureConfig::load()?;
    cfg.validate_streaming()?;

    let params = InitParameters {
        input: InputSource::device(&cfg.camera.device)?,
        resolution: cfg.camera.resolution,
        depth_mode: DepthMode::None,
        sdk_verbose: cfg.camera.sdk_verbose,
        ..InitParameters::default()
    };
    let mut camera = Camera::open(&params).context("failed to open camera")?;

    camera
        .enable_streaming(&cfg.streaming)
        .context("failed to enable streaming")?;

    let shutdown = ShutdownSignal::install()?;
    log::info!(
        "streaming on port {}; press Ctrl-C to stop",
        cfg.streaming.port
    );

    let summary = run_loop(&mut camera, &shutdown, cfg.retry_delay, |_| {
        Ok(Flow::Continue)
    })?;
    log::info!(
        "shutdown requested after {} frames ({} failed grabs)",
        summary.grabbed,
        summary.failed
    );

    camera.disable_streaming();
    camera.close();
    Ok(())
}
