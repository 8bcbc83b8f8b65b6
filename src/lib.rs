//! ZED camera capture tools.
//!
//! Three programs share this crate:
//!
//! - `streaming_service`: live camera to the SDK's hardware H.265 stream
//! - `svo2avi`: recorded SVO file to a video container
//! - `svo2png`: recorded SVO file to a directory of timestamped images
//!
//! Each one is a single sequential loop: open a session, configure it,
//! grab/process/write until interrupted or the recording ends, then release
//! the sink and close the session. Capture, streaming and encoding stay in
//! the SDK, FFmpeg and the `image` crate.
//!
//! # Module Structure
//!
//! - `camera`: session handle (synthetic `stub://` and ZED SDK backends)
//! - `frame`: reusable BGRA frame buffer
//! - `pipeline`: acquisition loop with fixed-delay retry
//! - `export`: recording replay into a sink, with progress
//! - `sink`: image sequence and video container writers
//! - `shutdown`: Ctrl-C driven stop flag
//! - `config`: settings with defaults, file and env overrides
//! - `cli`: logging setup and argument parsing for the binaries
//! - `error`: SDK status codes

pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod pipeline;
pub mod shutdown;
pub mod sink;

pub use camera::{
    Camera, CameraInformation, DepthMode, InitParameters, InputSource, ReplayPosition,
    Resolution, StreamingCodec, StreamingParameters, Unit, View,
};
pub use config::CaptureConfig;
pub use error::ErrorCode;
pub use export::{export_recording, ExportOptions, ExportSummary, Progress};
pub use frame::{Frame, Timestamp};
pub use pipeline::{run_loop, Flow, FrameSource, LoopSummary, RecordedSource, StopReason};
pub use shutdown::ShutdownSignal;
pub use sink::{FrameSink, ImageSequenceWriter, VideoWriter};
