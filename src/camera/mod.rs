//! Camera session handle.
//!
//! A `Camera` owns one open session: a live device, a recorded SVO file, or
//! a synthetic `stub://` session used by tests and dry runs. The session is
//! the exclusive owner of every frame and streaming resource and is closed
//! exactly once, either by `close()` or by `Drop` on an early-exit path.
//!
//! Backends:
//! - Synthetic (`stub://`) sessions, always available
//! - ZED SDK sessions through its C API (feature: zed-sdk)

mod synthetic;
#[cfg(feature = "zed-sdk")]
mod zed;

use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::ErrorCode;
use crate::frame::{Frame, Timestamp};
use crate::pipeline::{FrameSource, RecordedSource};
use synthetic::SyntheticCamera;
#[cfg(feature = "zed-sdk")]
use zed::ZedCamera;

const STUB_SCHEME: &str = "stub://";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hd2k,
    Hd1080,
    Hd1200,
    Hd720,
    Svga,
    Vga,
    Auto,
}

impl Resolution {
    /// Nominal image size for this mode. `Auto` resolves to HD720.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Hd2k => (2208, 1242),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd1200 => (1920, 1200),
            Resolution::Hd720 | Resolution::Auto => (1280, 720),
            Resolution::Svga => (960, 600),
            Resolution::Vga => (672, 376),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    None,
    Performance,
    Quality,
    Ultra,
    Neural,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    Foot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Left,
    Right,
    LeftUnrectified,
    RightUnrectified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingCodec {
    H264,
    H265,
}

/// Where a session reads its frames from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Live camera by device index.
    Device(u32),
    /// Recorded SVO file.
    Recording(PathBuf),
    /// Synthetic session, e.g. `stub://bench?frames=100`.
    Synthetic(String),
}

impl InputSource {
    /// Input for a recording path given on the command line.
    pub fn recording(path: &str) -> Self {
        if path.starts_with(STUB_SCHEME) {
            InputSource::Synthetic(path.to_string())
        } else {
            InputSource::Recording(PathBuf::from(path))
        }
    }

    /// Input for a live device selector: a device index or a `stub://` URL.
    pub fn device(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        if selector.starts_with(STUB_SCHEME) {
            return Ok(InputSource::Synthetic(selector.to_string()));
        }
        let index = selector.parse().map_err(|_| {
            anyhow::anyhow!(
                "camera device must be an index or a stub:// URL, got '{}'",
                selector
            )
        })?;
        Ok(InputSource::Device(index))
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Device(index) => write!(f, "camera #{}", index),
            InputSource::Recording(path) => write!(f, "recording {}", path.display()),
            InputSource::Synthetic(url) => f.write_str(url),
        }
    }
}

/// Parameters applied when a session is opened.
#[derive(Clone, Debug)]
pub struct InitParameters {
    pub input: InputSource,
    pub resolution: Resolution,
    pub depth_mode: DepthMode,
    pub coordinate_units: Unit,
    pub sdk_verbose: bool,
}

impl Default for InitParameters {
    fn default() -> Self {
        Self {
            input: InputSource::Device(0),
            resolution: Resolution::Hd720,
            depth_mode: DepthMode::Performance,
            coordinate_units: Unit::Millimeter,
            sdk_verbose: false,
        }
    }
}

/// Hardware streaming settings.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamingParameters {
    pub codec: StreamingCodec,
    /// Target bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// UDP port; must be even (the odd port above it is used too).
    pub port: u16,
    /// Group-of-pictures size, -1 lets the encoder decide.
    pub gop_size: i32,
    pub adaptive_bitrate: bool,
    /// Network packet size in bytes.
    pub chunk_size: u16,
    /// 0 keeps the camera frame rate.
    pub target_framerate: u32,
}

impl Default for StreamingParameters {
    fn default() -> Self {
        Self {
            codec: StreamingCodec::H265,
            bitrate_kbps: 8000,
            port: 30000,
            gop_size: -1,
            adaptive_bitrate: false,
            chunk_size: 4096,
            target_framerate: 0,
        }
    }
}

impl StreamingParameters {
    pub const BITRATE_RANGE_KBPS: std::ops::RangeInclusive<u32> = 1000..=60000;
    pub const CHUNK_SIZE_RANGE: std::ops::RangeInclusive<u16> = 1024..=65000;

    pub fn validate(&self) -> Result<(), ErrorCode> {
        if !Self::BITRATE_RANGE_KBPS.contains(&self.bitrate_kbps)
            || !Self::CHUNK_SIZE_RANGE.contains(&self.chunk_size)
            || self.port % 2 != 0
        {
            return Err(ErrorCode::InvalidFunctionParameters);
        }
        Ok(())
    }
}

/// Properties of an open session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraInformation {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

/// Current frame index within a recording, and its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayPosition {
    pub position: u64,
    pub total: u64,
}

impl ReplayPosition {
    /// True once the last frame of the recording has been grabbed.
    pub fn is_last(&self) -> bool {
        self.position >= self.total.saturating_sub(1)
    }
}

/// Grab counters for a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub frames_grabbed: u64,
    pub failed_grabs: u64,
}

/// An open camera session.
pub struct Camera {
    backend: CameraBackend,
    input: InputSource,
    streaming: bool,
    closed: bool,
    stats: CameraStats,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "zed-sdk")]
    Zed(ZedCamera),
}

impl Camera {
    /// Open a session described by `params`.
    pub fn open(params: &InitParameters) -> Result<Self> {
        let backend = match &params.input {
            InputSource::Synthetic(url) => {
                CameraBackend::Synthetic(SyntheticCamera::open(url, params)?)
            }
            #[cfg(feature = "zed-sdk")]
            InputSource::Device(_) | InputSource::Recording(_) => {
                CameraBackend::Zed(ZedCamera::open(params)?)
            }
            #[cfg(not(feature = "zed-sdk"))]
            input => {
                anyhow::bail!("opening {} requires the zed-sdk feature", input)
            }
        };

        let camera = Self {
            backend,
            input: params.input.clone(),
            streaming: false,
            closed: false,
            stats: CameraStats::default(),
        };
        let info = camera.information();
        log::info!(
            "Camera: opened {} ({}x{} @ {:.1} fps)",
            camera.input,
            info.width,
            info.height,
            info.fps
        );
        Ok(camera)
    }

    pub fn information(&self) -> CameraInformation {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.information(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.information(),
        }
    }

    /// Start hardware streaming. Parameters are checked here, once.
    pub fn enable_streaming(&mut self, params: &StreamingParameters) -> Result<(), ErrorCode> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.enable_streaming(params)?,
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.enable_streaming(params)?,
        }
        self.streaming = true;
        log::info!(
            "Camera: streaming {:?} at {} kbit/s on port {}",
            params.codec,
            params.bitrate_kbps,
            params.port
        );
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Stop hardware streaming. No-op when streaming is off.
    pub fn disable_streaming(&mut self) {
        if !self.streaming {
            return;
        }
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.disable_streaming(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.disable_streaming(),
        }
        self.streaming = false;
        log::info!("Camera: streaming disabled");
    }

    /// Advance to the next frame.
    pub fn grab(&mut self) -> Result<(), ErrorCode> {
        let result = match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.grab(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.grab(),
        };
        match result {
            Ok(()) => self.stats.frames_grabbed += 1,
            Err(_) => self.stats.failed_grabs += 1,
        }
        result
    }

    /// Copy the current frame's `view` into `frame`, reusing its buffer.
    pub fn retrieve_image(&mut self, view: View, frame: &mut Frame) -> Result<(), ErrorCode> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.retrieve_image(view, frame),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.retrieve_image(view, frame),
        }
    }

    /// Replay position for recordings, `None` for live sessions.
    pub fn replay_position(&self) -> Option<ReplayPosition> {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.replay_position(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.replay_position(),
        }
    }

    /// Capture time of the current frame.
    pub fn image_timestamp(&self) -> Timestamp {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.image_timestamp(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.image_timestamp(),
        }
    }

    pub fn stats(&self) -> &CameraStats {
        &self.stats
    }

    /// Stop streaming if needed and close the session.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.disable_streaming();
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.close(),
            #[cfg(feature = "zed-sdk")]
            CameraBackend::Zed(camera) => camera.close(),
        }
        self.closed = true;
        log::info!(
            "Camera: closed {} (grabbed={} failed={})",
            self.input,
            self.stats.frames_grabbed,
            self.stats.failed_grabs
        );
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl FrameSource for Camera {
    fn grab(&mut self) -> Result<(), ErrorCode> {
        Camera::grab(self)
    }
}

impl RecordedSource for Camera {
    fn retrieve(&mut self, view: View, frame: &mut Frame) -> Result<(), ErrorCode> {
        self.retrieve_image(view, frame)?;
        frame.timestamp = self.image_timestamp();
        Ok(())
    }

    fn replay_position(&self) -> Option<ReplayPosition> {
        Camera::replay_position(self)
    }

    fn close(self) {
        Camera::close(self)
    }
}
