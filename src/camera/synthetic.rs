//! Synthetic camera sessions (`stub://`).
//!
//! URL form: `stub://<name>?frames=N&fail_every=K&fps=F&width=W&height=H`
//!
//! - `frames` present: a finite recording of N frames with a replay position
//! - `frames` absent: a live session that never ends, paced at `fps`
//! - `fail_every=K`: every K-th grab fails with a transient error
//!
//! Pixels are a deterministic gradient so exported output can be checked.

use anyhow::{anyhow, bail, Context, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{
    CameraInformation, InitParameters, ReplayPosition, StreamingParameters, View, STUB_SCHEME,
};
use crate::error::ErrorCode;
use crate::frame::{Frame, Timestamp, BYTES_PER_PIXEL};

/// Recording timestamps start here (2023-11-14T22:13:20Z).
const RECORDING_EPOCH_NS: u64 = 1_700_000_000_000_000_000;
const DEFAULT_FPS: f32 = 30.0;

#[derive(Clone, Debug, PartialEq)]
struct StubOptions {
    name: String,
    frames: Option<u64>,
    fail_every: u64,
    fps: f32,
    width: Option<u32>,
    height: Option<u32>,
}

impl StubOptions {
    fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("synthetic input must start with {}", STUB_SCHEME))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, query),
            None => (rest, ""),
        };

        let mut options = Self {
            name: name.to_string(),
            frames: None,
            fail_every: 0,
            fps: DEFAULT_FPS,
            width: None,
            height: None,
        };

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("stub option '{}' needs a value", pair))?;
            let invalid = || format!("invalid value '{}' for stub option '{}'", value, key);
            match key {
                "frames" => options.frames = Some(value.parse().with_context(invalid)?),
                "fail_every" => options.fail_every = value.parse().with_context(invalid)?,
                "fps" => options.fps = value.parse().with_context(invalid)?,
                "width" => options.width = Some(value.parse().with_context(invalid)?),
                "height" => options.height = Some(value.parse().with_context(invalid)?),
                other => bail!("unknown stub option '{}'", other),
            }
        }

        if options.fps <= 0.0 {
            bail!("stub fps must be positive");
        }
        Ok(options)
    }
}

pub(super) struct SyntheticCamera {
    options: StubOptions,
    width: u32,
    height: u32,
    attempts: u64,
    /// Index of the frame grabbed last, `None` before the first grab.
    current: Option<u64>,
    current_timestamp: Timestamp,
    streaming: Option<StreamingParameters>,
}

impl SyntheticCamera {
    pub(super) fn open(url: &str, params: &InitParameters) -> Result<Self> {
        let options = StubOptions::parse(url)?;
        let (default_width, default_height) = params.resolution.dimensions();
        let width = options.width.unwrap_or(default_width);
        let height = options.height.unwrap_or(default_height);
        if width == 0 || height == 0 {
            bail!("stub frame size must be non-zero");
        }
        log::debug!(
            "SyntheticCamera: '{}' frames={:?} fail_every={} depth={:?}",
            options.name,
            options.frames,
            options.fail_every,
            params.depth_mode
        );
        Ok(Self {
            options,
            width,
            height,
            attempts: 0,
            current: None,
            current_timestamp: Timestamp::default(),
            streaming: None,
        })
    }

    pub(super) fn information(&self) -> CameraInformation {
        CameraInformation {
            width: self.width,
            height: self.height,
            fps: self.options.fps,
        }
    }

    pub(super) fn enable_streaming(
        &mut self,
        params: &StreamingParameters,
    ) -> Result<(), ErrorCode> {
        params.validate()?;
        self.streaming = Some(params.clone());
        Ok(())
    }

    pub(super) fn disable_streaming(&mut self) {
        if let Some(params) = self.streaming.take() {
            log::debug!("SyntheticCamera: stream on port {} stopped", params.port);
        }
    }

    pub(super) fn grab(&mut self) -> Result<(), ErrorCode> {
        self.attempts += 1;
        if self.options.fail_every > 0 && self.attempts.is_multiple_of(self.options.fail_every) {
            return Err(ErrorCode::CorruptedFrame);
        }

        let next = self.current.map_or(0, |index| index + 1);
        match self.options.frames {
            Some(total) => {
                if next >= total {
                    return Err(ErrorCode::EndOfSvoFileReached);
                }
                self.current_timestamp =
                    Timestamp::from_nanos(RECORDING_EPOCH_NS + next * self.frame_interval_ns());
            }
            None => {
                std::thread::sleep(Duration::from_nanos(self.frame_interval_ns()));
                self.current_timestamp = Timestamp::from_nanos(wall_clock_ns());
            }
        }
        self.current = Some(next);
        Ok(())
    }

    pub(super) fn retrieve_image(&mut self, view: View, frame: &mut Frame) -> Result<(), ErrorCode> {
        let Some(index) = self.current else {
            return Err(ErrorCode::InvalidFunctionCall);
        };
        frame.reshape(self.width, self.height);

        let view_offset: u64 = match view {
            View::Left => 0,
            View::Right => 64,
            View::LeftUnrectified => 128,
            View::RightUnrectified => 192,
        };
        let width = self.width as usize;
        for (i, px) in frame.bgra_mut().chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let x = (i % width) as u64;
            let y = (i / width) as u64;
            px[0] = ((x + index) % 256) as u8;
            px[1] = ((y + view_offset) % 256) as u8;
            px[2] = ((x + y + index) % 256) as u8;
            px[3] = 255;
        }
        frame.timestamp = self.current_timestamp;
        Ok(())
    }

    pub(super) fn replay_position(&self) -> Option<ReplayPosition> {
        self.options.frames.map(|total| ReplayPosition {
            position: self.current.unwrap_or(0),
            total,
        })
    }

    pub(super) fn image_timestamp(&self) -> Timestamp {
        self.current_timestamp
    }

    pub(super) fn close(&mut self) {
        if let Some(params) = self.streaming.take() {
            log::debug!("SyntheticCamera: stream on port {} stopped", params.port);
        }
        log::debug!(
            "SyntheticCamera: '{}' closed after {} grab attempts",
            self.options.name,
            self.attempts
        );
    }

    fn frame_interval_ns(&self) -> u64 {
        (1e9 / self.options.fps as f64) as u64
    }
}

fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DepthMode, InputSource, Resolution};

    fn params() -> InitParameters {
        InitParameters {
            input: InputSource::Synthetic("stub://test".to_string()),
            resolution: Resolution::Vga,
            depth_mode: DepthMode::None,
            ..InitParameters::default()
        }
    }

    #[test]
    fn parses_stub_options() -> Result<()> {
        let options = StubOptions::parse("stub://rec?frames=12&fail_every=3&fps=15&width=8&height=4")?;
        assert_eq!(options.name, "rec");
        assert_eq!(options.frames, Some(12));
        assert_eq!(options.fail_every, 3);
        assert_eq!(options.fps, 15.0);
        assert_eq!(options.width, Some(8));
        assert_eq!(options.height, Some(4));
        Ok(())
    }

    #[test]
    fn rejects_unknown_or_malformed_options() {
        assert!(StubOptions::parse("stub://rec?color=red").is_err());
        assert!(StubOptions::parse("stub://rec?frames").is_err());
        assert!(StubOptions::parse("stub://rec?frames=many").is_err());
        assert!(StubOptions::parse("stub://rec?fps=0").is_err());
    }

    #[test]
    fn recording_ends_after_last_frame() -> Result<()> {
        let mut camera = SyntheticCamera::open("stub://rec?frames=2", &params())?;
        assert_eq!(camera.grab(), Ok(()));
        assert_eq!(camera.replay_position().map(|p| p.position), Some(0));
        assert_eq!(camera.grab(), Ok(()));
        assert_eq!(camera.replay_position().map(|p| p.position), Some(1));
        assert_eq!(camera.grab(), Err(ErrorCode::EndOfSvoFileReached));
        Ok(())
    }

    #[test]
    fn injected_failures_do_not_advance_position() -> Result<()> {
        let mut camera = SyntheticCamera::open("stub://rec?frames=5&fail_every=2", &params())?;
        assert!(camera.grab().is_ok());
        assert_eq!(camera.grab(), Err(ErrorCode::CorruptedFrame));
        assert!(camera.grab().is_ok());
        assert_eq!(camera.replay_position().map(|p| p.position), Some(1));
        Ok(())
    }

    #[test]
    fn retrieve_fills_frame_and_timestamp() -> Result<()> {
        let mut camera =
            SyntheticCamera::open("stub://rec?frames=3&fps=10&width=4&height=2", &params())?;
        let mut frame = Frame::new();
        assert_eq!(
            camera.retrieve_image(View::Left, &mut frame),
            Err(ErrorCode::InvalidFunctionCall)
        );

        camera.grab().map_err(anyhow::Error::new)?;
        camera.grab().map_err(anyhow::Error::new)?;
        camera
            .retrieve_image(View::Left, &mut frame)
            .map_err(anyhow::Error::new)?;
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(
            frame.timestamp.as_nanos(),
            RECORDING_EPOCH_NS + 100_000_000
        );
        assert!(frame.bgra().chunks_exact(4).all(|px| px[3] == 255));
        Ok(())
    }

    #[test]
    fn live_sessions_have_no_replay_position() -> Result<()> {
        let camera = SyntheticCamera::open("stub://live", &params())?;
        assert_eq!(camera.replay_position(), None);
        Ok(())
    }
}
