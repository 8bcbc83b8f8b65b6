use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::camera::{Resolution, StreamingCodec, StreamingParameters, View};

const DEFAULT_DEVICE: &str = "0";
const DEFAULT_RESOLUTION: Resolution = Resolution::Hd1080;
const DEFAULT_STREAM_CODEC: StreamingCodec = StreamingCodec::H265;
const DEFAULT_STREAM_BITRATE_KBPS: u32 = 8000;
const DEFAULT_STREAM_CHUNK_SIZE: u16 = 4096;
const DEFAULT_STREAM_PORT: u16 = 30000;
const DEFAULT_VIDEO_VIEW: View = View::Left;
const DEFAULT_VIDEO_MIN_FPS: u32 = 30;
const DEFAULT_IMAGE_VIEW: View = View::LeftUnrectified;
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";
const DEFAULT_RETRY_DELAY_MS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    camera: Option<CameraConfigFile>,
    streaming: Option<StreamingConfigFile>,
    video: Option<VideoConfigFile>,
    images: Option<ImageConfigFile>,
    retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    resolution: Option<Resolution>,
    sdk_verbose: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StreamingConfigFile {
    codec: Option<StreamingCodec>,
    bitrate_kbps: Option<u32>,
    chunk_size: Option<u16>,
    port: Option<u16>,
    gop_size: Option<i32>,
    adaptive_bitrate: Option<bool>,
    target_framerate: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VideoConfigFile {
    view: Option<View>,
    min_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ImageConfigFile {
    view: Option<View>,
    extension: Option<String>,
}

/// Settings shared by the capture programs.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub camera: CameraSettings,
    pub streaming: StreamingParameters,
    pub video: VideoSettings,
    pub images: ImageSettings,
    /// Pause after a failed grab before trying again.
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Device index or `stub://` URL for live capture.
    pub device: String,
    pub resolution: Resolution,
    pub sdk_verbose: bool,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub view: View,
    /// Lowest frame rate written to the container.
    pub min_fps: u32,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub view: View,
    pub extension: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        // An empty file carries no overrides and cannot fail.
        Self::from_file(CaptureConfigFile::default())
    }
}

impl CaptureConfig {
    /// Defaults, then the JSON file named by `ZED_CAPTURE_CONFIG`, then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ZED_CAPTURE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let streaming = file.streaming.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let images = file.images.unwrap_or_default();

        Self {
            camera: CameraSettings {
                device: camera.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
                resolution: camera.resolution.unwrap_or(DEFAULT_RESOLUTION),
                sdk_verbose: camera.sdk_verbose.unwrap_or(true),
            },
            streaming: StreamingParameters {
                codec: streaming.codec.unwrap_or(DEFAULT_STREAM_CODEC),
                bitrate_kbps: streaming
                    .bitrate_kbps
                    .unwrap_or(DEFAULT_STREAM_BITRATE_KBPS),
                port: streaming.port.unwrap_or(DEFAULT_STREAM_PORT),
                gop_size: streaming.gop_size.unwrap_or(-1),
                adaptive_bitrate: streaming.adaptive_bitrate.unwrap_or(false),
                chunk_size: streaming.chunk_size.unwrap_or(DEFAULT_STREAM_CHUNK_SIZE),
                target_framerate: streaming.target_framerate.unwrap_or(0),
            },
            video: VideoSettings {
                view: video.view.unwrap_or(DEFAULT_VIDEO_VIEW),
                min_fps: video.min_fps.unwrap_or(DEFAULT_VIDEO_MIN_FPS),
            },
            images: ImageSettings {
                view: images.view.unwrap_or(DEFAULT_IMAGE_VIEW),
                extension: images
                    .extension
                    .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string()),
            },
            retry_delay: Duration::from_millis(
                file.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("ZED_CAPTURE_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device.trim().to_string();
            }
        }
        if let Ok(bitrate) = std::env::var("ZED_CAPTURE_STREAM_BITRATE") {
            self.streaming.bitrate_kbps = bitrate.trim().parse().map_err(|_| {
                anyhow!("ZED_CAPTURE_STREAM_BITRATE must be an integer number of kbit/s")
            })?;
        }
        if let Ok(port) = std::env::var("ZED_CAPTURE_STREAM_PORT") {
            self.streaming.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("ZED_CAPTURE_STREAM_PORT must be a port number"))?;
        }
        if let Ok(extension) = std::env::var("ZED_CAPTURE_IMAGE_EXT") {
            if !extension.trim().is_empty() {
                self.images.extension = extension.trim().to_string();
            }
        }
        if let Ok(delay) = std::env::var("ZED_CAPTURE_RETRY_DELAY_MS") {
            let millis: u64 = delay.trim().parse().map_err(|_| {
                anyhow!("ZED_CAPTURE_RETRY_DELAY_MS must be an integer number of milliseconds")
            })?;
            self.retry_delay = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.images.extension = self
            .images
            .extension
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if !matches!(self.images.extension.as_str(), "jpg" | "jpeg" | "png") {
            bail!(
                "image extension must be jpg, jpeg or png, got '{}'",
                self.images.extension
            );
        }
        if self.video.min_fps == 0 {
            bail!("video min_fps must be greater than zero");
        }
        Ok(())
    }

    /// Streaming limits, checked by the streaming program before it opens the camera.
    pub fn validate_streaming(&self) -> Result<()> {
        if self.streaming.validate().is_err() {
            bail!(
                "invalid streaming settings: bitrate {} kbit/s (allowed {:?}), chunk size {} \
                 (allowed {:?}), port {} (must be even)",
                self.streaming.bitrate_kbps,
                StreamingParameters::BITRATE_RANGE_KBPS,
                self.streaming.chunk_size,
                StreamingParameters::CHUNK_SIZE_RANGE,
                self.streaming.port
            );
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_capture_programs() {
        let cfg = CaptureConfig::default();
        assert!(cfg.validate_streaming().is_ok());
        assert_eq!(cfg.camera.device, "0");
        assert_eq!(cfg.camera.resolution, Resolution::Hd1080);
        assert!(cfg.camera.sdk_verbose);
        assert_eq!(cfg.streaming.codec, StreamingCodec::H265);
        assert_eq!(cfg.streaming.bitrate_kbps, 8000);
        assert_eq!(cfg.streaming.chunk_size, 4096);
        assert_eq!(cfg.video.view, View::Left);
        assert_eq!(cfg.video.min_fps, 30);
        assert_eq!(cfg.images.view, View::LeftUnrectified);
        assert_eq!(cfg.images.extension, "jpg");
        assert_eq!(cfg.retry_delay, Duration::from_millis(1));
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let file: CaptureConfigFile = serde_json::from_str(
            r#"{
                "camera": { "resolution": "hd720" },
                "streaming": { "codec": "h264", "bitrate_kbps": 12000 },
                "images": { "view": "right", "extension": ".PNG" },
                "retry_delay_ms": 5
            }"#,
        )?;
        let mut cfg = CaptureConfig::from_file(file);
        cfg.validate()?;

        assert_eq!(cfg.camera.resolution, Resolution::Hd720);
        assert_eq!(cfg.streaming.codec, StreamingCodec::H264);
        assert_eq!(cfg.streaming.bitrate_kbps, 12000);
        assert_eq!(cfg.streaming.chunk_size, 4096);
        assert_eq!(cfg.images.view, View::Right);
        assert_eq!(cfg.images.extension, "png");
        assert_eq!(cfg.retry_delay, Duration::from_millis(5));
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<CaptureConfigFile, _> =
            serde_json::from_str(r#"{ "streaming": { "bitrate": 8000 } }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = CaptureConfig::default();
        cfg.images.extension = "gif".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = CaptureConfig::default();
        cfg.streaming.bitrate_kbps = 100_000;
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_streaming().is_err());

        let mut cfg = CaptureConfig::default();
        cfg.video.min_fps = 0;
        assert!(cfg.validate().is_err());
    }
}
