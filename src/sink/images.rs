use anyhow::{bail, Context, Result};
use image::{ColorType, ImageFormat};
use std::path::PathBuf;

use super::FrameSink;
use crate::frame::Frame;

/// Writes every frame as `<position>_<timestamp_us>.<ext>` into a directory.
pub struct ImageSequenceWriter {
    dir: PathBuf,
    extension: String,
    format: ImageFormat,
    rgb: Vec<u8>,
    written: u64,
}

impl ImageSequenceWriter {
    /// The directory must already exist; it is never created here.
    pub fn create(dir: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!(
                "output directory doesn't exist, check permissions or create it: {}",
                dir.display()
            );
        }

        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        let format = match ImageFormat::from_extension(&extension) {
            Some(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => format,
            _ => bail!("unsupported image extension '{}' (use jpg or png)", extension),
        };

        Ok(Self {
            dir,
            extension,
            format,
            rgb: Vec::new(),
            written: 0,
        })
    }

    pub fn path_for(&self, frame: &Frame, position: u64) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{}",
            position,
            frame.timestamp.as_micros(),
            self.extension
        ))
    }
}

impl FrameSink for ImageSequenceWriter {
    fn write(&mut self, frame: &Frame, position: u64) -> Result<()> {
        let path = self.path_for(frame, position);
        frame.to_rgb(&mut self.rgb);
        image::save_buffer_with_format(
            &path,
            &self.rgb,
            frame.width(),
            frame.height(),
            ColorType::Rgb8,
            self.format,
        )
        .with_context(|| format!("failed to write image {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }

    fn finish(self) -> Result<()> {
        log::info!(
            "ImageSequenceWriter: wrote {} images to {}",
            self.written,
            self.dir.display()
        );
        Ok(())
    }
}
