use anyhow::Result;
use std::path::PathBuf;

use super::FrameSink;
#[cfg(feature = "video-ffmpeg")]
use super::video_ffmpeg::FfmpegVideoWriter;
use crate::frame::Frame;

/// Appends frames to a video container file.
///
/// The container is picked from the file extension; frames are encoded as
/// MPEG-4 part 2. Requires the video-ffmpeg feature.
pub struct VideoWriter {
    path: PathBuf,
    written: u64,
    finished: bool,
    backend: VideoBackend,
}

enum VideoBackend {
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegVideoWriter),
    /// Never constructed; keeps the match arms total without the feature.
    #[cfg(not(feature = "video-ffmpeg"))]
    #[allow(dead_code)]
    Unavailable(std::convert::Infallible),
}

impl VideoWriter {
    pub fn create(path: impl Into<PathBuf>, width: u32, height: u32, fps: u32) -> Result<Self> {
        let path = path.into();
        if width == 0 || height == 0 || fps == 0 {
            anyhow::bail!(
                "invalid video geometry {}x{} @ {} fps for {}",
                width,
                height,
                fps,
                path.display()
            );
        }

        #[cfg(feature = "video-ffmpeg")]
        {
            let backend =
                VideoBackend::Ffmpeg(FfmpegVideoWriter::open(&path, width, height, fps)?);
            log::info!(
                "VideoWriter: writing {}x{} @ {} fps to {}",
                width,
                height,
                fps,
                path.display()
            );
            Ok(Self {
                path,
                written: 0,
                finished: false,
                backend,
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            anyhow::bail!(
                "cannot open video writer for {}: video export requires the video-ffmpeg feature",
                path.display()
            )
        }
    }

    fn finalize(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.backend.finish()
    }
}

impl VideoBackend {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        match self {
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(writer) => writer.write(frame),
            #[cfg(not(feature = "video-ffmpeg"))]
            VideoBackend::Unavailable(never) => {
                let _ = frame;
                match *never {}
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(writer) => writer.finish(),
            #[cfg(not(feature = "video-ffmpeg"))]
            VideoBackend::Unavailable(never) => match *never {},
        }
    }
}

impl FrameSink for VideoWriter {
    fn write(&mut self, frame: &Frame, _position: u64) -> Result<()> {
        self.backend.write(frame)?;
        self.written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }

    fn finish(mut self) -> Result<()> {
        self.finalize()?;
        log::info!(
            "VideoWriter: wrote {} frames to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            log::error!(
                "VideoWriter: failed to finalize {}: {:#}",
                self.path.display(),
                err
            );
        }
    }
}
