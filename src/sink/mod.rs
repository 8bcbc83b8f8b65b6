//! Output sinks for exported frames.
//!
//! - Image sequences in a directory (always available)
//! - Video containers (feature: video-ffmpeg)
//!
//! A sink is open before the first frame is written and is finalized once,
//! by `finish()` or, on an early exit, by its `Drop`.

mod images;
mod video;
#[cfg(feature = "video-ffmpeg")]
mod video_ffmpeg;

use anyhow::Result;

use crate::frame::Frame;

pub use images::ImageSequenceWriter;
pub use video::VideoWriter;

pub trait FrameSink {
    /// Persist one frame. `position` is its index within the recording.
    fn write(&mut self, frame: &Frame, position: u64) -> Result<()>;

    /// Frames written so far.
    fn frames_written(&self) -> u64;

    /// Flush and close the sink.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}
