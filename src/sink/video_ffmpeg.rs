//! Video container output using FFmpeg.
//!
//! Frames arrive as BGRA, are scaled to YUV420P and encoded with the
//! MPEG-4 part 2 encoder. Packets are muxed as soon as the encoder emits
//! them, so buffering is whatever FFmpeg does internally.

use anyhow::{anyhow, bail, Context, Result};
use ffmpeg_next as ffmpeg;
use std::path::Path;

use ffmpeg::codec;
use ffmpeg::codec::encoder::video::Encoder;
use ffmpeg::format;
use ffmpeg::software::scaling;
use ffmpeg::util::format::pixel::Pixel;
use ffmpeg::{Packet, Rational};

use crate::frame::Frame;

/// Bits per pixel per frame used to size the encoder bitrate.
const BITS_PER_PIXEL: f64 = 0.15;

pub(crate) struct FfmpegVideoWriter {
    output: format::context::Output,
    encoder: Encoder,
    scaler: scaling::context::Context,
    stream_index: usize,
    time_base: Rational,
    source: ffmpeg::frame::Video,
    converted: ffmpeg::frame::Video,
    width: u32,
    height: u32,
    next_pts: i64,
}

impl FfmpegVideoWriter {
    pub(crate) fn open(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let mut output = format::output(&path)
            .with_context(|| format!("failed to open video output '{}'", path.display()))?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let codec = codec::encoder::find(codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg has no MPEG-4 part 2 encoder"))?;
        let time_base = Rational::new(1, fps as i32);

        let mut context = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("create video encoder")?;
        context.set_width(width);
        context.set_height(height);
        context.set_format(Pixel::YUV420P);
        context.set_time_base(time_base);
        context.set_frame_rate(Some(Rational::new(fps as i32, 1)));
        context.set_bit_rate(
            (f64::from(width) * f64::from(height) * f64::from(fps) * BITS_PER_PIXEL) as usize,
        );
        if global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let encoder = context
            .open_as(codec)
            .context("open MPEG-4 part 2 encoder")?;

        let stream_index = {
            let mut stream = output.add_stream(codec).context("add video stream")?;
            stream.set_parameters(&encoder);
            stream.set_time_base(time_base);
            stream.index()
        };
        output
            .write_header()
            .with_context(|| format!("write container header to '{}'", path.display()))?;

        let scaler = scaling::context::Context::get(
            Pixel::BGRA,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            time_base,
            source: ffmpeg::frame::Video::new(Pixel::BGRA, width, height),
            converted: ffmpeg::frame::Video::empty(),
            width,
            height,
            next_pts: 0,
        })
    }

    pub(crate) fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            bail!(
                "frame is {}x{} but the video is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }

        let row_bytes = frame.row_bytes();
        let stride = self.source.stride(0);
        let plane = self.source.data_mut(0);
        for (row, src) in frame.bgra().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            plane
                .get_mut(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?
                .copy_from_slice(src);
        }

        self.scaler
            .run(&self.source, &mut self.converted)
            .context("convert frame to YUV420P")?;
        self.converted.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&self.converted)
            .context("send frame to encoder")?;
        self.write_packets()
    }

    /// Flush the encoder and write the container trailer.
    pub(crate) fn finish(&mut self) -> Result<()> {
        self.encoder.send_eof().context("flush encoder")?;
        self.write_packets()?;
        self.output
            .write_trailer()
            .context("write container trailer")?;
        Ok(())
    }

    fn write_packets(&mut self) -> Result<()> {
        let stream_time_base = self
            .output
            .stream(self.stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| anyhow!("video stream {} missing", self.stream_index))?;

        let mut packet = Packet::empty();
        while packet_ready(self.encoder.receive_packet(&mut packet))? {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.time_base, stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("mux video packet")?;
        }
        Ok(())
    }
}

/// `true` when the encoder produced a packet, `false` once it needs more
/// input or is drained. Any other encoder error is returned.
fn packet_ready(result: Result<(), ffmpeg::Error>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => Ok(false),
        Err(err) => Err(err).context("receive encoded packet"),
    }
}
