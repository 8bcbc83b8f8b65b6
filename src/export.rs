//! Recording replay into a frame sink.
//!
//! Each successful grab retrieves one view into a single reused `Frame`,
//! hands it to the sink and advances the progress bar. The export stops at
//! the last frame of the recording or when the shutdown flag is set. On
//! success the sink is finished and the session closed; on error both are
//! released by their `Drop` guards.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::camera::View;
use crate::frame::Frame;
use crate::pipeline::{run_loop, Flow, RecordedSource, StopReason};
use crate::shutdown::ShutdownSignal;
use crate::sink::FrameSink;

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub view: View,
    pub retry_delay: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub frames_written: u64,
    pub frames_skipped: u64,
    pub failed_grabs: u64,
    pub reason: StopReason,
}

/// Conversion progress over the frames of a recording.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// A bar on stderr when `visible`, otherwise a silent counter.
    pub fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self::hidden(total);
        }
        let bar = ProgressBar::new(total);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("[{bar:30}] {percent:>3}% {pos}/{len} frames ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    fn set_position(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

/// Replay `source` into `sink` until the recording ends or `shutdown` fires.
pub fn export_recording<S, K>(
    mut source: S,
    mut sink: K,
    options: &ExportOptions,
    shutdown: &ShutdownSignal,
    progress: &Progress,
) -> Result<ExportSummary>
where
    S: RecordedSource,
    K: FrameSink,
{
    let total = source
        .replay_position()
        .map(|replay| replay.total)
        .ok_or_else(|| anyhow!("export needs a recorded input, not a live session"))?;

    if total == 0 {
        log::warn!("recording has no frames, nothing to export");
        sink.finish()?;
        source.close();
        return Ok(ExportSummary {
            frames_written: 0,
            frames_skipped: 0,
            failed_grabs: 0,
            reason: StopReason::EndOfInput,
        });
    }

    let mut frame = Frame::new();
    let mut skipped = 0u64;
    let summary = run_loop(&mut source, shutdown, options.retry_delay, |source| {
        let replay = source
            .replay_position()
            .ok_or_else(|| anyhow!("replay position is no longer available"))?;

        match source.retrieve(options.view, &mut frame) {
            Ok(()) => sink.write(&frame, replay.position)?,
            Err(code) => {
                skipped += 1;
                log::warn!(
                    "skipping frame {}: image retrieval failed ({})",
                    replay.position,
                    code
                );
            }
        }
        progress.set_position(replay.position + 1);

        if replay.is_last() {
            log::info!("end of recording reached at frame {}", replay.position);
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    })?;
    progress.finish();

    if summary.reason == StopReason::Interrupted {
        log::info!("export interrupted after {} frames", sink.frames_written());
    }

    let result = ExportSummary {
        frames_written: sink.frames_written(),
        frames_skipped: skipped,
        failed_grabs: summary.failed,
        reason: summary.reason,
    };
    sink.finish()?;
    source.close();
    Ok(result)
}
