//! Frame acquisition loop.
//!
//! One loop shape serves every program: while RUNNING, check the shutdown
//! flag, grab once, hand a successful grab to the caller and sleep a fixed
//! delay after a failed one. Failures are never classified and never
//! counted against a limit; only the flag or the caller's `Flow::Stop`
//! (end of a recording) move the loop to STOPPING.

use anyhow::Result;
use std::time::Duration;

use crate::camera::{ReplayPosition, View};
use crate::error::ErrorCode;
use crate::frame::Frame;
use crate::shutdown::ShutdownSignal;

/// Anything that can advance to a next frame.
pub trait FrameSource {
    fn grab(&mut self) -> Result<(), ErrorCode>;
}

/// A source whose frames can be read back and whose length is known.
pub trait RecordedSource: FrameSource {
    /// Fill `frame` (pixels and timestamp) from the last grab.
    fn retrieve(&mut self, view: View, frame: &mut Frame) -> Result<(), ErrorCode>;

    /// `None` for live sources.
    fn replay_position(&self) -> Option<ReplayPosition>;

    /// Release the session.
    fn close(self)
    where
        Self: Sized;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
}

/// What the frame handler wants after a successful grab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    EndOfInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopSummary {
    pub grabbed: u64,
    pub failed: u64,
    pub reason: StopReason,
}

/// Run the acquisition loop until interrupted or `on_frame` returns `Flow::Stop`.
///
/// Errors from `on_frame` end the loop and propagate.
pub fn run_loop<S, F>(
    source: &mut S,
    shutdown: &ShutdownSignal,
    retry_delay: Duration,
    mut on_frame: F,
) -> Result<LoopSummary>
where
    S: FrameSource + ?Sized,
    F: FnMut(&mut S) -> Result<Flow>,
{
    let mut state = LoopState::Running;
    let mut reason = StopReason::Interrupted;
    let mut grabbed = 0u64;
    let mut failed = 0u64;

    while state == LoopState::Running {
        if shutdown.is_triggered() {
            state = LoopState::Stopping;
            continue;
        }

        match source.grab() {
            Ok(()) => {
                grabbed += 1;
                if on_frame(source)? == Flow::Stop {
                    reason = StopReason::EndOfInput;
                    state = LoopState::Stopping;
                }
            }
            Err(code) => {
                failed += 1;
                log::trace!("grab failed ({}), retrying", code);
                std::thread::sleep(retry_delay);
            }
        }
    }

    Ok(LoopSummary {
        grabbed,
        failed,
        reason,
    })
}
