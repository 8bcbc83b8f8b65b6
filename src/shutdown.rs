//! Interrupt-driven stop flag.
//!
//! The flag is shared explicitly with the acquisition loop instead of living
//! in a process global. The Ctrl-C handler only stores `true`; the loop reads
//! it once per iteration, so a late read costs at most one extra grab.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal and register it as the process Ctrl-C handler.
    ///
    /// Only one handler can be installed per process.
    pub fn install() -> Result<Self> {
        let signal = Self::new();
        let handler = signal.clone();
        ctrlc::set_handler(move || handler.trigger()).context("error setting Ctrl-C handler")?;
        Ok(signal)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
