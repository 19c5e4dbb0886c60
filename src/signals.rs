//! Shutdown requests from termination signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use tracing::debug;

/// Signals that ask the animation to stop.
pub const SHUTDOWN_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Flag raised when the process is asked to shut down.
///
/// The signal handler only stores `true`; the render loop reads the flag once
/// per tick and runs teardown itself.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Register [`SHUTDOWN_SIGNALS`] to raise a fresh flag.
    pub fn install() -> Result<Self> {
        let flag = Self::default();
        for signal in SHUTDOWN_SIGNALS {
            signal_hook::flag::register(signal, Arc::clone(&flag.0))
                .with_context(|| format!("Failed to register handler for signal {}", signal))?;
        }
        debug!(signals = ?SHUTDOWN_SIGNALS, "signals:installed");
        Ok(flag)
    }

    #[allow(dead_code)] // Used in tests
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
