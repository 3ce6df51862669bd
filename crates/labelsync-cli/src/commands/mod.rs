//! Command implementations for labelsync-cli

pub mod capture;
pub mod init;
pub mod policies;
pub mod registry;
mod report;
pub mod sync;

pub use capture::run_capture;
pub use init::run_init;
pub use policies::run_policies;
pub use registry::run_registry;
pub use sync::{SyncArgs, run_sync};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Exit status used when a second interrupt stops the process
const INTERRUPTED_EXIT: i32 = 130;

/// Counts interrupts: the first one requests a graceful stop, later ones
/// ask for an immediate exit
#[derive(Debug)]
pub(crate) struct Interrupts {
    flag: Arc<AtomicBool>,
    seen: AtomicUsize,
}

impl Interrupts {
    pub(crate) fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            seen: AtomicUsize::new(0),
        }
    }

    /// Record one interrupt. Returns `true` when the process should exit now.
    pub(crate) fn record(&self) -> bool {
        let previous = self.seen.fetch_add(1, Ordering::SeqCst);
        if previous == 0 {
            self.flag.store(true, Ordering::SeqCst);
            false
        } else {
            true
        }
    }
}

/// Set `flag` on Ctrl-C so workers stop picking up new policies. A second
/// Ctrl-C exits without waiting for in-flight work.
pub(crate) fn abort_on_ctrl_c(flag: Arc<AtomicBool>) {
    let interrupts = Interrupts::new(flag);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupts.record() {
                tracing::warn!("second interrupt received; exiting");
                std::process::exit(INTERRUPTED_EXIT);
            }
            tracing::warn!(
                "interrupt received; finishing in-flight policies (press Ctrl-C again to exit)"
            );
        }
    });
}
