/// Cooperative shutdown signal
///
/// Long-running loops poll [`ShutdownSignal::is_triggered`] at safe points
/// and sleep through [`ShutdownSignal::check_shutdown_or_delay`], which
/// wakes immediately when shutdown is requested instead of finishing the
/// whole delay.
use crate::logger::{self, LogTag};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct ShutdownState {
    requested: AtomicBool,
    notify: Notify,
}

#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownState>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every sleeper; idempotent
    pub fn trigger(&self) {
        if !self.inner.requested.swap(true, Ordering::AcqRel) {
            logger::info(LogTag::System, "Shutdown requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown comes first. Returns true on shutdown.
    pub async fn check_shutdown_or_delay(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a trigger in between is not lost
        notified.as_mut().enable();

        if self.is_triggered() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_triggered(),
            _ = &mut notified => true,
        }
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

/// Route Ctrl-C to `signal`; a second Ctrl-C exits immediately
pub fn install_ctrlc_handler(signal: ShutdownSignal) -> Result<(), String> {
    let presses = AtomicU32::new(0);
    ctrlc::set_handler(move || {
        if presses.fetch_add(1, Ordering::SeqCst) == 0 {
            logger::warning(LogTag::System, "Ctrl-C received, stopping (press again to force)");
            signal.trigger();
        } else {
            logger::error(LogTag::System, "Forced exit");
            std::process::exit(130);
        }
    })
    .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))
}
