//! Delayed session shutdown
//!
//! `end_call` must let the farewell audio finish before the session tears
//! down, so the shutdown hook fires after a configurable grace period and
//! can be cancelled if the caller keeps talking or the session dies first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use vaani_config::constants::timeouts;

type ShutdownHook = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    hook: Mutex<Option<ShutdownHook>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    grace: Mutex<Duration>,
}

/// Cancellable delayed-shutdown handle, cloneable across tools
#[derive(Clone)]
pub struct ShutdownScheduler {
    inner: Arc<Inner>,
}

impl ShutdownScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                hook: Mutex::new(None),
                pending: Mutex::new(None),
                grace: Mutex::new(Duration::from_millis(timeouts::END_CALL_GRACE_MS)),
            }),
        }
    }

    pub fn with_grace(self, grace: Duration) -> Self {
        *self.inner.grace.lock() = grace;
        self
    }

    /// Install the hook the runtime runs to end the session
    pub fn install_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.inner.hook.lock() = Some(Arc::new(hook));
    }

    pub fn has_hook(&self) -> bool {
        self.inner.hook.lock().is_some()
    }

    /// Schedule the shutdown after the grace period. Returns false when no
    /// hook is installed. Re-scheduling replaces the pending timer.
    pub fn schedule(&self, reason: &str) -> bool {
        let Some(hook) = self.inner.hook.lock().clone() else {
            tracing::warn!(reason, "end_call requested but no shutdown hook installed");
            return false;
        };

        let grace = *self.inner.grace.lock();
        tracing::info!(reason, grace_ms = grace.as_millis() as u64, "shutdown scheduled");

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            hook();
        });

        if let Some(previous) = self.inner.pending.lock().replace(handle) {
            previous.abort();
        }
        true
    }

    /// Cancel a pending shutdown. Session teardown calls this so an
    /// in-flight timer never fires on a dead session.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
            tracing::debug!("pending shutdown cancelled");
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner
            .pending
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Default for ShutdownScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_hook_fires_after_grace() {
        let fired = Arc::new(AtomicBool::new(false));
        let scheduler = ShutdownScheduler::new().with_grace(Duration::from_millis(20));
        let flag = fired.clone();
        scheduler.install_hook(move || flag.store(true, Ordering::SeqCst));

        assert!(scheduler.schedule("caller said goodbye"));
        assert!(scheduler.is_scheduled());
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let scheduler = ShutdownScheduler::new().with_grace(Duration::from_millis(30));
        let flag = fired.clone();
        scheduler.install_hook(move || flag.store(true, Ordering::SeqCst));

        scheduler.schedule("goodbye");
        scheduler.cancel();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn test_schedule_without_hook() {
        let scheduler = ShutdownScheduler::new();
        assert!(!scheduler.schedule("goodbye"));
        assert!(!scheduler.is_scheduled());
    }
}
