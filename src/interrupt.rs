use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cooperative cancellation signal handed to a provider call.
///
/// The agent loop keeps one clone and fires it to abandon an in-flight
/// request; the provider races the HTTP call against `interrupted()` and maps
/// a win for the signal to `ProviderError::Interrupted`.
#[derive(Clone, Default)]
pub struct InterruptSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    fired: AtomicBool,
    notify: Notify,
}

impl InterruptSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent; wakes every pending `interrupted()` call.
    pub fn interrupt(&self) {
        self.inner.fired.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Resolves once the signal has fired. Safe against the signal firing
    /// before the call: the fired flag is checked on both sides of the wait.
    pub async fn interrupted(&self) {
        loop {
            if self.is_interrupted() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_interrupted() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_before_wait() {
        let signal = InterruptSignal::new();
        signal.interrupt();
        assert!(signal.is_interrupted());
        // Must resolve immediately even though the notify fired first
        signal.interrupted().await;
    }

    #[tokio::test]
    async fn test_interrupt_wakes_waiter() {
        let signal = InterruptSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.interrupted().await });
        tokio::task::yield_now().await;
        signal.interrupt();
        handle.await.unwrap();
    }
}
