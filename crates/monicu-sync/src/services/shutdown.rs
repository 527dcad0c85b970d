//! Process-wide shutdown signal

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::error::{SyncError, SyncResult};

/// Cloneable shutdown handle backed by a `watch` channel
///
/// Every clone observes the same signal. Work wrapped with [`Shutdown::guard`]
/// is dropped mid-flight once the signal fires.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal every holder to stop
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver for components that select on the raw channel
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolve once shutdown has been signalled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail here
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Run `work` unless shutdown fires first
    pub async fn guard<T, E, F>(&self, work: F) -> SyncResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<SyncError>,
    {
        if self.is_triggered() {
            return Err(SyncError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(SyncError::Cancelled),
            result = work => result.map_err(Into::into),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_core::DomainError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let shutdown = Shutdown::new();
        let value = shutdown
            .guard(async { Ok::<_, DomainError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guard_cancels_pending_work() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let result = shutdown
            .guard(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, DomainError>(())
            })
            .await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_guard_after_trigger_does_not_start_work() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let result = shutdown.guard(async { Ok::<_, DomainError>(()) }).await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(*shutdown.subscribe().borrow());
    }
}
