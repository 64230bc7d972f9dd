//! Per-request cancellation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};

/// Cancellation flag shared between a request and the pipeline serving it.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fail with `Cancelled` if the signal has fired
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the signal fires
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            // Sender is owned by self, so this cannot close while we wait
            std::future::pending::<()>().await;
        }
    }

    /// Cancel automatically once `timeout` elapses.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// timer disarms it.
    pub fn cancel_after(&self, timeout: Duration) -> CancelTimer {
        let signal = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            signal.cancel();
        });
        CancelTimer { handle }
    }
}

/// Disarms its timeout when dropped
pub struct CancelTimer {
    handle: JoinHandle<()>,
}

impl Drop for CancelTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let signal = CancelSignal::new();
        assert!(signal.check().is_ok());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        signal.cancel();
        waiter.await.unwrap();

        assert!(signal.is_cancelled());
        assert!(matches!(signal.check(), Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_after_timeout() {
        let signal = CancelSignal::new();
        let _timer = signal.cancel_after(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(5), signal.cancelled())
            .await
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_timer_does_not_fire() {
        let signal = CancelSignal::new();
        drop(signal.cancel_after(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!signal.is_cancelled());
    }
}
