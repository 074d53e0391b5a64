//! Link readiness signal
//!
//! A single binary "link is usable" condition with exactly one writer
//! ([`ReadinessSignal`], owned by the link supervisor) and any number of
//! readers ([`Readiness`]). Backed by a `tokio::sync::watch` channel: a wait
//! observes the current value before suspending, so a set that races with the
//! start of a wait is never lost.

use crate::error::{LinkError, Result};
use tokio::sync::watch;

/// Create a readiness pair, initially cleared
pub fn channel() -> (ReadinessSignal, Readiness) {
    let (tx, rx) = watch::channel(false);
    (ReadinessSignal { tx }, Readiness { rx })
}

/// Writer side of the readiness condition
///
/// Not `Clone`: only one event source may set or clear readiness. Dropping the
/// writer while the signal is cleared makes pending and future waits fail
/// with [`LinkError::Stopped`].
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: watch::Sender<bool>,
}

impl ReadinessSignal {
    /// Mark the link usable, waking all waiters. Returns whether the value changed.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|ready| !std::mem::replace(ready, true))
    }

    /// Mark the link unusable. Returns whether the value changed.
    pub fn clear(&self) -> bool {
        self.tx.send_if_modified(|ready| std::mem::replace(ready, false))
    }

    /// Current value
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// A new reader handle
    pub fn subscribe(&self) -> Readiness {
        Readiness {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reader side of the readiness condition
#[derive(Debug, Clone)]
pub struct Readiness {
    rx: watch::Receiver<bool>,
}

impl Readiness {
    /// Whether the link is usable right now
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the link is usable
    ///
    /// There is no timeout: this suspends for as long as the link stays down.
    /// Wrap it in `tokio::time::timeout` to bound the wait.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Stopped`] if the writer is dropped before the link
    /// ever becomes ready.
    pub async fn wait(&self) -> Result<()> {
        let mut rx = self.rx.clone();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| LinkError::Stopped.into())
    }

    /// Block the current thread until the link is usable
    ///
    /// For callers running outside the async runtime (e.g. a dedicated
    /// `std::thread`). Must not be called from within a runtime worker.
    pub fn wait_blocking(&self) -> Result<()> {
        futures::executor::block_on(self.wait())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    #[test]
    fn test_starts_cleared() {
        let (signal, readiness) = channel();
        assert!(!signal.is_set());
        assert!(!readiness.is_ready());
    }

    #[test]
    fn test_set_and_clear_report_changes() {
        let (signal, readiness) = channel();

        assert!(signal.set());
        assert!(!signal.set(), "second set is not a change");
        assert!(readiness.is_ready());

        assert!(signal.clear());
        assert!(!signal.clear(), "second clear is not a change");
        assert!(!readiness.is_ready());
    }

    #[test]
    fn test_wait_pending_until_set() {
        let (signal, readiness) = channel();
        let mut wait = task::spawn(readiness.wait());

        assert_pending!(wait.poll());
        assert_pending!(wait.poll());

        signal.set();
        assert!(wait.is_woken(), "set must wake the waiter");
        assert_ready_ok!(wait.poll());
    }

    #[test]
    fn test_wait_ignores_clear_without_set() {
        let (signal, readiness) = channel();
        let mut wait = task::spawn(readiness.wait());

        assert_pending!(wait.poll());
        signal.clear();
        assert_pending!(wait.poll());
    }

    #[test]
    fn test_wait_returns_immediately_when_already_set() {
        let (signal, readiness) = channel();
        signal.set();

        let mut wait = task::spawn(readiness.wait());
        assert_ready_ok!(wait.poll());
    }

    #[tokio::test]
    async fn test_wait_blocks_while_never_set() {
        let (_signal, readiness) = channel();

        let result = tokio::time::timeout(Duration::from_millis(200), readiness.wait()).await;
        assert!(result.is_err(), "wait must not return before the signal is set");
    }

    #[tokio::test]
    async fn test_multiple_waiters_released_together() {
        let (signal, readiness) = channel();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let readiness = readiness.clone();
                tokio::spawn(async move { readiness.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        signal.set();

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_dropped_writer_fails_waiters() {
        let (signal, readiness) = channel();
        let waiter = tokio::spawn({
            let readiness = readiness.clone();
            async move { readiness.wait().await }
        });

        tokio::task::yield_now().await;
        drop(signal);

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Link(LinkError::Stopped))));
    }

    #[test]
    fn test_wait_blocking_from_plain_thread() {
        let (signal, readiness) = channel();
        let subscriber = signal.subscribe();

        let waiter = std::thread::spawn(move || readiness.wait_blocking());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished(), "waiter must block until set");

        signal.set();
        waiter.join().unwrap().unwrap();
        assert!(subscriber.is_ready());
    }
}
