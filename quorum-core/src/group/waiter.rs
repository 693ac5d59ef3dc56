use std::future::Future;

use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::watch;
use rst_common::with_tokio::tokio::time::{sleep, Duration, Instant};

/// How long and how often a caller keeps polling a completion predicate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub tick: Duration,

    /// `None` waits until the predicate holds or the wait is cancelled
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Cancelled,
}

/// Sending half of a cancellation token
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half of a cancellation token, observed at tick boundaries
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

/// `Waiter` drives a polling predicate tick by tick
///
/// The predicate is checked once per tick, the wait ends when it holds, when the
/// policy timeout elapses or when the token is cancelled.
#[derive(Debug, Clone)]
pub struct Waiter {
    policy: WaitPolicy,
    cancel: Cancellation,
}

impl Waiter {
    pub fn new(policy: WaitPolicy, cancel: Cancellation) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for one tick, returns false when cancelled before or during the tick
    pub async fn tick(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let mut rx = self.cancel.rx.clone();
        tokio::select! {
            _ = sleep(self.policy.tick) => {}
            changed = rx.changed() => {
                // dropped handle, nobody can cancel anymore
                if changed.is_err() {
                    sleep(self.policy.tick).await;
                }
            }
        }

        !self.is_cancelled()
    }

    pub async fn until<F, Fut, E>(&self, mut step: F) -> Result<WaitOutcome, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let started = Instant::now();
        loop {
            if self.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }

            if step().await? {
                return Ok(WaitOutcome::Ready);
            }

            if let Some(timeout) = self.policy.timeout {
                if started.elapsed() >= timeout {
                    return Ok(WaitOutcome::TimedOut);
                }
            }

            if !self.tick().await {
                return Ok(WaitOutcome::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(timeout: Option<Duration>) -> WaitPolicy {
        WaitPolicy {
            tick: Duration::from_millis(5),
            timeout,
        }
    }

    #[tokio::test]
    async fn test_until_ready_after_ticks() {
        let (_handle, cancel) = cancellation();
        let waiter = Waiter::new(policy(None), cancel);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let outcome: Result<WaitOutcome, ()> = waiter
            .until(|| {
                let counter = counter.clone();
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
            })
            .await;

        assert_eq!(outcome, Ok(WaitOutcome::Ready));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_until_timed_out() {
        let (_handle, cancel) = cancellation();
        let waiter = Waiter::new(policy(Some(Duration::from_millis(20))), cancel);

        let outcome: Result<WaitOutcome, ()> = waiter.until(|| async { Ok(false) }).await;
        assert_eq!(outcome, Ok(WaitOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_until_cancelled() {
        let (handle, cancel) = cancellation();
        let waiter = Waiter::new(policy(None), cancel);

        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let outcome: Result<WaitOutcome, ()> = waiter.until(|| async { Ok(false) }).await;
        assert_eq!(outcome, Ok(WaitOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_until_propagates_error() {
        let (_handle, cancel) = cancellation();
        let waiter = Waiter::new(policy(None), cancel);

        let outcome: Result<WaitOutcome, String> =
            waiter.until(|| async { Err("boom".to_string()) }).await;
        assert_eq!(outcome, Err("boom".to_string()));
    }
}
