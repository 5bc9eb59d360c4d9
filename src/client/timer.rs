//! Cancellable one-shot timers.
//!
//! A [`Timer`] runs its callback once after a delay unless it is dropped
//! first. Each timer carries a unique token; the owner stores the timer and
//! the callback re-checks the token under the owner's lock, so a timer that
//! woke up just before being cancelled still cannot act.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Pending one-shot timer. Dropping it cancels it.
#[derive(Debug)]
pub(crate) struct Timer {
    token: u64,
    handle: JoinHandle<()>,
}

impl Timer {
    /// Schedules `fire` to run with this timer's token after `delay`.
    pub(crate) fn spawn<F>(runtime: &Handle, delay: Duration, fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let handle = runtime.spawn(async move {
            sleep(delay).await;
            fire(token);
        });

        Self { token, handle }
    }

    #[inline]
    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    /// Returns `true` until the timer has fired or been cancelled.
    #[inline]
    pub(crate) fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use tokio::time::advance;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = Timer::spawn(&Handle::current(), Duration::from_secs(5), move |_| {
            flag.store(true, Ordering::SeqCst);
        });

        advance(Duration::from_millis(4999)).await;
        settle().await;
        assert!(!fired.load(Ordering::SeqCst));

        advance(Duration::from_millis(1)).await;
        settle().await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = Timer::spawn(&Handle::current(), Duration::from_secs(1), move |_| {
            flag.store(true, Ordering::SeqCst);
        });

        drop(timer);
        advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let a = Timer::spawn(&Handle::current(), Duration::from_secs(60), |_| {});
        let b = Timer::spawn(&Handle::current(), Duration::from_secs(60), |_| {});
        assert_ne!(a.token(), b.token());
    }
}
