//! # Lock: a non-owned signaling primitive for cooperative tasks.
//!
//! [`Lock`] lets one cooperative task signal completion to another that is
//! waiting, with bounded waits and non-blocking `try` semantics. It pairs a
//! `locked` flag with a single-slot channel carrying one boolean release
//! token.
//!
//! ## Rules
//! - **Not a mutex.** There is no ownership tracking: any task may lock or
//!   unlock. Pairing lock/unlock with exactly one logical holder is a usage
//!   convention, not a guarantee.
//! - **Never fails fatally.** Every error path degrades to a boolean or a
//!   [`WaitOutcome`]; the primitive is usable inside paths that must not
//!   return errors.
//! - **Single consumer.** The release channel is meant for one waiter (the
//!   controller's wait loop).
//!
//! ## Flow
//! ```text
//! holder                    waiter
//!   try_lock() ─► true        │
//!   ... work ...              wait(1s) ─► TimedOut   (re-check, wait again)
//!   unlock() ──── token ────► wait(1s) ─► Released
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time;

/// Result of a bounded [`Lock::wait`].
///
/// Makes explicit why the wait stopped, so callers never have to guess
/// between "timed out" and "actually unlocked".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The lock was not locked; there was nothing to wait for.
    NotLocked,
    /// A release token arrived before the deadline.
    Released,
    /// The deadline elapsed. The lock state may have changed concurrently;
    /// re-check [`Lock::is_locked`] and decide whether to wait again.
    TimedOut,
}

/// Binary synchronization primitive for cooperative tasks.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use servitor::Lock;
///
/// let lock = Lock::new(Duration::from_secs(1));
/// assert!(lock.try_lock());
/// assert!(!lock.try_lock()); // already held
/// assert!(lock.is_locked());
/// ```
pub struct Lock {
    /// Holder flag. True only while one logical holder is active.
    locked: AtomicBool,
    /// Deadline for publishing the release token on unlock.
    release_timeout: Duration,
    tx: mpsc::Sender<bool>,
    rx: Mutex<mpsc::Receiver<bool>>,
}

impl Lock {
    /// Creates an unlocked lock.
    ///
    /// `release_timeout` bounds how long [`unlock`](Lock::unlock) waits for a
    /// receiver before giving up silently.
    pub fn new(release_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            locked: AtomicBool::new(false),
            release_timeout,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Returns true if this lock is currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Tries to acquire the lock.
    ///
    /// Succeeds only if not already locked. Never blocks.
    pub fn try_lock(&self) -> bool {
        if self
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // A token published after the last waiter left would wake the next
        // wait() before this holder releases; drain it.
        if let Ok(mut rx) = self.rx.try_lock() {
            while rx.try_recv().is_ok() {}
        }
        true
    }

    /// Releases a previously acquired lock.
    ///
    /// Clears the flag and publishes a release token, waiting up to the
    /// configured release timeout. A publish that times out is still a
    /// successful unlock: an unlock with no waiter is a normal race. A closed
    /// release channel reports a failed unlock (the flag is already cleared
    /// at that point, so the lock still reads unlocked).
    pub async fn unlock(&self) -> bool {
        if self
            .locked
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        match self.tx.send_timeout(true, self.release_timeout).await {
            Ok(()) => true,
            // No one listening. Its okay.
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => true,
            Err(mpsc::error::SendTimeoutError::Closed(_)) => false,
        }
    }

    /// Waits for the lock to be released, up to `deadline`.
    ///
    /// Returns [`WaitOutcome::NotLocked`] immediately when there is nothing
    /// to wait for. Otherwise blocks cooperatively until a release token
    /// arrives ([`WaitOutcome::Released`]) or the deadline elapses
    /// ([`WaitOutcome::TimedOut`]). After a timeout the method yields once so
    /// the holder gets a chance to make progress before the caller retries.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use servitor::{Lock, WaitOutcome};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let lock = Lock::new(Duration::from_secs(1));
    /// assert_eq!(lock.wait(Duration::from_secs(1)).await, WaitOutcome::NotLocked);
    /// # }
    /// ```
    pub async fn wait(&self, deadline: Duration) -> WaitOutcome {
        if !self.is_locked() {
            return WaitOutcome::NotLocked;
        }
        let mut rx = self.rx.lock().await;
        match time::timeout(deadline, rx.recv()).await {
            Ok(Some(_released)) => WaitOutcome::Released,
            // Sender gone; degrade to a timeout and let the caller re-check.
            Ok(None) => WaitOutcome::TimedOut,
            Err(_elapsed) => {
                drop(rx);
                tokio::task::yield_now().await;
                WaitOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> Lock {
        Lock::new(Duration::from_millis(100))
    }

    #[test]
    fn test_try_lock_then_try_lock_fails() {
        let l = lock();
        assert!(l.try_lock());
        assert!(!l.try_lock());
        assert!(l.is_locked());
    }

    #[tokio::test]
    async fn test_unlock_without_lock_fails() {
        let l = lock();
        assert!(!l.unlock().await);
    }

    #[tokio::test]
    async fn test_unlock_after_lock_succeeds_once() {
        let l = lock();
        assert!(l.try_lock());
        assert!(l.unlock().await);
        assert!(!l.is_locked());
        assert!(!l.unlock().await);
    }

    #[tokio::test]
    async fn test_wait_on_unlocked_returns_not_locked() {
        let l = lock();
        assert_eq!(l.wait(Duration::from_secs(5)).await, WaitOutcome::NotLocked);
    }

    #[tokio::test]
    async fn test_wait_times_out_while_held() {
        let l = lock();
        assert!(l.try_lock());
        assert_eq!(l.wait(Duration::from_millis(20)).await, WaitOutcome::TimedOut);
        assert!(l.is_locked());
    }

    #[tokio::test]
    async fn test_wait_observes_concurrent_unlock() {
        let l = std::sync::Arc::new(lock());
        assert!(l.try_lock());

        let holder = std::sync::Arc::clone(&l);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(holder.unlock().await);
        });

        assert_eq!(l.wait(Duration::from_secs(2)).await, WaitOutcome::Released);
        assert!(!l.is_locked());
    }

    #[tokio::test]
    async fn test_stale_token_is_drained_on_relock() {
        let l = lock();
        assert!(l.try_lock());
        // Unlock with no waiter buffers a token in the release channel.
        assert!(l.unlock().await);
        assert!(l.try_lock());
        // The stale token must not register as a release of the new holder.
        assert_eq!(l.wait(Duration::from_millis(20)).await, WaitOutcome::TimedOut);
        assert!(l.is_locked());
    }
}
