//! Error latch / cancellation token
//!
//! One token is shared by every worker of a workload. The first worker to
//! hit an unexpected error trips it; siblings observe the trip at their next
//! state-transition boundary and stop. Tripping is sticky and only the first
//! reason is kept.
//!
//! Blocking code can wait on the token (`wait_timeout`) instead of polling.

use fsm_core::{HarnessError, HarnessResult, Tid};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a token was tripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// Worker that tripped the token, if it was a worker
    pub tid: Option<Tid>,
    /// Human readable cause
    pub message: String,
}

impl CancelReason {
    /// Reason raised by worker `tid`
    pub fn worker(tid: Tid, message: impl Into<String>) -> Self {
        CancelReason {
            tid: Some(tid),
            message: message.into(),
        }
    }

    /// Reason raised outside any worker
    pub fn external(message: impl Into<String>) -> Self {
        CancelReason {
            tid: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tid {
            Some(tid) => write!(f, "tid {}: {}", tid, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tripped: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
    signal: Condvar,
}

/// Shared cancellation token
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create an untripped token
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token
    ///
    /// Returns `true` if this call tripped it, `false` if it already was.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let mut slot = self.inner.reason.lock();
        if slot.is_some() {
            return false;
        }
        tracing::debug!(reason = %reason, "cancellation requested");
        *slot = Some(reason);
        self.inner.tripped.store(true, Ordering::Release);
        self.inner.signal.notify_all();
        true
    }

    /// Whether the token has been tripped
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.tripped.load(Ordering::Acquire)
    }

    /// The first reason, once tripped
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason.lock().clone()
    }

    /// `Err(Cancelled)` once tripped
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Cancelled`] carrying the trip reason.
    pub fn check(&self) -> HarnessResult<()> {
        if !self.is_cancelled() {
            return Ok(());
        }
        let reason = self
            .reason()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "cancelled".to_string());
        Err(HarnessError::Cancelled(reason))
    }

    /// Block until tripped or `timeout` elapses
    ///
    /// Returns `true` if the token was tripped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.inner.reason.lock();
        while slot.is_none() {
            if self.inner.signal.wait_until(&mut slot, deadline).timed_out() {
                return slot.is_some();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        assert!(token.cancel(CancelReason::worker(3, "first")));
        assert!(!token.cancel(CancelReason::worker(1, "second")));
        assert_eq!(token.reason().unwrap().tid, Some(3));
        assert_eq!(token.reason().unwrap().message, "first");
    }

    #[test]
    fn test_check_reports_reason() {
        let token = CancellationToken::new();
        token.cancel(CancelReason::external("suite aborted"));
        match token.check() {
            Err(HarnessError::Cancelled(msg)) => assert_eq!(msg, "suite aborted"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel(CancelReason::worker(0, "x"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_wait_wakes_on_cancel() {
        let token = CancellationToken::new();
        let t = token.clone();
        let waiter = thread::spawn(move || t.wait_timeout(Duration::from_secs(10)));
        thread::sleep(Duration::from_millis(10));
        token.cancel(CancelReason::external("stop"));
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_wait_times_out() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(CancelReason::worker(2, "boom").to_string(), "tid 2: boom");
        assert_eq!(CancelReason::external("boom").to_string(), "boom");
    }
}
