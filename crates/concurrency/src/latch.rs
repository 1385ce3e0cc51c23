//! Countdown latch
//!
//! Used to line worker threads up at a start barrier: every worker counts
//! down once it is ready, then waits for the count to reach zero so that
//! all of them issue their first operation at roughly the same time.
//!
//! Unlike `std::sync::Barrier`, a latch can be counted down by a party that
//! never waits (a worker that failed to spawn, or a guard dropped during a
//! panic), so a missing worker can never strand the others.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A one-shot latch released when its count reaches zero
#[derive(Debug)]
pub struct CountdownLatch {
    count: Mutex<usize>,
    released: Condvar,
}

impl CountdownLatch {
    /// Create a latch expecting `count` arrivals
    pub fn new(count: usize) -> Self {
        CountdownLatch {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Record one arrival; releases waiters when the count reaches zero
    ///
    /// Counting down an already released latch is a no-op.
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.released.notify_all();
        }
    }

    /// Remaining arrivals
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.released.wait(&mut count);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses
    ///
    /// Returns `true` if the latch was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.released.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Guard that counts down exactly once, at the latest when dropped
    pub fn arrival(&self) -> Arrival<'_> {
        Arrival {
            latch: self,
            done: false,
        }
    }
}

/// Pending arrival at a [`CountdownLatch`]
///
/// Dropping the guard without calling [`Arrival::arrive_and_wait`] still
/// counts down, so an early return or a panic releases the other parties.
#[derive(Debug)]
pub struct Arrival<'a> {
    latch: &'a CountdownLatch,
    done: bool,
}

impl Arrival<'_> {
    /// Count down and wait for everyone else
    pub fn arrive_and_wait(mut self) {
        self.done = true;
        self.latch.count_down();
        self.latch.wait();
    }
}

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.latch.count_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_count_is_released() {
        let latch = CountdownLatch::new(0);
        latch.wait();
        assert!(latch.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_count_down_saturates() {
        let latch = CountdownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let latch = CountdownLatch::new(1);
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_all_threads_pass_together() {
        let n = 8;
        let latch = Arc::new(CountdownLatch::new(n));
        let passed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let latch = Arc::clone(&latch);
                let passed = Arc::clone(&passed);
                thread::spawn(move || {
                    latch.arrival().arrive_and_wait();
                    passed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(passed.load(Ordering::SeqCst), n);
    }

    #[test]
    fn test_dropped_arrival_counts_down() {
        let latch = CountdownLatch::new(2);
        {
            let _arrival = latch.arrival();
        }
        assert_eq!(latch.count(), 1);
        latch.arrival().arrive_and_wait();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_panicking_party_releases_others() {
        let latch = Arc::new(CountdownLatch::new(2));
        let l = Arc::clone(&latch);
        let panicker = thread::spawn(move || {
            let _arrival = l.arrival();
            panic!("boom");
        });
        assert!(panicker.join().is_err());
        latch.arrival().arrive_and_wait();
    }
}
