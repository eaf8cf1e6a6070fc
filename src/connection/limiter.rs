//! Active-Connection Accounting
//!
//! Bounds how many client connections are served at once. A worker must
//! hold a [`ClientPermit`] for its whole lifetime; when the gauge is at
//! capacity, the accept path closes the new socket immediately instead of
//! queueing it. The current count also feeds the `connected_clients` line
//! of `INFO`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Atomic gauge of active connections with a hard upper bound.
#[derive(Debug)]
pub struct ClientLimiter {
    active: AtomicUsize,
    max: usize,
}

impl ClientLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserves one slot, or returns `None` when the server is saturated.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ClientPermit> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| ClientPermit {
                limiter: Arc::clone(self),
            })
    }

    /// Number of currently held permits.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// The configured connection bound.
    pub fn capacity(&self) -> usize {
        self.max
    }
}

/// RAII slot reservation; dropping it releases the slot.
#[derive(Debug)]
pub struct ClientPermit {
    limiter: Arc<ClientLimiter>,
}

impl Drop for ClientPermit {
    fn drop(&mut self) {
        self.limiter.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_are_bounded_and_released() {
        let limiter = Arc::new(ClientLimiter::new(2));

        let first = limiter.try_acquire().unwrap();
        let second = limiter.try_acquire().unwrap();
        assert_eq!(limiter.active(), 2);
        assert!(limiter.try_acquire().is_none());

        drop(first);
        assert_eq!(limiter.active(), 1);
        let _third = limiter.try_acquire().unwrap();

        drop(second);
        assert_eq!(limiter.active(), 1);
    }
}
