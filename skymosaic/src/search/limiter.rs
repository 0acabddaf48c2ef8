//! Process-wide admission limiter for upstream searches.
//!
//! The upstream quota is enforced per account, so every search call in the
//! process shares one limiter. It is created once by the service layer and
//! injected into each [`SearchClient`](super::SearchClient).
//!
//! # Usage
//!
//! ```ignore
//! let limiter = Arc::new(AdmissionLimiter::new(3));
//!
//! async fn search(limiter: Arc<AdmissionLimiter>) {
//!     let _permit = limiter.acquire().await?;
//!     // upstream call happens here...
//!     // permit is released when _permit goes out of scope
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Semaphore-backed cap on concurrent searches.
#[derive(Debug)]
pub struct AdmissionLimiter {
    semaphore: Semaphore,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of admitted calls
    in_flight: AtomicUsize,

    /// Peak concurrent calls observed
    peak_in_flight: AtomicUsize,
}

impl AdmissionLimiter {
    /// Creates a limiter admitting `max_concurrent` calls at once.
    ///
    /// A value of 0 is raised to 1 so the limiter can never deadlock.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot.
    ///
    /// Callers bound the wait with their own deadline; the future is cancel
    /// safe and leaves no slot behind when dropped.
    pub async fn acquire(&self) -> Result<AdmissionPermit<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;
        Ok(self.admit(permit))
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit<'_>> {
        let permit = self.semaphore.try_acquire().ok()?;
        Some(self.admit(permit))
    }

    fn admit<'a>(&'a self, permit: SemaphorePermit<'a>) -> AdmissionPermit<'a> {
        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        AdmissionPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held admission slot, released on drop.
pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
