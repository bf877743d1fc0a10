//! Fail-fast flush lock and the bounded sync retry.
//!
//! A flush moves the coordinator from `Idle` to `Flushing` with an atomic
//! test-and-set. A second flush arriving in the meantime gets
//! [`FileError::Locked`] right away; there is no queue. The returned
//! [`FlushGuard`] puts the coordinator back to `Idle` when dropped, on every path.

use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::core::Result;
use crate::error::FileError;
use crate::options::RetryPolicy;

#[derive(Debug, Default)]
pub struct FlushCoordinator {
    flushing: AtomicBool,
    last_flush: Mutex<Option<SystemTime>>,
}

impl FlushCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the `Flushing` state, or fails with `Locked` if another flush holds it.
    pub fn try_begin(&self, path: &Path) -> Result<FlushGuard<'_>> {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(path = %path.display(), "flush rejected: already flushing");
            return Err(FileError::Locked {
                path: path.to_path_buf(),
            });
        }
        Ok(FlushGuard { coordinator: self })
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Time of the last completed flush.
    pub fn last_flush(&self) -> Option<SystemTime> {
        *self
            .last_flush
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Proof that the holder is the only flush in progress.
#[derive(Debug)]
pub struct FlushGuard<'a> {
    coordinator: &'a FlushCoordinator,
}

impl FlushGuard<'_> {
    /// Runs `sync` until it succeeds or the policy is exhausted, sleeping with
    /// exponential backoff between attempts.
    pub fn sync_with_retry<F>(&self, path: &Path, policy: &RetryPolicy, mut sync: F) -> Result<()>
    where
        F: FnMut() -> io::Result<()>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match sync() {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= max_attempts => {
                    return Err(FileError::Sync {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        path = %path.display(),
                        attempt,
                        max_attempts,
                        error = %e,
                        ?delay,
                        "sync failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Records the flush timestamp and releases the lock.
    pub fn complete(self) -> SystemTime {
        let now = SystemTime::now();
        *self
            .coordinator
            .last_flush
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(now);
        now
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.flushing.store(false, Ordering::Release);
    }
}
