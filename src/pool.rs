//! Shared bounded worker pool for metadata I/O, plus cooperative
//! cancellation.
//!
//! The planner fans manifest reads out over this pool and joins once;
//! everything else in the crate runs on the caller's thread. Results come
//! back in submission order, so parallelism never leaks into plan output.

use crate::error::Result;
use crate::Error;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A bounded thread pool shared by all scans of a store.
pub struct IoPool {
    pool: rayon::ThreadPool,
}

impl IoPool {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("tidestore-io-{i}"))
            .build()
            .map_err(|e| Error::Io(format!("failed to build io pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Maps `op` over `items` on the pool and returns results in input
    /// order. The first error wins; remaining in-flight items may still
    /// complete before the join.
    pub fn run_ordered<I, T, F>(&self, items: Vec<I>, op: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Send + Sync,
    {
        self.pool
            .install(|| items.into_par_iter().map(op).collect::<Result<Vec<T>>>())
    }
}

/// Cooperative cancellation flag, checked between units of I/O. In-flight
/// reads may complete before observing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the token has been tripped.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
