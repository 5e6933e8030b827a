// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Bounded object pool for expression results.

Backed by a lock-free `ArrayQueue`, so worker threads in the parallel tier
can acquire and release concurrently. An empty pool allocates, a full pool
drops the returned item. Neither case is an error.
*/

use std::sync::atomic::{AtomicU64, Ordering};

use chimera_genetics::TraitExpressionResult;
use crossbeam::queue::ArrayQueue;
use serde::Serialize;

/// Types that can be recycled through an [`ObjectPool`]
pub trait Poolable: Default + Send {
    /// Restore the value to a blank state before reuse
    fn reset(&mut self);
}

impl Poolable for TraitExpressionResult {
    fn reset(&mut self) {
        TraitExpressionResult::reset(self);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolMetrics {
    pub capacity: usize,
    pub available: usize,
    pub created: u64,
    pub reused: u64,
    pub returned: u64,
    pub dropped: u64,
}

pub struct ObjectPool<T: Poolable> {
    queue: ArrayQueue<T>,
    created: AtomicU64,
    reused: AtomicU64,
    returned: AtomicU64,
    dropped: AtomicU64,
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Pool with `prewarm` instances already allocated
    pub fn with_prewarm(capacity: usize, prewarm: usize) -> Self {
        let pool = Self::new(capacity);
        pool.prewarm(prewarm);
        pool
    }

    /// Allocate up to `count` instances into the pool
    pub fn prewarm(&self, count: usize) {
        for _ in 0..count {
            if self.queue.push(T::default()).is_err() {
                break;
            }
            self.created.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Recycled instance if one is available, a fresh one otherwise
    pub fn get(&self) -> T {
        match self.queue.pop() {
            Some(item) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    /// Reset and enqueue `item`, or drop it when the pool is full
    pub fn put(&self, mut item: T) {
        item.reset();
        match self.queue.push(item) {
            Ok(()) => {
                self.returned.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            capacity: self.queue.capacity(),
            available: self.queue.len(),
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
