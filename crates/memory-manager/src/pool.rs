// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budgeted staging pool.
//!
//! The [`StagingPool`] hands out [`StagingBuffer`]s sized to a model image
//! and aligned to the device's minimum alignment. It:
//!
//! 1. Enforces a hard ceiling on outstanding staged bytes. Requests that
//!    would exceed it return `Err(OutOfMemory)`.
//! 2. Records the NUMA socket the staged memory is meant for.
//! 3. Tracks allocation and release counts for leak checks.
//!
//! # Thread Safety
//! `StagingPool` is `Send + Sync`; one pool is shared by every model lane
//! of a device.

use crate::{AllocationStats, MemoryBudget, MemoryError, StagingBuffer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// State shared between the pool and its outstanding buffers.
pub(crate) struct PoolInner {
    budget: MemoryBudget,
    socket_id: Option<u32>,
    /// Bytes currently held by live buffers.
    allocated_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl PoolInner {
    /// Called by `StagingBuffer::drop`.
    pub(crate) fn release(&self, size_bytes: usize) {
        self.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release();
        }
        tracing::trace!(size_bytes, "staging buffer released");
    }

    pub(crate) fn socket_id(&self) -> Option<u32> {
        self.socket_id
    }
}

/// Allocator for model-image staging buffers.
///
/// # Example
/// ```
/// use memory_manager::{MemoryBudget, StagingPool};
///
/// let pool = StagingPool::new(MemoryBudget::from_mb(64));
///
/// let buf = pool.allocate(1000, 128).unwrap();
/// assert_eq!(buf.as_slice().as_ptr() as usize % 128, 0);
/// assert_eq!(pool.allocated_bytes(), 1000);
///
/// drop(buf);
/// assert_eq!(pool.allocated_bytes(), 0);
/// assert_eq!(pool.stats().total_releases, 1);
/// ```
pub struct StagingPool {
    inner: Arc<PoolInner>,
}

impl StagingPool {
    /// Creates a pool not bound to any socket.
    pub fn new(budget: MemoryBudget) -> Self {
        Self::with_socket(budget, None)
    }

    /// Creates a pool whose buffers are intended for `socket_id`.
    pub fn with_socket(budget: MemoryBudget, socket_id: Option<u32>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                socket_id,
                allocated_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// Allocates a zeroed buffer of exactly `size_bytes` whose start is a
    /// multiple of `align`.
    ///
    /// An `align` of 0 means no alignment requirement. Any other value must
    /// be a power of two.
    pub fn allocate(&self, size_bytes: usize, align: usize) -> Result<StagingBuffer, MemoryError> {
        if size_bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }
        let align = align.max(1);
        if !align.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment(align));
        }

        let budget = self.inner.budget.as_bytes();
        let reserved = self
            .inner
            .allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(size_bytes)
                    .filter(|&total| total <= budget)
            });

        let current = match reserved {
            Ok(previous) => previous + size_bytes,
            Err(current) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_oom();
                }
                tracing::warn!(size_bytes, current, budget, "staging budget exhausted");
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: budget.saturating_sub(current),
                    budget_bytes: budget,
                });
            }
        };

        let storage = match size_bytes.checked_add(align - 1).and_then(zeroed) {
            Some(storage) => storage,
            None => {
                let before = self.inner.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_oom();
                }
                tracing::warn!(size_bytes, align, "system allocator refused staging buffer");
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: budget.saturating_sub(before - size_bytes),
                    budget_bytes: budget,
                });
            }
        };
        let offset = storage.as_ptr().align_offset(align);
        if offset >= align {
            self.inner.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
            return Err(MemoryError::InvalidAlignment(align));
        }

        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_allocation(size_bytes, current);
        }
        tracing::debug!(size_bytes, align, socket = ?self.inner.socket_id, "staging buffer allocated");

        Ok(StagingBuffer::new(storage, offset, size_bytes, align, Arc::clone(&self.inner)))
    }

    /// Bytes held by live buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes.load(Ordering::Acquire)
    }

    /// Bytes remaining before the budget is hit.
    pub fn available_bytes(&self) -> usize {
        self.inner.budget.as_bytes().saturating_sub(self.allocated_bytes())
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    pub fn socket_id(&self) -> Option<u32> {
        self.inner.socket_id
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

/// Zero-filled vector of `len` bytes, or `None` if the allocator refuses.
fn zeroed(len: usize) -> Option<Vec<u8>> {
    let mut storage = Vec::new();
    storage.try_reserve_exact(len).ok()?;
    storage.resize(len, 0);
    Some(storage)
}

impl std::fmt::Debug for StagingPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingPool")
            .field("budget", &self.inner.budget)
            .field("socket_id", &self.inner.socket_id)
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_drop() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));

        let buf = pool.allocate(1024, 64).unwrap();
        assert_eq!(pool.allocated_bytes(), 1024);
        assert_eq!(buf.len(), 1024);

        drop(buf);
        assert_eq!(pool.allocated_bytes(), 0);
        let stats = pool.stats();
        assert_eq!(stats.total_allocations, 1);
        assert_eq!(stats.total_releases, 1);
    }

    #[test]
    fn test_alignment_honoured() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));
        for align in [1usize, 8, 64, 128, 4096] {
            let buf = pool.allocate(333, align).unwrap();
            assert_eq!(buf.as_slice().as_ptr() as usize % align, 0, "align {align}");
            assert_eq!(buf.as_slice().len(), 333);
            assert_eq!(buf.alignment(), align);
        }
    }

    #[test]
    fn test_zero_alignment_means_unaligned() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));
        let buf = pool.allocate(10, 0).unwrap();
        assert_eq!(buf.alignment(), 1);
    }

    #[test]
    fn test_invalid_alignment() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));
        let result = pool.allocate(16, 48);
        assert!(matches!(result, Err(MemoryError::InvalidAlignment(48))));
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_buffer_contents() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));

        let mut buf = pool.allocate(16, 8).unwrap();
        assert!(buf.as_slice().iter().all(|&b| b == 0));

        buf.as_mut_slice()[0] = 42;
        assert_eq!(buf.as_slice()[0], 42);
    }

    #[test]
    fn test_oom() {
        let pool = StagingPool::new(MemoryBudget::from_bytes(1024));

        let _a = pool.allocate(512, 1).unwrap();
        let _b = pool.allocate(512, 1).unwrap();

        let result = pool.allocate(1, 1);
        assert!(matches!(
            result,
            Err(MemoryError::OutOfMemory { available_bytes: 0, .. })
        ));
        assert_eq!(pool.stats().oom_count, 1);
    }

    #[test]
    fn test_budget_ignores_padding() {
        let pool = StagingPool::new(MemoryBudget::from_bytes(100));
        let _buf = pool.allocate(100, 4096).unwrap();
        assert_eq!(pool.available_bytes(), 0);
    }

    #[test]
    fn test_zero_allocation() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));
        let result = pool.allocate(0, 64);
        assert!(matches!(result, Err(MemoryError::ZeroSizedAllocation)));
        assert_eq!(pool.stats().total_allocations, 0);
    }

    #[test]
    fn test_stats_peak() {
        let pool = StagingPool::new(MemoryBudget::from_mb(1));

        let a = pool.allocate(1000, 1).unwrap();
        let b = pool.allocate(2000, 1).unwrap();
        drop(a);
        drop(b);

        let stats = pool.stats();
        assert_eq!(stats.peak_allocated_bytes, 3000);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_socket_binding() {
        let pool = StagingPool::with_socket(MemoryBudget::from_mb(1), Some(1));
        let buf = pool.allocate(8, 8).unwrap();
        assert_eq!(buf.socket_id(), Some(1));
        assert_eq!(pool.socket_id(), Some(1));
    }

    #[test]
    fn test_concurrent_allocations_respect_budget() {
        let pool = Arc::new(StagingPool::new(MemoryBudget::from_bytes(4096)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if let Ok(buf) = pool.allocate(1024, 64) {
                            assert!(pool.allocated_bytes() <= 4096);
                            drop(buf);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.allocated_bytes(), 0);
        let stats = pool.stats();
        assert_eq!(stats.total_allocations, stats.total_releases);
    }

    #[test]
    fn test_debug_format() {
        let pool = StagingPool::new(MemoryBudget::from_mb(64));
        let debug = format!("{pool:?}");
        assert!(debug.contains("StagingPool"));
        assert!(debug.contains("budget"));
    }

    #[test]
    fn test_oversized_request_is_out_of_memory() {
        let pool = StagingPool::new(MemoryBudget::from_bytes(usize::MAX));

        // Padding for alignment overflows usize.
        let err = pool.allocate(usize::MAX - 8, 64).unwrap_err();
        assert!(matches!(err, MemoryError::OutOfMemory { requested_bytes, .. } if requested_bytes == usize::MAX - 8));

        // Fits in usize but no allocator can satisfy it.
        let err = pool.allocate(usize::MAX / 2 + 1, 1).unwrap_err();
        assert!(matches!(err, MemoryError::OutOfMemory { .. }));

        assert_eq!(pool.allocated_bytes(), 0);
        let stats = pool.stats();
        assert_eq!(stats.oom_count, 2);
        assert_eq!(stats.total_allocations, 0);

        let buf = pool.allocate(4096, 64).unwrap();
        assert_eq!(buf.len(), 4096);
    }
}
