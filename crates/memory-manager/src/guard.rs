// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII staging buffer.
//!
//! A [`StagingBuffer`] holds one model image between the file read and the
//! device registration call. Dropping it returns its bytes to the pool's
//! budget, so every exit path out of a load attempt releases the buffer
//! exactly once.

use crate::pool::PoolInner;
use std::sync::Arc;

/// An aligned, budget-accounted byte buffer.
///
/// # Example
/// ```ignore
/// let mut buf = pool.allocate(image_len, info.min_align_size)?;
/// file.read_exact(buf.as_mut_slice())?;
/// device.register(buf.as_slice())?;
/// drop(buf);                 // bytes returned to the budget
/// ```
pub struct StagingBuffer {
    /// Backing storage, over-allocated by `align - 1` bytes.
    storage: Vec<u8>,
    /// Offset of the first aligned byte inside `storage`.
    offset: usize,
    len: usize,
    align: usize,
    pool: Arc<PoolInner>,
}

impl StagingBuffer {
    pub(crate) fn new(storage: Vec<u8>, offset: usize, len: usize, align: usize, pool: Arc<PoolInner>) -> Self {
        Self {
            storage,
            offset,
            len,
            align,
            pool,
        }
    }

    /// Returns the aligned contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    /// Returns the aligned contents mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    /// Length in bytes, excluding alignment padding.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: the pool refuses zero-sized requests.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The alignment the buffer start honours.
    pub fn alignment(&self) -> usize {
        self.align
    }

    /// NUMA socket the owning pool is bound to, if any.
    pub fn socket_id(&self) -> Option<u32> {
        self.pool.socket_id()
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        self.pool.release(self.len);
    }
}

impl std::fmt::Debug for StagingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingBuffer")
            .field("len", &self.len)
            .field("align", &self.align)
            .field("socket_id", &self.socket_id())
            .finish()
    }
}
