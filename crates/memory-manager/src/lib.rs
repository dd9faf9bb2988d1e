// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Staging memory for model images on their way to an ML device.
//!
//! # Key Components
//!
//! - [`MemoryBudget`] — a hard ceiling on outstanding staged bytes, with
//!   human-readable parsing (`"512M"`, `"1G"`, etc.).
//! - [`StagingPool`] — the allocator: enforces the budget, honours the
//!   device's minimum alignment, and counts allocations and releases.
//! - [`StagingBuffer`] — an RAII guard around one aligned buffer. Dropping
//!   it returns the bytes to the budget.
//! - [`AllocationStats`] — cumulative counters (peak usage, releases, OOMs).
//!
//! # Ownership Model
//!
//! ```text
//! StagingPool::allocate(len, align)
//!       │
//!       ▼
//!   StagingBuffer  ◄─── owns Vec<u8>, holds Arc<PoolInner>
//!       │
//!       │  drop()
//!       ▼
//!   PoolInner::release()  ──► budget + stats
//! ```
//!
//! # Example
//! ```
//! use memory_manager::{MemoryBudget, StagingPool};
//!
//! let pool = StagingPool::new(MemoryBudget::from_mb(64));
//!
//! let image = pool.allocate(4096, 256).unwrap();
//! assert_eq!(pool.allocated_bytes(), 4096);
//!
//! drop(image);
//! assert_eq!(pool.allocated_bytes(), 0);
//! ```

mod budget;
mod error;
mod guard;
mod pool;
mod stats;

pub use budget::MemoryBudget;
pub use error::MemoryError;
pub use guard::StagingBuffer;
pub use pool::StagingPool;
pub use stats::AllocationStats;
