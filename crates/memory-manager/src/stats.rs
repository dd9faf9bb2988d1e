// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Staging statistics.
//!
//! [`AllocationStats`] counts every staging buffer handed out and every
//! buffer released, so callers can check that no load attempt leaked or
//! double-released its image buffer.

/// Cumulative counters for a [`StagingPool`](crate::StagingPool).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Successful allocations.
    pub total_allocations: u64,
    /// Buffers returned to the pool (guards dropped).
    pub total_releases: u64,
    /// Requests refused because the budget was exhausted.
    pub oom_count: u64,
    /// High-water mark of outstanding staged bytes.
    pub peak_allocated_bytes: usize,
    /// Sum of all successfully staged bytes.
    pub cumulative_allocated_bytes: u64,
}

impl AllocationStats {
    /// Buffers handed out and not yet released.
    pub fn outstanding(&self) -> u64 {
        self.total_allocations.saturating_sub(self.total_releases)
    }

    /// `outstanding_bytes` is the pool level after this allocation.
    pub(crate) fn record_allocation(&mut self, size: usize, outstanding_bytes: usize) {
        self.total_allocations += 1;
        self.cumulative_allocated_bytes += size as u64;
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(outstanding_bytes);
    }

    pub(crate) fn record_release(&mut self) {
        self.total_releases += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_allocated_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Staging: {} allocations, {} releases, {} outstanding, {} OOMs, peak {:.2} MB",
            self.total_allocations,
            self.total_releases,
            self.outstanding(),
            self.oom_count,
            peak_mb,
        )
    }
}
