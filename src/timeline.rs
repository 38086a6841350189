// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Assemble bounded record chains and derive the boot summary markers.
// Author: Lukas Bower

//! Timeline assembly.
//!
//! A [`Timeline`] owns two [`RecordChain`]s: the primary chain shared by the
//! bootloader and kernel readers, and the independent co-processor chain.
//! Each chain carries its own running "previous timestamp" so deltas are
//! continuous across readers without any global state.

use serde::Serialize;

use crate::error::TimelineError;
use crate::stage::marker;

/// One observed boot-stage event on a millisecond timeline anchored at power-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootRecord {
    /// Resolved stage or profile name.
    pub name: String,
    /// Milliseconds since power-on.
    pub start_time: u64,
    /// Milliseconds since the previous record in the same chain.
    pub delta_time: u64,
}

/// Ordered, capacity-bounded record sequence with its own delta counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChain {
    records: Vec<BootRecord>,
    previous: u64,
    capacity: usize,
}

impl RecordChain {
    /// Create an empty chain that accepts at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity.min(crate::config::RECORD_CAPACITY)),
            previous: 0,
            capacity,
        }
    }

    /// Append a record at `start_time` ms, deriving its delta from the chain state.
    ///
    /// A previous timestamp of 0 means the chain has no predecessor yet and
    /// yields a zero delta. Timestamps that go backwards saturate to zero.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        start_time: u64,
    ) -> Result<&BootRecord, TimelineError> {
        if self.records.len() >= self.capacity {
            return Err(TimelineError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let delta_time = if self.previous == 0 {
            0
        } else {
            start_time.saturating_sub(self.previous)
        };
        self.previous = start_time;
        self.records.push(BootRecord {
            name: name.into(),
            start_time,
            delta_time,
        });
        Ok(&self.records[self.records.len() - 1])
    }

    /// Borrow the records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[BootRecord] {
        &self.records
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the chain holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records accepted.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records that can still be appended.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.records.len())
    }

    /// Timestamp of the most recent record, or 0 when the chain is fresh.
    #[must_use]
    pub fn previous(&self) -> u64 {
        self.previous
    }
}

/// Marker timestamps and record counts collected during assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootSummary {
    /// Bootloader start marker (end of SPL), ms.
    pub spl_start_time: u64,
    /// Bootloader-to-kernel handoff marker, ms.
    pub bootloader_end_time: u64,
    /// First kernel tracker point after the handoff, ms.
    pub kernel_start_time: u64,
    /// Latest kernel tracker point after kernel start, ms.
    pub kernel_end_time: u64,
    /// Co-processor start marker, ms.
    pub secondary_start_time: u64,
    /// Records in the primary chain.
    pub primary_count: usize,
    /// Records in the co-processor chain.
    pub secondary_count: usize,
}

/// Summary intervals, each clamped at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootDurations {
    /// Power-on to SPL; no earlier marker exists.
    pub power_on: u64,
    /// SPL duration.
    pub spl: u64,
    /// Bootloader duration.
    pub bootloader: u64,
    /// Bootloader handoff to first kernel tracker point.
    pub handoff: u64,
    /// Kernel duration.
    pub kernel: u64,
    /// Power-on to last kernel tracker point.
    pub total: u64,
}

impl BootSummary {
    /// Derive the report intervals from the collected markers.
    #[must_use]
    pub fn durations(&self) -> BootDurations {
        BootDurations {
            power_on: 0,
            spl: self.spl_start_time,
            bootloader: self.bootloader_end_time.saturating_sub(self.spl_start_time),
            handoff: self.kernel_start_time.saturating_sub(self.bootloader_end_time),
            kernel: self.kernel_end_time.saturating_sub(self.kernel_start_time),
            total: self.kernel_end_time,
        }
    }
}

/// Owner of both record chains and the marker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    primary: RecordChain,
    secondary: RecordChain,
    markers: BootSummary,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(crate::config::RECORD_CAPACITY)
    }
}

impl Timeline {
    /// Create an empty timeline whose chains each hold up to `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            primary: RecordChain::with_capacity(capacity),
            secondary: RecordChain::with_capacity(capacity),
            markers: BootSummary::default(),
        }
    }

    /// Bootloader and kernel records.
    #[must_use]
    pub fn primary(&self) -> &RecordChain {
        &self.primary
    }

    /// Co-processor records.
    #[must_use]
    pub fn secondary(&self) -> &RecordChain {
        &self.secondary
    }

    /// Snapshot of markers with current record counts.
    #[must_use]
    pub fn summary(&self) -> BootSummary {
        BootSummary {
            primary_count: self.primary.len(),
            secondary_count: self.secondary.len(),
            ..self.markers
        }
    }

    pub(crate) fn primary_mut(&mut self) -> &mut RecordChain {
        &mut self.primary
    }

    pub(crate) fn secondary_mut(&mut self) -> &mut RecordChain {
        &mut self.secondary
    }

    /// Latch a bootloader marker if `id` is one; last occurrence wins.
    pub(crate) fn latch_bootloader_marker(&mut self, id: i64, time_ms: u64) {
        match id {
            marker::START_UBOOT => self.markers.spl_start_time = time_ms,
            marker::BOOTM_HANDOFF => self.markers.bootloader_end_time = time_ms,
            marker::START_MCU => self.markers.secondary_start_time = time_ms,
            _ => {}
        }
    }

    /// Track kernel start/end from an accepted kernel log record.
    pub(crate) fn observe_kernel_record(&mut self, first: bool, time_ms: u64) {
        if first {
            if time_ms > self.markers.bootloader_end_time {
                self.markers.kernel_start_time = time_ms;
            }
        } else if time_ms > self.markers.kernel_start_time {
            self.markers.kernel_end_time = self.markers.kernel_end_time.max(time_ms);
        }
    }

    pub(crate) fn secondary_start_time(&self) -> u64 {
        self.markers.secondary_start_time
    }
}
