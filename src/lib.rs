// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Library root for the boot time report: bootstage decoding, kernel log parsing and rendering.
// Author: Lukas Bower
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Boot timeline reconstruction.
//!
//! The preserved U-Boot bootstage region and the kernel `[BOOT TRACKER]`
//! log lines are merged into millisecond record chains anchored at power-on,
//! from which the summary intervals of a boot are derived.

pub mod bootstage;
pub mod capture;
pub mod config;
pub mod error;
pub mod kernel_log;
pub mod report;
pub mod stage;
pub mod timeline;

pub use bootstage::{read_bootstage, BootstageHeader, BootstageImage};
pub use capture::{DevMem, MemorySource, SnapshotFile};
pub use config::{BootstageLayout, ReportConfig};
pub use error::{
    BootstageError, CaptureError, ConfigError, LogSourceError, ReportError, TimelineError,
};
pub use kernel_log::{read_kernel_log, KernelLogStats};
pub use report::{ReportContext, TimelineReport};
pub use timeline::{BootDurations, BootRecord, BootSummary, RecordChain, Timeline};
