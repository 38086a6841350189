// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error taxonomy for capture, bootstage decoding, timeline assembly and log reading.
// Author: Lukas Bower

//! Error types shared across the boot timeline report.

use std::io;
use std::path::PathBuf;

/// Failures while copying the bootstage region out of physical memory.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The memory device or its mapping was refused by the kernel.
    #[error("access denied to {}: {source}", .path.display())]
    AccessDenied {
        /// Device or snapshot path that was refused.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The region could not be mapped or read.
    #[error("failed to map {len:#x} bytes at {address:#x} from {}: {source}", .path.display())]
    MapFailed {
        /// Device or snapshot path.
        path: PathBuf,
        /// Physical address requested.
        address: u64,
        /// Number of bytes requested.
        len: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Failures while decoding the bootstage binary layout.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum BootstageError {
    /// Header magic did not match or the advertised size was zero.
    #[error("invalid bootstage header: magic={magic:#010x}, size={size:#x}")]
    InvalidHeader {
        /// Magic value found in the header.
        magic: u32,
        /// Data size advertised by the header.
        size: u32,
    },
    /// A field read would run past the end of the captured buffer.
    #[error("truncated bootstage buffer: need {needed} bytes at offset {offset:#x}, have {available}")]
    TruncatedBuffer {
        /// Offset of the field that could not be read.
        offset: usize,
        /// Width of the field in bytes.
        needed: usize,
        /// Total bytes available in the buffer.
        available: usize,
    },
}

/// Failures while appending to a record chain.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum TimelineError {
    /// The chain already holds its maximum number of records.
    #[error("record chain capacity {capacity} exceeded")]
    CapacityExceeded {
        /// Maximum number of records the chain accepts.
        capacity: usize,
    },
}

/// Failures while opening or reading the kernel log.
#[derive(Debug, thiserror::Error)]
pub enum LogSourceError {
    /// The log file does not exist.
    #[error("kernel log {} not found", .0.display())]
    NotFound(PathBuf),
    /// The log file exists but could not be read.
    #[error("failed to read kernel log {}: {source}", .path.display())]
    Io {
        /// Log path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl LogSourceError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Failures while loading the report configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for the expected schema.
    #[error("invalid config TOML in {}: {source}", .path.display())]
    Parse {
        /// Config path.
        path: PathBuf,
        /// TOML decode error.
        #[source]
        source: toml::de::Error,
    },
    /// The resulting configuration is inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Aggregate error returned by the report pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Memory capture failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// Bootstage decoding failed.
    #[error(transparent)]
    Bootstage(#[from] BootstageError),
    /// A record chain reached capacity.
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    /// Kernel log could not be read.
    #[error(transparent)]
    LogSource(#[from] LogSourceError),
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
