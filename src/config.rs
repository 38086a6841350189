// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Platform constants and optional TOML overrides for the boot time report.
// Author: Lukas Bower

//! Report configuration.
//!
//! The defaults are the platform constants of the reference board; a TOML
//! file may override any subset of them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Physical address of the preserved bootstage region.
pub const BOOTSTAGE_PRESERVED_ADDR: u64 = 0xA000_0000;
/// Size of the preserved bootstage region in bytes.
pub const BOOTSTAGE_SIZE: usize = 0x9_0000;
/// Offset of the co-processor section inside the region.
pub const MCU_BOOTSTAGE_START_OFFSET: usize = 0x8_0000;
/// Offset of the co-processor profile array relative to its section.
pub const MCU_BOOTRECORD_OFFSET: usize = 0x10;
/// Maximum records held by each chain.
pub const RECORD_CAPACITY: usize = 256;
/// Device used for physical memory capture.
pub const MEM_DEVICE: &str = "/dev/mem";
/// Kernel log scanned for `[BOOT TRACKER]` lines.
pub const KERNEL_LOG_PATH: &str = "/var/log/messages";
/// HTML report written next to the working directory.
pub const HTML_REPORT_PATH: &str = "boot_time_report.html";
/// Environment variable naming an optional configuration file.
pub const CONFIG_ENV: &str = "BOOTSTAGE_REPORT_CONFIG";

/// Physical region captured before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Memory device path.
    pub device: PathBuf,
    /// Physical start address.
    pub address: u64,
    /// Number of bytes captured.
    pub size: usize,
}

/// Offsets of the co-processor section within the captured region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstageLayout {
    /// Offset of the co-processor header.
    pub mcu_offset: usize,
    /// Offset of the profile array relative to `mcu_offset`.
    pub mcu_record_offset: usize,
}

impl Default for BootstageLayout {
    fn default() -> Self {
        Self {
            mcu_offset: MCU_BOOTSTAGE_START_OFFSET,
            mcu_record_offset: MCU_BOOTRECORD_OFFSET,
        }
    }
}

/// Complete configuration for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Capture parameters.
    pub capture: CaptureConfig,
    /// Bootstage binary layout.
    pub layout: BootstageLayout,
    /// Maximum records per chain.
    pub record_capacity: usize,
    /// Kernel log path.
    pub kernel_log: PathBuf,
    /// HTML output path.
    pub html_output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: PathBuf::from(MEM_DEVICE),
                address: BOOTSTAGE_PRESERVED_ADDR,
                size: BOOTSTAGE_SIZE,
            },
            layout: BootstageLayout::default(),
            record_capacity: RECORD_CAPACITY,
            kernel_log: PathBuf::from(KERNEL_LOG_PATH),
            html_output: PathBuf::from(HTML_REPORT_PATH),
        }
    }
}

impl ReportConfig {
    /// Reject configurations the decoder cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.size == 0 {
            return Err(ConfigError::Invalid("capture size must be non-zero".to_owned()));
        }
        if self.record_capacity == 0 {
            return Err(ConfigError::Invalid(
                "record_capacity must be at least 1".to_owned(),
            ));
        }
        let profiles_at = self
            .layout
            .mcu_offset
            .checked_add(self.layout.mcu_record_offset)
            .ok_or_else(|| ConfigError::Invalid("co-processor offsets overflow".to_owned()))?;
        if profiles_at > self.capture.size {
            return Err(ConfigError::Invalid(format!(
                "co-processor section at {profiles_at:#x} lies outside capture size {:#x}",
                self.capture.size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    capture: CaptureToml,
    #[serde(default)]
    layout: LayoutToml,
    #[serde(default)]
    limits: LimitsToml,
    #[serde(default)]
    paths: PathsToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureToml {
    device: Option<PathBuf>,
    address: Option<u64>,
    size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutToml {
    mcu_offset: Option<usize>,
    mcu_record_offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LimitsToml {
    record_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsToml {
    kernel_log: Option<PathBuf>,
    html_output: Option<PathBuf>,
}

/// Parse TOML text on top of the platform defaults.
pub fn parse_config(text: &str, origin: &Path) -> Result<ReportConfig, ConfigError> {
    let parsed: ConfigToml = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    let mut config = ReportConfig::default();
    if let Some(device) = parsed.capture.device {
        config.capture.device = device;
    }
    if let Some(address) = parsed.capture.address {
        config.capture.address = address;
    }
    if let Some(size) = parsed.capture.size {
        config.capture.size = size;
    }
    if let Some(offset) = parsed.layout.mcu_offset {
        config.layout.mcu_offset = offset;
    }
    if let Some(offset) = parsed.layout.mcu_record_offset {
        config.layout.mcu_record_offset = offset;
    }
    if let Some(capacity) = parsed.limits.record_capacity {
        config.record_capacity = capacity;
    }
    if let Some(path) = parsed.paths.kernel_log {
        config.kernel_log = path;
    }
    if let Some(path) = parsed.paths.html_output {
        config.html_output = path;
    }
    config.validate()?;
    Ok(config)
}

/// Load a configuration file and apply it over the defaults.
pub fn load_config(path: &Path) -> Result<ReportConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text, path)?;
    log::debug!("loaded report config from {}", path.display());
    Ok(config)
}

/// Pick the configuration file: an explicit path wins over [`CONFIG_ENV`].
///
/// Returns `None` when neither names a file, meaning the built-in defaults apply.
#[must_use]
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path);
    }
    std::env::var(CONFIG_ENV)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Resolve and load the configuration, falling back to defaults.
pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<ReportConfig, ConfigError> {
    match resolve_config_path(cli_path) {
        Some(path) => load_config(&path),
        None => Ok(ReportConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_constants() {
        let config = ReportConfig::default();
        assert_eq!(config.capture.address, 0xA000_0000);
        assert_eq!(config.capture.size, 0x9_0000);
        assert_eq!(config.layout.mcu_offset, 0x8_0000);
        assert_eq!(config.layout.mcu_record_offset, 0x10);
        assert_eq!(config.record_capacity, 256);
        assert_eq!(config.kernel_log, PathBuf::from("/var/log/messages"));
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let config = parse_config("", Path::new("empty.toml")).expect("parse");
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn partial_override() {
        let text = r#"
            [capture]
            address = 0x9000_0000
            size = 0x2000

            [layout]
            mcu_offset = 0x1000

            [paths]
            kernel_log = "/tmp/kmsg.log"
        "#;
        let config = parse_config(text, Path::new("board.toml")).expect("parse");
        assert_eq!(config.capture.address, 0x9000_0000);
        assert_eq!(config.capture.size, 0x2000);
        assert_eq!(config.layout.mcu_offset, 0x1000);
        assert_eq!(config.layout.mcu_record_offset, MCU_BOOTRECORD_OFFSET);
        assert_eq!(config.kernel_log, PathBuf::from("/tmp/kmsg.log"));
        assert_eq!(config.html_output, PathBuf::from(HTML_REPORT_PATH));
    }

    #[test]
    fn co_processor_section_outside_capture_is_rejected() {
        let text = "[capture]\nsize = 0x100\n";
        let err = parse_config(text, Path::new("bad.toml")).expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let text = "[limits]\nrecord_capacity = 0\n";
        let err = parse_config(text, Path::new("bad.toml")).expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = parse_config("[capture]\nbogus = 1\n", Path::new("bad.toml"))
            .expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
