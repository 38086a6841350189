// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate configuration file discovery through the CLI path and environment.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::path::PathBuf;

use bootstage_report::config::{self, ReportConfig, CONFIG_ENV};
use bootstage_report::ConfigError;
use serial_test::serial;
use tempfile::TempDir;

struct EnvGuard;

impl EnvGuard {
    fn set(value: &str) -> Self {
        env::set_var(CONFIG_ENV, value);
        Self
    }

    fn clear() -> Self {
        env::remove_var(CONFIG_ENV);
        Self
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        env::remove_var(CONFIG_ENV);
    }
}

#[test]
#[serial]
fn no_path_uses_platform_defaults() {
    let _guard = EnvGuard::clear();
    assert_eq!(config::resolve_config_path(None), None);
    let loaded = config::load_or_default(None).expect("defaults");
    assert_eq!(loaded, ReportConfig::default());
}

#[test]
#[serial]
fn environment_names_config_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("board.toml");
    fs::write(
        &path,
        "[paths]\nkernel_log = \"/tmp/kern.log\"\n\n[limits]\nrecord_capacity = 64\n",
    )
    .expect("write config");
    let _guard = EnvGuard::set(&format!("  {}  ", path.display()));

    assert_eq!(config::resolve_config_path(None), Some(path.clone()));
    let loaded = config::load_or_default(None).expect("load");
    assert_eq!(loaded.kernel_log, PathBuf::from("/tmp/kern.log"));
    assert_eq!(loaded.record_capacity, 64);
    assert_eq!(loaded.capture, ReportConfig::default().capture);
}

#[test]
#[serial]
fn explicit_path_beats_environment() {
    let _guard = EnvGuard::set("/nonexistent/env.toml");
    let explicit = PathBuf::from("/etc/boot_report.toml");
    assert_eq!(
        config::resolve_config_path(Some(explicit.clone())),
        Some(explicit)
    );
}

#[test]
#[serial]
fn blank_environment_is_ignored() {
    let _guard = EnvGuard::set("   ");
    assert_eq!(config::resolve_config_path(None), None);
}

#[test]
#[serial]
fn missing_file_is_read_error() {
    let dir = TempDir::new().expect("tempdir");
    let _guard = EnvGuard::set(&dir.path().join("absent.toml").display().to_string());
    let err = config::load_or_default(None).expect_err("missing");
    assert!(matches!(err, ConfigError::Read { .. }));
}
