// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point that captures bootstage memory, reads the kernel log and prints the boot report.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the boot time report.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bootstage_report::capture::{save_snapshot, DevMem, MemorySource, SnapshotFile};
use bootstage_report::config::{self, ReportConfig};
use bootstage_report::report::{self, ReportContext, TimelineReport};
use bootstage_report::{read_bootstage, read_kernel_log, Timeline};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn, LevelFilter};

#[derive(Debug, Parser)]
#[command(
    author = "Lukas Bower",
    version,
    about = "Boot time report from U-Boot bootstage memory and kernel BOOT TRACKER lines"
)]
struct Cli {
    /// TOML file overriding the platform defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read the bootstage region from a raw dump instead of the memory device.
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Save the captured region for later use with --snapshot.
    #[arg(long, value_name = "FILE")]
    dump_capture: Option<PathBuf>,

    /// Kernel log to scan for tracker lines.
    #[arg(long, value_name = "FILE")]
    kernel_log: Option<PathBuf>,

    /// Destination of the HTML report.
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Skip writing the HTML report.
    #[arg(long, default_value_t = false, conflicts_with = "html")]
    no_html: bool,

    /// Print the timeline as JSON instead of the text report.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn resolve_config(cli: &Cli) -> Result<ReportConfig> {
    let mut config = config::load_or_default(cli.config.clone())
        .context("failed to load report configuration")?;
    if let Some(path) = &cli.kernel_log {
        config.kernel_log = path.clone();
    }
    if let Some(path) = &cli.html {
        config.html_output = path.clone();
    }
    Ok(config)
}

fn collect_bootstage(cli: &Cli, config: &ReportConfig, timeline: &mut Timeline) -> Result<()> {
    let capture = &config.capture;
    let bytes = match &cli.snapshot {
        Some(path) => SnapshotFile::new(path).capture(capture.address, capture.size),
        None => DevMem::new(&capture.device).capture(capture.address, capture.size),
    }
    .with_context(|| format!("failed to capture bootstage region at {:#x}", capture.address))?;

    if let Some(path) = &cli.dump_capture {
        save_snapshot(path, &bytes)
            .with_context(|| format!("failed to write capture to {}", path.display()))?;
        info!("captured region saved to {}", path.display());
    }

    let header = read_bootstage(&bytes, &config.layout, timeline)
        .context("failed to read bootstage records")?;
    info!(
        "bootstage v{} with {} records (next id {})",
        header.version, header.count, header.next_id
    );
    Ok(())
}

fn emit(cli: &Cli, html_path: &Path, timeline: &Timeline) -> Result<()> {
    let context = ReportContext::detect();
    if cli.json {
        let document = serde_json::to_string_pretty(&TimelineReport::new(timeline, &context))
            .context("failed to serialize timeline")?;
        println!("{document}");
    } else {
        print!("{}", report::render_text(timeline, &context));
    }
    if !cli.no_html {
        report::write_html(html_path, timeline, &context)
            .with_context(|| format!("failed to write {}", html_path.display()))?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = resolve_config(cli)?;
    let mut timeline = Timeline::new(config.record_capacity);
    let mut status = ExitCode::SUCCESS;

    if let Err(err) = collect_bootstage(cli, &config, &mut timeline) {
        error!("{err:#}");
        status = ExitCode::FAILURE;
    }

    if let Err(err) = read_kernel_log(&config.kernel_log, &mut timeline) {
        warn!("kernel log {}: {err}", config.kernel_log.display());
    }

    emit(cli, &config.html_output, &timeline)?;
    Ok(status)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(status) => status,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
