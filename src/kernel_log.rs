// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Extract kernel BOOT TRACKER points from a text log and extend the primary chain.
// Author: Lukas Bower

//! Kernel log reader.
//!
//! Kernel tracker points are emitted as free text, for example
//! `[BOOT TRACKER] ID:300 time=5000000`, with the timestamp in microseconds.
//! Lines without the tag, or whose payload does not match, are skipped
//! silently because the log mixes unrelated content.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LogSourceError, ReportError, TimelineError};
use crate::stage;
use crate::timeline::Timeline;

/// Tag marking a kernel tracker line.
pub const BOOT_TRACKER_TAG: &str = "[BOOT TRACKER]";

static TRACKER_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ID:\s*(-?\d+)[^=]*=\s*(\d+)").expect("tracker payload pattern is valid")
});

/// Counters for one kernel log pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelLogStats {
    /// Lines examined.
    pub lines: usize,
    /// Lines carrying the tracker tag.
    pub tagged: usize,
    /// Records appended to the primary chain.
    pub appended: usize,
}

/// Extract `(stage id, microseconds)` from a tracker line, if it is one.
#[must_use]
pub fn parse_line(line: &str) -> Option<(i64, u64)> {
    let at = line.find(BOOT_TRACKER_TAG)?;
    let payload = &line[at + BOOT_TRACKER_TAG.len()..];
    let captures = TRACKER_PAYLOAD.captures(payload)?;
    let id = captures.get(1)?.as_str().parse().ok()?;
    let time_us = captures.get(2)?.as_str().parse().ok()?;
    Some((id, time_us))
}

/// Append every tracker point in `lines` to the primary chain.
///
/// The first accepted point becomes the kernel start marker when it lies
/// after the bootloader handoff; later points extend the kernel end marker.
/// Hitting chain capacity stops the pass; records already appended stay.
pub fn ingest_lines<I, S>(lines: I, timeline: &mut Timeline) -> Result<KernelLogStats, TimelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats = KernelLogStats::default();
    for line in lines {
        ingest_line(line.as_ref(), timeline, &mut stats)?;
    }
    Ok(stats)
}

fn ingest_line(
    line: &str,
    timeline: &mut Timeline,
    stats: &mut KernelLogStats,
) -> Result<(), TimelineError> {
    stats.lines += 1;
    if !line.contains(BOOT_TRACKER_TAG) {
        return Ok(());
    }
    stats.tagged += 1;
    let Some((id, time_us)) = parse_line(line) else {
        return Ok(());
    };
    let time_ms = time_us / 1000;
    timeline.primary_mut().push(stage::resolve(id), time_ms)?;
    timeline.observe_kernel_record(stats.appended == 0, time_ms);
    stats.appended += 1;
    Ok(())
}

/// Read the kernel log at `path` and append its tracker points.
///
/// Invalid UTF-8 is replaced rather than aborting the pass. When the file
/// cannot be opened the timeline is left as it was.
pub fn read_kernel_log(path: &Path, timeline: &mut Timeline) -> Result<KernelLogStats, ReportError> {
    let file = File::open(path).map_err(|err| LogSourceError::from_io(path, err))?;
    let mut reader = BufReader::new(file);
    let mut stats = KernelLogStats::default();
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|err| LogSourceError::from_io(path, err))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        ingest_line(line.trim_end_matches(&['\r', '\n'][..]), timeline, &mut stats)?;
    }
    debug!(
        "{}: {} lines, {} tagged, {} skipped",
        path.display(),
        stats.lines,
        stats.tagged,
        stats.tagged - stats.appended
    );
    info!("kernel log contributed {} records", stats.appended);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::marker;

    #[test]
    fn parses_tracker_line() {
        assert_eq!(
            parse_line("[BOOT TRACKER] ID:300 time=5000000"),
            Some((300, 5_000_000))
        );
    }

    #[test]
    fn parses_syslog_prefixed_line() {
        let line = "Jan  1 00:00:05 imx8 kernel: [    5.012345] [BOOT TRACKER] ID:301 time=7250000";
        assert_eq!(parse_line(line), Some((301, 7_250_000)));
    }

    #[test]
    fn rejects_untagged_and_malformed_lines() {
        assert_eq!(parse_line("ID:300 time=5000000"), None);
        assert_eq!(parse_line("[BOOT TRACKER] started"), None);
        assert_eq!(parse_line("[BOOT TRACKER] ID:abc time=5"), None);
        assert_eq!(parse_line("[BOOT TRACKER] ID:300 time=soon"), None);
        assert_eq!(parse_line("[BOOT TRACKER] ID:300 time=99999999999999999999999"), None);
    }

    #[test]
    fn continues_primary_chain_delta() {
        let mut timeline = Timeline::new(8);
        timeline.primary_mut().push("bootloader", 4).expect("push");
        let stats = ingest_lines(["[BOOT TRACKER] ID:300 time=5000000"], &mut timeline)
            .expect("ingest");
        assert_eq!(stats.appended, 1);
        let record = &timeline.primary().records()[1];
        assert_eq!(record.name, "BOOTSTAGE_KERNEL_START");
        assert_eq!(record.start_time, 5000);
        assert_eq!(record.delta_time, 4996);
    }

    #[test]
    fn kernel_markers_follow_handoff() {
        let mut timeline = Timeline::new(8);
        timeline.primary_mut().push("handoff", 1_500).expect("push");
        timeline.latch_bootloader_marker(marker::BOOTM_HANDOFF, 1_500);
        let lines = [
            "noise",
            "[BOOT TRACKER] ID:300 time=1800000",
            "[BOOT TRACKER] garbage",
            "[BOOT TRACKER] ID:207 time=2600000",
            "[BOOT TRACKER] ID:301 time=4100000",
        ];
        let stats = ingest_lines(lines, &mut timeline).expect("ingest");
        assert_eq!(stats, KernelLogStats { lines: 5, tagged: 4, appended: 3 });
        let summary = timeline.summary();
        assert_eq!(summary.kernel_start_time, 1_800);
        assert_eq!(summary.kernel_end_time, 4_100);
        assert_eq!(summary.primary_count, 4);
    }

    #[test]
    fn capacity_stops_pass_and_keeps_records() {
        let mut timeline = Timeline::new(2);
        let lines = [
            "[BOOT TRACKER] ID:300 time=1000",
            "[BOOT TRACKER] ID:207 time=2000",
            "[BOOT TRACKER] ID:301 time=3000",
        ];
        let err = ingest_lines(lines, &mut timeline).expect_err("capacity");
        assert_eq!(err, TimelineError::CapacityExceeded { capacity: 2 });
        assert_eq!(timeline.primary().len(), 2);
    }
}
