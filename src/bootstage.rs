// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decode the preserved U-Boot bootstage region and its MCU profile section.
// Author: Lukas Bower

//! Bootloader record reader.
//!
//! The preserved region starts with a packed little-endian header followed
//! by fixed-size stage records. The co-processor writes its own section at a
//! fixed offset further into the region:
//!
//! ```text
//! 0x00  header   version u32 | count u32 | size u32 | magic u32 | next_id u32
//! 0x14  records  time_us u64 | start_us u64 | name_ptr u64 | flags i32 | id i32
//! mcu   header   record_id u32 | record_count u32 | start_time u64
//! mcu+  profiles name [u8; 24] | time_us u64
//! ```
//!
//! Decoding is a pure function of the buffer; nothing reaches the
//! [`Timeline`] unless the whole image decoded cleanly.

use log::{debug, warn};

use crate::config::BootstageLayout;
use crate::error::{BootstageError, ReportError, TimelineError};
use crate::stage::{self, MCU_AWAKE};
use crate::timeline::Timeline;

/// Magic value written by U-Boot into a valid header.
pub const BOOTSTAGE_MAGIC: u32 = 0xb007_57a3;
/// Header version this reader was written against.
pub const BOOTSTAGE_VERSION: u32 = 0;
/// Packed header size in bytes.
pub const HEADER_SIZE: usize = 20;
/// Packed stage record size in bytes.
pub const RECORD_SIZE: usize = 32;
/// Co-processor profile entry size in bytes.
pub const MCU_PROFILE_SIZE: usize = 32;
/// Width of the NUL-padded profile name.
pub const MCU_PROFILE_NAME_LEN: usize = 24;

/// Decoded bootstage header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstageHeader {
    /// Layout version.
    pub version: u32,
    /// Records stored by the bootloader.
    pub count: u32,
    /// Total data size; zero means the region was never written.
    pub size: u32,
    /// Header magic.
    pub magic: u32,
    /// Next identifier the bootloader would have allocated.
    pub next_id: u32,
}

/// One raw bootloader stage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRecord {
    /// Timestamp at which the stage was marked, microseconds.
    pub time_us: u64,
    /// Start timestamp for accumulated stages, microseconds; zero when unused.
    pub start_us: u64,
    /// Bootstage flags.
    pub flags: i32,
    /// Stage identifier.
    pub id: i32,
}

impl StageRecord {
    /// Millisecond timestamp, preferring `start_us` when it is populated.
    #[must_use]
    pub fn time_ms(&self) -> u64 {
        let micros = if self.start_us != 0 {
            self.start_us
        } else {
            self.time_us
        };
        micros / 1000
    }
}

/// One named co-processor timing profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McuProfile {
    /// Profile name.
    pub name: String,
    /// Time since the co-processor started, microseconds.
    pub time_us: u64,
}

/// Decoded co-processor section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McuSection {
    /// Co-processor identifier.
    pub record_id: u32,
    /// Profile count declared by the co-processor.
    pub declared_count: u32,
    /// Start time reported by the co-processor.
    pub start_time: u64,
    /// Profiles that were decoded, clamped to the chain capacity.
    pub profiles: Vec<McuProfile>,
}

/// Fully decoded bootstage region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstageImage {
    /// Region header.
    pub header: BootstageHeader,
    /// Stage records in stored order.
    pub records: Vec<StageRecord>,
    /// Co-processor section.
    pub mcu: McuSection,
}

struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8], BootstageError> {
        let truncated = BootstageError::TruncatedBuffer {
            offset,
            needed: len,
            available: self.buf.len(),
        };
        let end = offset.checked_add(len).ok_or(truncated)?;
        self.buf.get(offset..end).ok_or(truncated)
    }

    fn u32_at(&self, offset: usize) -> Result<u32, BootstageError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes_at(offset, 4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn i32_at(&self, offset: usize) -> Result<i32, BootstageError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes_at(offset, 4)?);
        Ok(i32::from_le_bytes(raw))
    }

    fn u64_at(&self, offset: usize) -> Result<u64, BootstageError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.bytes_at(offset, 8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn name_at(&self, offset: usize, len: usize) -> Result<String, BootstageError> {
        let raw = self.bytes_at(offset, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).trim().to_owned())
    }
}

fn decode_header(reader: &ByteReader<'_>) -> Result<BootstageHeader, BootstageError> {
    let header = BootstageHeader {
        version: reader.u32_at(0)?,
        count: reader.u32_at(4)?,
        size: reader.u32_at(8)?,
        magic: reader.u32_at(12)?,
        next_id: reader.u32_at(16)?,
    };
    if header.magic != BOOTSTAGE_MAGIC || header.size == 0 {
        return Err(BootstageError::InvalidHeader {
            magic: header.magic,
            size: header.size,
        });
    }
    debug!(
        "bootstage header: version={} count={} size={:#x} magic={:#010x} next_id={}",
        header.version, header.count, header.size, header.magic, header.next_id
    );
    if header.version != BOOTSTAGE_VERSION {
        warn!("unexpected bootstage version {}", header.version);
    }
    Ok(header)
}

fn decode_record(reader: &ByteReader<'_>, offset: usize) -> Result<StageRecord, BootstageError> {
    Ok(StageRecord {
        time_us: reader.u64_at(offset)?,
        start_us: reader.u64_at(offset + 8)?,
        flags: reader.i32_at(offset + 24)?,
        id: reader.i32_at(offset + 28)?,
    })
}

fn decode_mcu(
    reader: &ByteReader<'_>,
    layout: &BootstageLayout,
    max_profiles: usize,
) -> Result<McuSection, BootstageError> {
    let base = layout.mcu_offset;
    let record_id = reader.u32_at(base)?;
    let declared_count = reader.u32_at(base + 4)?;
    let start_time = reader.u64_at(base + 8)?;
    debug!("mcu {record_id}: {declared_count} profiles, start time {start_time}");

    let count = (declared_count as usize).min(max_profiles);
    if count < declared_count as usize {
        warn!("mcu declares {declared_count} profiles, keeping {count}");
    }
    let profiles_at = base + layout.mcu_record_offset;
    let profiles = (0..count)
        .map(|index| -> Result<McuProfile, BootstageError> {
            let offset = profiles_at + index * MCU_PROFILE_SIZE;
            Ok(McuProfile {
                name: reader.name_at(offset, MCU_PROFILE_NAME_LEN)?,
                time_us: reader.u64_at(offset + MCU_PROFILE_NAME_LEN)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(McuSection {
        record_id,
        declared_count,
        start_time,
        profiles,
    })
}

/// Decode a captured bootstage region.
///
/// At most `capacity` stage records and `capacity - 1` co-processor profiles
/// are read; the remaining slot of the co-processor chain holds the
/// synthetic awake record.
pub fn decode(
    buffer: &[u8],
    layout: &BootstageLayout,
    capacity: usize,
) -> Result<BootstageImage, BootstageError> {
    let reader = ByteReader::new(buffer);
    let header = decode_header(&reader)?;

    let count = (header.count as usize).min(capacity);
    if count < header.count as usize {
        warn!("bootstage header declares {} records, keeping {count}", header.count);
    }
    let records = (0..count)
        .map(|index| decode_record(&reader, HEADER_SIZE + index * RECORD_SIZE))
        .collect::<Result<Vec<_>, BootstageError>>()?;

    let mcu = decode_mcu(&reader, layout, capacity.saturating_sub(1))?;
    Ok(BootstageImage {
        header,
        records,
        mcu,
    })
}

/// Append a decoded image to the timeline and latch bootloader markers.
///
/// Returns the number of primary records appended. Capacity is checked up
/// front so a rejected image leaves the timeline untouched.
pub fn ingest(image: &BootstageImage, timeline: &mut Timeline) -> Result<usize, TimelineError> {
    if image.records.len() > timeline.primary().remaining() {
        return Err(TimelineError::CapacityExceeded {
            capacity: timeline.primary().capacity(),
        });
    }
    if image.mcu.profiles.len() + 1 > timeline.secondary().remaining() {
        return Err(TimelineError::CapacityExceeded {
            capacity: timeline.secondary().capacity(),
        });
    }

    for record in &image.records {
        let id = i64::from(record.id);
        let time_ms = record.time_ms();
        timeline.primary_mut().push(stage::resolve(id), time_ms)?;
        timeline.latch_bootloader_marker(id, time_ms);
    }

    let mcu_start = timeline.secondary_start_time();
    timeline.secondary_mut().push(MCU_AWAKE, mcu_start)?;
    for profile in &image.mcu.profiles {
        let start_time = (profile.time_us / 1000).saturating_add(mcu_start);
        timeline
            .secondary_mut()
            .push(profile.name.as_str(), start_time)?;
    }
    Ok(image.records.len())
}

/// Decode `buffer` and append it to `timeline` in one step.
pub fn read_bootstage(
    buffer: &[u8],
    layout: &BootstageLayout,
    timeline: &mut Timeline,
) -> Result<BootstageHeader, ReportError> {
    let image = decode(buffer, layout, timeline.primary().capacity())?;
    let appended = ingest(&image, timeline)?;
    debug!(
        "bootstage: {appended} stage records, {} mcu profiles",
        image.mcu.profiles.len()
    );
    Ok(image.header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: BootstageLayout = BootstageLayout {
        mcu_offset: 0x200,
        mcu_record_offset: 0x10,
    };

    fn header(count: u32, magic: u32, size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 0x400];
        buf[0..4].copy_from_slice(&BOOTSTAGE_VERSION.to_le_bytes());
        buf[4..8].copy_from_slice(&count.to_le_bytes());
        buf[8..12].copy_from_slice(&size.to_le_bytes());
        buf[12..16].copy_from_slice(&magic.to_le_bytes());
        buf[16..20].copy_from_slice(&count.wrapping_add(1).to_le_bytes());
        buf
    }

    fn put_record(buf: &mut [u8], index: usize, time_us: u64, start_us: u64, id: i32) {
        let at = HEADER_SIZE + index * RECORD_SIZE;
        buf[at..at + 8].copy_from_slice(&time_us.to_le_bytes());
        buf[at + 8..at + 16].copy_from_slice(&start_us.to_le_bytes());
        buf[at + 16..at + 24].copy_from_slice(&0xdead_beef_u64.to_le_bytes());
        buf[at + 24..at + 28].copy_from_slice(&0i32.to_le_bytes());
        buf[at + 28..at + 32].copy_from_slice(&id.to_le_bytes());
    }

    fn put_mcu(buf: &mut [u8], profiles: &[(&str, u64)]) {
        let base = LAYOUT.mcu_offset;
        buf[base..base + 4].copy_from_slice(&7u32.to_le_bytes());
        buf[base + 4..base + 8].copy_from_slice(&(profiles.len() as u32).to_le_bytes());
        buf[base + 8..base + 16].copy_from_slice(&0u64.to_le_bytes());
        for (index, (name, time_us)) in profiles.iter().enumerate() {
            let at = base + LAYOUT.mcu_record_offset + index * MCU_PROFILE_SIZE;
            buf[at..at + name.len()].copy_from_slice(name.as_bytes());
            buf[at + MCU_PROFILE_NAME_LEN..at + MCU_PROFILE_SIZE]
                .copy_from_slice(&time_us.to_le_bytes());
        }
    }

    #[test]
    fn three_records_convert_to_milliseconds() {
        let mut buf = header(3, BOOTSTAGE_MAGIC, 0x100);
        put_record(&mut buf, 0, 1000, 0, 178);
        put_record(&mut buf, 1, 2500, 0, 10);
        put_record(&mut buf, 2, 4200, 0, 11);
        put_mcu(&mut buf, &[]);

        let mut timeline = Timeline::new(16);
        read_bootstage(&buf, &LAYOUT, &mut timeline).expect("read");
        let starts: Vec<u64> = timeline.primary().records().iter().map(|r| r.start_time).collect();
        let deltas: Vec<u64> = timeline.primary().records().iter().map(|r| r.delta_time).collect();
        assert_eq!(starts, vec![1, 2, 4]);
        assert_eq!(deltas, vec![0, 1, 2]);
        assert_eq!(timeline.summary().spl_start_time, 1);
        assert_eq!(timeline.primary().records()[0].name, "BOOTSTAGE_START_UBOOT_F");
    }

    #[test]
    fn start_us_takes_precedence() {
        let record = StageRecord {
            time_us: 9_000,
            start_us: 3_999,
            flags: 0,
            id: 1,
        };
        assert_eq!(record.time_ms(), 3);
        let record = StageRecord {
            start_us: 0,
            ..record
        };
        assert_eq!(record.time_ms(), 9);
    }

    #[test]
    fn bad_magic_is_invalid_header() {
        let buf = header(3, 0x1234_5678, 0x100);
        let err = decode(&buf, &LAYOUT, 16).expect_err("bad magic");
        assert_eq!(
            err,
            BootstageError::InvalidHeader {
                magic: 0x1234_5678,
                size: 0x100
            }
        );
    }

    #[test]
    fn zero_size_is_invalid_header() {
        let buf = header(3, BOOTSTAGE_MAGIC, 0);
        assert!(matches!(
            decode(&buf, &LAYOUT, 16),
            Err(BootstageError::InvalidHeader { size: 0, .. })
        ));
    }

    #[test]
    fn short_buffer_is_truncated_not_panic() {
        let buf = header(3, BOOTSTAGE_MAGIC, 0x100);
        assert!(matches!(
            decode(&buf[..10], &LAYOUT, 16),
            Err(BootstageError::TruncatedBuffer { offset: 8, needed: 4, available: 10 })
        ));
        assert!(matches!(
            decode(&buf[..0x40], &LAYOUT, 16),
            Err(BootstageError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn record_count_is_clamped_to_capacity() {
        let mut buf = header(u32::MAX, BOOTSTAGE_MAGIC, 0x100);
        for index in 0..4 {
            put_record(&mut buf, index, (index as u64 + 1) * 1000, 0, 1);
        }
        put_mcu(&mut buf, &[]);
        let image = decode(&buf, &LAYOUT, 4).expect("decode");
        assert_eq!(image.records.len(), 4);
    }

    #[test]
    fn mcu_chain_is_anchored_at_start_marker() {
        let mut buf = header(2, BOOTSTAGE_MAGIC, 0x100);
        put_record(&mut buf, 0, 5_000, 0, 176);
        put_record(&mut buf, 1, 9_000, 0, 185);
        put_mcu(&mut buf, &[("clock_init", 2_000), ("sensor_ready", 7_500)]);

        let mut timeline = Timeline::new(16);
        read_bootstage(&buf, &LAYOUT, &mut timeline).expect("read");
        let mcu = timeline.secondary().records();
        assert_eq!(mcu.len(), 3);
        assert_eq!(mcu[0].name, MCU_AWAKE);
        assert_eq!((mcu[0].start_time, mcu[0].delta_time), (5, 0));
        assert_eq!(mcu[1].name, "clock_init");
        assert_eq!((mcu[1].start_time, mcu[1].delta_time), (7, 2));
        assert_eq!(mcu[2].name, "sensor_ready");
        assert_eq!((mcu[2].start_time, mcu[2].delta_time), (12, 5));
        let summary = timeline.summary();
        assert_eq!(summary.secondary_start_time, 5);
        assert_eq!(summary.bootloader_end_time, 9);
        assert_eq!(summary.secondary_count, 3);
    }

    #[test]
    fn mcu_profiles_are_clamped_below_capacity() {
        let mut buf = header(0, BOOTSTAGE_MAGIC, 0x100);
        put_mcu(&mut buf, &[("a", 1_000), ("b", 2_000), ("c", 3_000)]);
        let image = decode(&buf, &LAYOUT, 3).expect("decode");
        assert_eq!(image.mcu.declared_count, 3);
        assert_eq!(image.mcu.profiles.len(), 2);

        let mut timeline = Timeline::new(3);
        ingest(&image, &mut timeline).expect("ingest");
        assert_eq!(timeline.secondary().len(), 3);
    }

    #[test]
    fn rejected_ingest_leaves_timeline_untouched() {
        let mut buf = header(2, BOOTSTAGE_MAGIC, 0x100);
        put_record(&mut buf, 0, 1_000, 0, 1);
        put_record(&mut buf, 1, 2_000, 0, 2);
        put_mcu(&mut buf, &[]);
        let image = decode(&buf, &LAYOUT, 8).expect("decode");

        let mut timeline = Timeline::new(2);
        timeline.primary_mut().push("earlier", 1).expect("push");
        let before = timeline.clone();
        let err = ingest(&image, &mut timeline).expect_err("capacity");
        assert_eq!(err, TimelineError::CapacityExceeded { capacity: 2 });
        assert_eq!(timeline, before);
    }

    #[test]
    fn unknown_ids_resolve_to_sentinel() {
        let mut buf = header(1, BOOTSTAGE_MAGIC, 0x100);
        put_record(&mut buf, 0, 1_000, 0, 999);
        put_mcu(&mut buf, &[]);
        let mut timeline = Timeline::new(4);
        read_bootstage(&buf, &LAYOUT, &mut timeline).expect("read");
        assert_eq!(timeline.primary().records()[0].name, stage::UNKNOWN_STAGE);
    }
}
