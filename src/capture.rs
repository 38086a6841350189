// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Copy the preserved bootstage region out of physical memory or a saved snapshot.
// Author: Lukas Bower
#![allow(unsafe_code)]

//! Memory capture.
//!
//! The mapping of `/dev/mem` never outlives [`MemorySource::capture`]: the
//! window is mapped, copied into an owned buffer and unmapped before any
//! parsing happens.

use std::fs::{self, File};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use log::debug;

use crate::error::CaptureError;

/// Source of a raw physical memory region.
pub trait MemorySource {
    /// Return exactly `len` bytes starting at physical `address`.
    fn capture(&self, address: u64, len: usize) -> Result<Vec<u8>, CaptureError>;
}

/// Live capture through a memory device such as `/dev/mem`.
#[derive(Debug, Clone)]
pub struct DevMem {
    path: PathBuf,
}

impl DevMem {
    /// Capture through the device at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MemorySource for DevMem {
    fn capture(&self, address: u64, len: usize) -> Result<Vec<u8>, CaptureError> {
        let file = File::open(&self.path).map_err(|err| classify(&self.path, address, len, err))?;
        let mapping = Mapping::map(&file, address, len)
            .map_err(|err| classify(&self.path, address, len, err))?;
        let bytes = mapping.as_slice().to_vec();
        drop(mapping);
        debug!("captured {len:#x} bytes at {address:#x} from {}", self.path.display());
        Ok(bytes)
    }
}

/// Offline capture from a file holding a previously dumped region.
///
/// The dump is assumed to start at the requested address, so only `len`
/// is checked.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Read the snapshot stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MemorySource for SnapshotFile {
    fn capture(&self, address: u64, len: usize) -> Result<Vec<u8>, CaptureError> {
        let mut bytes = fs::read(&self.path).map_err(|err| classify(&self.path, address, len, err))?;
        if bytes.len() < len {
            return Err(CaptureError::MapFailed {
                path: self.path.clone(),
                address,
                len,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("snapshot holds {} bytes", bytes.len()),
                ),
            });
        }
        bytes.truncate(len);
        Ok(bytes)
    }
}

/// Write a captured region so it can later be replayed with [`SnapshotFile`].
pub fn save_snapshot(path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(path, bytes)
}

fn classify(path: &Path, address: u64, len: usize, source: io::Error) -> CaptureError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        CaptureError::AccessDenied {
            path: path.to_path_buf(),
            source,
        }
    } else {
        CaptureError::MapFailed {
            path: path.to_path_buf(),
            address,
            len,
            source,
        }
    }
}

/// Read-only shared mapping released on drop.
struct Mapping {
    base: NonNull<libc::c_void>,
    map_len: usize,
    skip: usize,
    len: usize,
}

impl Mapping {
    fn map(file: &File, address: u64, len: usize) -> io::Result<Self> {
        if len == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty capture"));
        }
        // SAFETY: sysconf has no memory-safety preconditions.
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page = u64::try_from(page)
            .ok()
            .filter(|page| page.is_power_of_two())
            .ok_or_else(io::Error::last_os_error)?;
        let aligned = address & !(page - 1);
        let skip = usize::try_from(address - aligned)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "page offset overflow"))?;
        let map_len = skip
            .checked_add(len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "capture length overflow"))?;
        let offset = libc::off_t::try_from(aligned)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "address exceeds off_t"))?;

        // SAFETY: a fresh read-only mapping is requested at a kernel-chosen
        // address; the descriptor is valid for the duration of the call.
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let base = NonNull::new(base)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;
        Ok(Self {
            base,
            map_len,
            skip,
            len,
        })
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping covers `skip + len` readable bytes and lives as
        // long as `self`.
        unsafe {
            std::slice::from_raw_parts(
                self.base.as_ptr().cast::<u8>().add(self.skip),
                self.len,
            )
        }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: `base`/`map_len` are exactly what mmap returned and the
        // mapping is not referenced after drop.
        unsafe {
            libc::munmap(self.base.as_ptr(), self.map_len);
        }
    }
}
