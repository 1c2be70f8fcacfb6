//! Local copies of a window of the target's address space.
//!
//! A [`MemorySnapshot`] copies `size` bytes starting at a remote base address
//! into a local buffer, region by region. Unreadable regions are zero-filled
//! so that local offset `o` always corresponds to remote address `base + o`.

use std::ops::Range;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pattern::BytePattern;
use crate::process::ReadMemory;

#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    base: u64,
    data: Vec<u8>,
    unreadable: Vec<Range<u64>>,
}

impl MemorySnapshot {
    /// Copy `[remote_base, remote_base + size)` from the target.
    ///
    /// Fails with `AccessDenied` when no byte of the window could be read and
    /// with `PartialMap` when the region walk stops early.
    pub fn create<R: ReadMemory + ?Sized>(reader: &R, remote_base: u64, size: usize) -> Result<Self> {
        let end = remote_base
            .checked_add(size as u64)
            .ok_or_else(|| Error::read_failed(remote_base, "Snapshot window overflows"))?;

        let mut snapshot = Self {
            base: remote_base,
            data: vec![0u8; size],
            unreadable: Vec::new(),
        };

        let mut cursor = remote_base;
        let mut regions = 0usize;
        while cursor < end {
            let region = match reader.query_region(cursor) {
                Ok(region) if region.end() > cursor => region,
                Ok(region) => {
                    debug!("Region query at {:#x} made no progress: {:?}", cursor, region);
                    return Err(snapshot.partial(cursor));
                }
                Err(e) => {
                    debug!("Region query at {:#x} failed: {}", cursor, e);
                    return Err(snapshot.partial(cursor));
                }
            };
            regions += 1;

            // The first region may start before the window; clip both ends.
            let chunk_end = region.end().min(end);
            let len = (chunk_end - cursor) as usize;

            if region.is_readable() {
                match reader.read_bytes(cursor, len) {
                    Ok(bytes) => {
                        let offset = (cursor - remote_base) as usize;
                        snapshot.data[offset..offset + len].copy_from_slice(&bytes);
                    }
                    Err(e) => {
                        warn!("Failed to copy region {:#x}..{:#x}: {}", cursor, chunk_end, e);
                        snapshot.mark_unreadable(cursor..chunk_end);
                    }
                }
            } else {
                debug!(
                    "Skipping region {:#x}..{:#x} (protection {:#x})",
                    cursor,
                    chunk_end,
                    region.protection.raw()
                );
                snapshot.mark_unreadable(cursor..chunk_end);
            }

            cursor = chunk_end;
        }

        if size > 0 && snapshot.readable_bytes() == 0 {
            return Err(Error::AccessDenied(format!(
                "No readable memory in {:#x}..{:#x}",
                remote_base, end
            )));
        }

        debug!(
            "Snapshot {:#x}..{:#x}: {} regions, {} of {} bytes readable",
            remote_base,
            end,
            regions,
            snapshot.readable_bytes(),
            size
        );
        Ok(snapshot)
    }

    /// Build a snapshot from bytes that were already copied.
    pub fn from_bytes(base: u64, data: Vec<u8>) -> Self {
        Self {
            base,
            data,
            unreadable: Vec::new(),
        }
    }

    fn partial(&self, cursor: u64) -> Error {
        Error::PartialMap {
            mapped: cursor - self.base,
            requested: self.data.len() as u64,
        }
    }

    fn mark_unreadable(&mut self, range: Range<u64>) {
        if let Some(last) = self.unreadable.last_mut()
            && last.end == range.start
        {
            last.end = range.end;
            return;
        }
        self.unreadable.push(range);
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Exclusive end of the window in the target's address space.
    pub fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Remote address ranges that were zero-filled.
    pub fn unreadable_ranges(&self) -> &[Range<u64>] {
        &self.unreadable
    }

    pub fn readable_bytes(&self) -> usize {
        let skipped: u64 = self.unreadable.iter().map(|r| r.end - r.start).sum();
        self.data.len() - skipped as usize
    }

    /// Whether `address` was actually copied (as opposed to zero-filled).
    pub fn is_readable_at(&self, address: u64) -> bool {
        self.contains(address) && !self.unreadable.iter().any(|r| r.contains(&address))
    }

    pub fn host_to_remote(&self, offset: usize) -> Result<u64> {
        if offset >= self.data.len() {
            return Err(self.out_of_range(self.base.saturating_add(offset as u64)));
        }
        Ok(self.base + offset as u64)
    }

    pub fn remote_to_host(&self, address: u64) -> Result<usize> {
        if !self.contains(address) {
            return Err(self.out_of_range(address));
        }
        Ok((address - self.base) as usize)
    }

    fn out_of_range(&self, address: u64) -> Error {
        Error::AddressOutOfRange {
            address,
            base: self.base,
            end: self.end(),
        }
    }

    /// `len` bytes starting at remote `address`, entirely inside the window.
    pub fn slice_at(&self, address: u64, len: usize) -> Result<&[u8]> {
        let offset = self.remote_to_host(address)?;
        self.data
            .get(offset..offset + len)
            .ok_or_else(|| self.out_of_range(address + len as u64))
    }

    pub fn read_u8(&self, address: u64) -> Result<u8> {
        let offset = self.remote_to_host(address)?;
        Ok(self.data[offset])
    }

    /// Remote address of the first occurrence of `pattern`, searching from
    /// `start` (or the beginning of the window).
    pub fn find(&self, pattern: &BytePattern, start: Option<u64>) -> Result<u64> {
        let from = match start {
            Some(address) if address == self.end() => {
                return Err(Error::PatternNotFound(pattern.to_string()));
            }
            Some(address) => self.remote_to_host(address)?,
            None => 0,
        };

        match pattern.find_first(&self.data, from) {
            Some(offset) => self.host_to_remote(offset),
            None => Err(Error::PatternNotFound(pattern.to_string())),
        }
    }

    /// Remote addresses of every occurrence of `pattern`.
    pub fn find_all(&self, pattern: &BytePattern) -> Vec<u64> {
        pattern
            .find_all(&self.data)
            .into_iter()
            .map(|offset| self.base + offset as u64)
            .collect()
    }
}
