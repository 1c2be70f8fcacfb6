//! Mock memory reader for testing
//!
//! Provides a configurable mock implementation of the `ReadMemory` and
//! `ProcessDirectory` traits backed by an in-memory buffer instead of a real
//! process. Regions with arbitrary protections, failing addresses and module
//! load addresses can be configured to exercise snapshot and resolution code.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::process::ReadMemory;
use crate::process::provider::{ProcessDirectory, ProcessInfo};
use crate::process::region::{MemoryRegion, Protection};

/// Mock memory reader for testing
///
/// Reads from an in-memory buffer. Unless regions are configured, the whole
/// buffer is one read-write region.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Vec<u8>,
    base: u64,
    regions: Vec<MemoryRegion>,
    failing: Vec<u64>,
    modules: HashMap<String, u64>,
    pid: u32,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, 0x1000)
    }

    /// Create a new mock reader with custom base address
    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self {
            data,
            base,
            regions: Vec::new(),
            failing: Vec::new(),
            modules: HashMap::new(),
            pid: 4242,
        }
    }

    /// Get the size of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn region_at(&self, address: u64) -> Option<MemoryRegion> {
        if address < self.base || address >= self.end() {
            return None;
        }
        if self.regions.is_empty() {
            return Some(MemoryRegion::new(
                self.base,
                self.data.len() as u64,
                Protection::READ_WRITE,
            ));
        }
        if let Some(region) = self.regions.iter().find(|r| r.contains(address)) {
            return Some(*region);
        }
        // Gaps between configured regions behave like uncommitted memory.
        let gap_end = self
            .regions
            .iter()
            .map(|r| r.base)
            .filter(|&b| b > address)
            .min()
            .unwrap_or(self.end());
        Some(MemoryRegion::new(
            address,
            gap_end - address,
            Protection::UNCOMMITTED,
        ))
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if address < self.base {
            return Err(Error::read_failed(
                address,
                format!("Address below base (base=0x{:X})", self.base),
            ));
        }
        let offset = (address - self.base) as usize;
        if offset + size > self.data.len() {
            return Err(Error::read_failed(
                address,
                format!(
                    "Out of bounds: offset={}, size={}, len={}",
                    offset,
                    size,
                    self.data.len()
                ),
            ));
        }

        let end = address + size as u64;
        if let Some(bad) = self.failing.iter().find(|&&a| a >= address && a < end) {
            return Err(Error::read_failed(
                address,
                format!("Injected failure at 0x{:X}", bad),
            ));
        }

        let mut cursor = address;
        while cursor < end {
            let region = self
                .region_at(cursor)
                .ok_or_else(|| Error::read_failed(cursor, "Unmapped"))?;
            if !region.is_readable() {
                return Err(Error::read_failed(
                    cursor,
                    format!("Region protection 0x{:X}", region.protection.raw()),
                ));
            }
            cursor = region.end();
        }

        Ok(self.data[offset..offset + size].to_vec())
    }

    fn query_region(&self, address: u64) -> Result<MemoryRegion> {
        self.region_at(address)
            .ok_or_else(|| Error::read_failed(address, "No region at address"))
    }

    fn base_address(&self) -> u64 {
        self.base
    }
}

/// Mock process info returned by `MockMemoryReader` acting as a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockProcessInfo {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
    pub alive: bool,
}

impl ProcessInfo for MockProcessInfo {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn module_size(&self) -> u32 {
        self.module_size
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// The process name lookup succeeds for any registered module name, so
/// registering the main executable as a module makes it discoverable.
impl ProcessDirectory for MockMemoryReader {
    type Process = MockProcessInfo;

    fn find_process_id(&self, name: &str) -> Result<u32> {
        if self.modules.contains_key(&name.to_ascii_lowercase()) {
            Ok(self.pid)
        } else {
            Err(Error::ProcessNotFound(format!("Process '{}' not found", name)))
        }
    }

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        if pid != self.pid {
            return Err(Error::ProcessNotFound(format!("Mock process {} not found", pid)));
        }
        Ok(MockProcessInfo {
            pid,
            base_address: self.base,
            module_size: self.data.len() as u32,
            alive: true,
        })
    }

    fn module_base(&self, pid: u32, module_name: &str) -> Result<u64> {
        if pid != self.pid {
            return Err(Error::ProcessNotFound(format!("Mock process {} not found", pid)));
        }
        self.modules
            .get(&module_name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::ModuleNotFound(module_name.to_string()))
    }
}

/// Builder for creating test memory buffers
///
/// Provides a fluent API for constructing memory layouts for testing.
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
    regions: Vec<MemoryRegion>,
    failing: Vec<u64>,
    modules: HashMap<String, u64>,
    pid: u32,
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
            regions: Vec::new(),
            failing: Vec::new(),
            modules: HashMap::new(),
            pid: 4242,
        }
    }

    /// Set the base address for the mock reader
    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Set the PID reported when the mock acts as a process directory
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.data.resize(size, 0);
        self
    }

    /// Declare a region at `offset` from base. Once any region is declared,
    /// undeclared bytes behave as uncommitted memory.
    pub fn region(mut self, offset: usize, size: usize, protection: Protection) -> Self {
        self.ensure_size(offset + size);
        self.regions.push(MemoryRegion::new(
            self.base + offset as u64,
            size as u64,
            protection,
        ));
        self
    }

    /// Make every read that touches `address` fail
    pub fn fail_reads_at(mut self, address: u64) -> Self {
        self.failing.push(address);
        self
    }

    /// Register a module load address (absolute)
    pub fn module(mut self, name: &str, base: u64) -> Self {
        self.modules.insert(name.to_ascii_lowercase(), base);
        self
    }

    /// Write an unsigned 32-bit integer at the specified offset from base
    pub fn write_u32(mut self, offset: usize, value: u32) -> Self {
        self.ensure_size(offset + 4);
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an unsigned 64-bit integer at the specified offset from base
    pub fn write_u64(mut self, offset: usize, value: u64) -> Self {
        self.ensure_size(offset + 8);
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a 32-bit float at the specified offset from base
    pub fn write_f32(mut self, offset: usize, value: f32) -> Self {
        self.ensure_size(offset + 4);
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a single byte at the specified offset from base
    pub fn write_u8(mut self, offset: usize, value: u8) -> Self {
        self.ensure_size(offset + 1);
        self.data[offset] = value;
        self
    }

    /// Write raw bytes at the specified offset from base
    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Build the MockMemoryReader
    pub fn build(self) -> MockMemoryReader {
        let mut reader = MockMemoryReader::with_base(self.data, self.base);
        reader.regions = self.regions;
        reader.failing = self.failing;
        reader.modules = self.modules;
        reader.pid = self.pid;
        reader
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reader_basic() {
        let data = vec![0x78, 0x56, 0x34, 0x12];
        let reader = MockMemoryReader::new(data);

        let value = reader.read_u32(0x1000).unwrap();
        assert_eq!(value, 0x12345678);
    }

    #[test]
    fn test_mock_reader_with_base() {
        let data = vec![0x01, 0x02, 0x03, 0x04];
        let reader = MockMemoryReader::with_base(data, 0x140000000);

        let bytes = reader.read_bytes(0x140000000, 4).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_mock_reader_out_of_bounds() {
        let reader = MockMemoryReader::new(vec![0x01, 0x02]);
        assert!(reader.read_u32(0x1000).is_err());
    }

    #[test]
    fn test_mock_reader_below_base() {
        let reader = MockMemoryReader::with_base(vec![0x01, 0x02, 0x03, 0x04], 0x2000);
        assert!(reader.read_bytes(0x1000, 4).is_err());
    }

    #[test]
    fn test_default_region_covers_buffer() {
        let reader = MockMemoryBuilder::new().with_size(0x200).build();
        let region = reader.query_region(0x1080).unwrap();
        assert_eq!(region.base, 0x1000);
        assert_eq!(region.size, 0x200);
        assert!(region.is_readable());
        assert!(reader.query_region(0x1200).is_err());
    }

    #[test]
    fn test_configured_regions_and_gaps() {
        let reader = MockMemoryBuilder::new()
            .region(0x000, 0x100, Protection::READ_WRITE)
            .region(0x200, 0x100, Protection::NO_ACCESS)
            .build();

        let gap = reader.query_region(0x1150).unwrap();
        assert_eq!(gap.base, 0x1150);
        assert_eq!(gap.end(), 0x1200);
        assert!(!gap.is_readable());

        assert!(reader.read_bytes(0x1000, 0x100).is_ok());
        assert!(reader.read_bytes(0x1200, 4).is_err());
        assert!(reader.read_bytes(0x10FC, 8).is_err());
    }

    #[test]
    fn test_injected_failure() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x20)
            .fail_reads_at(0x1010)
            .build();

        assert!(reader.read_u32(0x1000).is_ok());
        assert!(reader.read_u32(0x100E).is_err());
        assert!(reader.read_u32(0x1010).is_err());
    }

    #[test]
    fn test_builder_typed_writes() {
        let reader = MockMemoryBuilder::new()
            .write_u32(0, 0x12345678)
            .write_u64(4, 0xDEADBEEFCAFEBABE)
            .write_f32(12, 1.5)
            .write_u8(16, 0x3E)
            .build();

        assert_eq!(reader.read_u32(0x1000).unwrap(), 0x12345678);
        assert_eq!(reader.read_u64(0x1004).unwrap(), 0xDEADBEEFCAFEBABE);
        assert_eq!(reader.read_f32(0x100C).unwrap(), 1.5);
        assert_eq!(reader.read_u8(0x1010).unwrap(), 0x3E);
    }

    #[test]
    fn test_mock_directory() {
        let reader = MockMemoryBuilder::new()
            .pid(77)
            .with_size(0x10)
            .module("Game.exe", 0x400000)
            .build();

        assert_eq!(reader.find_process_id("game.exe").unwrap(), 77);
        assert!(reader.find_process_id("other.exe").is_err());
        assert_eq!(reader.open_process(77).unwrap().pid(), 77);
        assert!(reader.open_process(78).is_err());
        assert_eq!(reader.module_base(77, "GAME.EXE").unwrap(), 0x400000);
        assert!(matches!(
            reader.module_base(77, "missing.dll"),
            Err(Error::ModuleNotFound(_))
        ));
    }
}
