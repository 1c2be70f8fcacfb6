//! Memory region descriptors returned by region queries.
//!
//! Protection values use the Windows page-protection encoding so that the
//! mock reader and the live reader agree on what "readable" means.

use serde::Serialize;

/// Raw page-protection constants (`PAGE_*`).
pub mod page {
    pub const NOACCESS: u32 = 0x01;
    pub const READONLY: u32 = 0x02;
    pub const READWRITE: u32 = 0x04;
    pub const WRITECOPY: u32 = 0x08;
    pub const EXECUTE: u32 = 0x10;
    pub const EXECUTE_READ: u32 = 0x20;
    pub const EXECUTE_READWRITE: u32 = 0x40;
    pub const EXECUTE_WRITECOPY: u32 = 0x80;
    pub const GUARD: u32 = 0x100;
    pub const TARGETS_INVALID: u32 = 0x4000_0000;
}

/// Page protection of a region.
///
/// A value of zero means the region is not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Protection(pub u32);

impl Protection {
    pub const UNCOMMITTED: Protection = Protection(0);
    pub const NO_ACCESS: Protection = Protection(page::NOACCESS);
    pub const READ_ONLY: Protection = Protection(page::READONLY);
    pub const READ_WRITE: Protection = Protection(page::READWRITE);
    pub const EXECUTE_READ: Protection = Protection(page::EXECUTE_READ);

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether a read of this region can be attempted.
    ///
    /// Uncommitted, guarded, no-access, execute-only and copy-on-write pages
    /// are skipped.
    pub fn is_readable(self) -> bool {
        if self.0 == 0 || self.0 & page::GUARD != 0 || self.0 == page::TARGETS_INVALID {
            return false;
        }
        !matches!(
            self.0 & 0xFF,
            page::NOACCESS | page::EXECUTE | page::WRITECOPY | page::EXECUTE_WRITECOPY
        )
    }
}

/// One contiguous region of the target's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub protection: Protection,
}

impl MemoryRegion {
    pub fn new(base: u64, size: u64, protection: Protection) -> Self {
        Self {
            base,
            size,
            protection,
        }
    }

    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    pub fn is_readable(&self) -> bool {
        self.protection.is_readable()
    }
}
