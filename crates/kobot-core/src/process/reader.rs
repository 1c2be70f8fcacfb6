#![cfg_attr(not(target_os = "windows"), allow(dead_code, unused_variables))]

use crate::error::{Error, Result};
use crate::process::ProcessHandle;
use crate::process::region::MemoryRegion;

#[cfg(target_os = "windows")]
use crate::process::region::Protection;
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
#[cfg(target_os = "windows")]
use windows::Win32::System::Memory::{MEM_COMMIT, MEMORY_BASIC_INFORMATION, VirtualQueryEx};

/// Width of a pointer stored in the target's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PointerWidth {
    #[default]
    #[serde(rename = "32")]
    U32,
    #[serde(rename = "64")]
    U64,
}

impl PointerWidth {
    pub fn size(self) -> usize {
        match self {
            PointerWidth::U32 => 4,
            PointerWidth::U64 => 8,
        }
    }
}

/// Trait for reading memory from a process or buffer
///
/// This trait enables mocking for tests and abstracts over different memory sources.
pub trait ReadMemory {
    /// Read raw bytes from memory at the given address
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Describe the region containing `address`
    fn query_region(&self, address: u64) -> Result<MemoryRegion>;

    /// Get the base address of the main module
    fn base_address(&self) -> u64;

    fn read_u8(&self, address: u64) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    /// Read an unsigned 32-bit integer from memory
    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an unsigned 64-bit integer from memory
    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a 32-bit float from memory
    fn read_f32(&self, address: u64) -> Result<f32> {
        self.read_u32(address).map(f32::from_bits)
    }

    /// Read a pointer value stored at `address`
    fn read_pointer(&self, address: u64, width: PointerWidth) -> Result<u64> {
        match width {
            PointerWidth::U32 => self.read_u32(address).map(u64::from),
            PointerWidth::U64 => self.read_u64(address),
        }
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn query_region(&self, address: u64) -> Result<MemoryRegion> {
        (**self).query_region(address)
    }

    fn base_address(&self) -> u64 {
        (**self).base_address()
    }
}

pub struct MemoryReader<'a> {
    process: &'a ProcessHandle,
}

impl<'a> MemoryReader<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        self.process
    }

    #[cfg(target_os = "windows")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - A valid process handle from ProcessHandle (obtained via OpenProcess with PROCESS_VM_READ)
        // - An address within the target process's address space
        // - A properly allocated buffer of the requested size
        // - A pointer to receive the actual bytes read
        // The function may fail if the address is invalid, but this is handled via Result.
        unsafe {
            ReadProcessMemory(
                self.process.handle(),
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::read_failed(address, e.to_string()))?;
        }

        // All-or-nothing: a short read of a scalar or a pointer is as bad as no read.
        if bytes_read != size {
            return Err(Error::read_failed(
                address,
                format!("Expected {} bytes, read {}", size, bytes_read),
            ));
        }

        Ok(buffer)
    }

    #[cfg(not(target_os = "windows"))]
    fn read_bytes_impl(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::read_failed(
            address,
            "Windows only: memory reading not supported on this platform",
        ))
    }

    #[cfg(target_os = "windows")]
    fn query_region_impl(&self, address: u64) -> Result<MemoryRegion> {
        let mut info = MEMORY_BASIC_INFORMATION::default();

        // SAFETY: VirtualQueryEx writes at most size_of::<MEMORY_BASIC_INFORMATION>() bytes
        // into `info`, which is a properly initialized local. The handle was opened with
        // PROCESS_QUERY_INFORMATION.
        let written = unsafe {
            VirtualQueryEx(
                self.process.handle(),
                Some(address as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };

        if written == 0 {
            return Err(Error::read_failed(
                address,
                format!("VirtualQueryEx failed: {}", std::io::Error::last_os_error()),
            ));
        }

        let protection = if info.State == MEM_COMMIT {
            Protection::from_raw(info.Protect.0)
        } else {
            Protection::UNCOMMITTED
        };

        Ok(MemoryRegion::new(
            info.BaseAddress as u64,
            info.RegionSize as u64,
            protection,
        ))
    }

    #[cfg(not(target_os = "windows"))]
    fn query_region_impl(&self, address: u64) -> Result<MemoryRegion> {
        Err(Error::read_failed(
            address,
            "Windows only: region queries not supported on this platform",
        ))
    }
}

impl ReadMemory for MemoryReader<'_> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.read_bytes_impl(address, size)
    }

    fn query_region(&self, address: u64) -> Result<MemoryRegion> {
        self.query_region_impl(address)
    }

    fn base_address(&self) -> u64 {
        self.process.base_address
    }
}
