//! Pointer-chain resolution from a module-relative static address.
//!
//! A chain `[game.exe+0x1234]+0x20-0x8` reads a pointer at
//! `module_base + 0x1234`, adds `0x20`, reads a pointer there, adds `-0x8`,
//! and yields the final address.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::process::{PointerWidth, ProcessDirectory, ReadMemory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChainSpec {
    /// Module whose load address starts the chain; empty means the
    /// registry's process module
    #[serde(default)]
    pub module: String,
    /// Offset from the module base to the first pointer
    pub base_offset: u64,
    /// Offsets applied after each dereference, in order
    #[serde(default)]
    pub offsets: Vec<i64>,
    #[serde(default)]
    pub width: PointerWidth,
}

impl fmt::Display for PointerChainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}+0x{:X}]", self.module, self.base_offset)?;
        for offset in &self.offsets {
            if *offset >= 0 {
                write!(f, "+0x{:X}", offset)?;
            } else {
                write!(f, "-0x{:X}", offset.unsigned_abs())?;
            }
        }
        Ok(())
    }
}

/// Walk `spec` in process `pid` and return the final address.
///
/// Every hop reads a pointer at the current address and adds the next
/// offset. A failed read or a null pointer aborts the walk; no partial
/// address is ever returned.
pub fn resolve_pointer_chain<R, D>(
    reader: &R,
    directory: &D,
    pid: u32,
    spec: &PointerChainSpec,
) -> Result<u64>
where
    R: ReadMemory + ?Sized,
    D: ProcessDirectory + ?Sized,
{
    let module_base = directory.module_base(pid, &spec.module)?;
    let mut current = module_base.wrapping_add(spec.base_offset);
    debug!("Chain {}: module base {:#x}, start {:#x}", spec, module_base, current);

    for (hop, offset) in spec.offsets.iter().enumerate() {
        let pointer = reader.read_pointer(current, spec.width).map_err(|e| match e {
            Error::ReadFailed { address, message } => Error::read_failed(
                address,
                format!("chain {} hop {}: {}", spec, hop, message),
            ),
            other => other,
        })?;

        if pointer == 0 {
            return Err(Error::read_failed(
                current,
                format!("chain {} hop {}: null pointer", spec, hop),
            ));
        }

        current = pointer.wrapping_add_signed(*offset);
        debug!("Chain hop {}: {:#x} + {} -> {:#x}", hop, pointer, offset, current);
    }

    Ok(current)
}
