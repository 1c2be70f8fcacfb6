//! Helpers shared across commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use kobot_core::{
    ClientSession, ExponentialBackoff, FieldRegistry, MemoryReader, ProcessHandle, RetryStrategy,
    SystemDirectory,
};
use tracing::{debug, info, warn};

use crate::input;
use crate::shutdown::ShutdownSignal;

pub fn load_registry(path: &Path) -> Result<FieldRegistry> {
    let registry = FieldRegistry::load(path)
        .with_context(|| format!("Failed to load registry {}", path.display()))?;
    info!(
        "Loaded registry {}: {} fields, {} actions",
        path.display(),
        registry.fields.len(),
        registry.actions.len()
    );
    Ok(registry)
}

/// Open the client by PID or by the registry's process name.
pub fn open_process(registry: &FieldRegistry, pid: Option<u32>) -> Result<ProcessHandle> {
    let process = match pid {
        Some(pid) => ProcessHandle::open(pid)?,
        None => ProcessHandle::find_and_open(&registry.process.name)?,
    };
    println!(
        "Found {} (PID: {}, Base: 0x{:X}, Size: 0x{:X})",
        registry.process.name, process.pid, process.base_address, process.module_size
    );
    Ok(process)
}

/// Resolve the registry in `process`, retrying while the client is still
/// loading its data.
pub fn establish_session<'p>(
    process: &'p ProcessHandle,
    registry: &FieldRegistry,
) -> Result<ClientSession<MemoryReader<'p>>> {
    let strategy = ExponentialBackoff::new();
    let max = strategy.max_attempts();
    strategy
        .execute(|attempt| {
            let result = ClientSession::establish(
                MemoryReader::new(process),
                &SystemDirectory,
                process.pid,
                registry,
            );
            if let Err(e) = &result {
                warn!("Attach attempt {}/{} failed: {}", attempt + 1, max, e);
            }
            result
        })
        .context("Failed to resolve the registry")
}

/// Shutdown signal wired to Ctrl+C and the Esc/q console keys.
pub fn setup_shutdown_handler() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());

    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\nShutting down...");
        shutdown_ctrlc.trigger();
    })?;

    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown));
    debug!("Shutdown handlers installed");
    Ok(shutdown)
}

pub fn parse_hex_address(s: &str) -> Result<u64> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(&digits.replace('_', ""), 16)
        .map_err(|e| anyhow!("Invalid hex address '{}': {}", s, e))
}

/// Signed hex offset such as `0x20` or `-0x8`.
pub fn parse_hex_offset(s: &str) -> Result<i64> {
    let (negative, magnitude) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = i64::try_from(parse_hex_address(magnitude)?)
        .map_err(|_| anyhow!("Offset '{}' is too large", s))?;
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0X0CCC_CCCC").unwrap(), 0x0CCC_CCCC);
        assert_eq!(parse_hex_address("ff").unwrap(), 0xFF);
        assert!(parse_hex_address("0xZZ").is_err());
    }

    #[test]
    fn test_parse_hex_offset() {
        assert_eq!(parse_hex_offset("0x20").unwrap(), 0x20);
        assert_eq!(parse_hex_offset("+0x20").unwrap(), 0x20);
        assert_eq!(parse_hex_offset("-0x8").unwrap(), -8);
        assert!(parse_hex_offset("0xFFFFFFFFFFFFFFFF").is_err());
    }
}
