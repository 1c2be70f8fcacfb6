//! Scan command: search a copied window of the client for a byte pattern.

use anyhow::Result;
use kobot_core::{BytePattern, FieldRegistry, MemoryReader, MemorySnapshot};

use super::common::{open_process, parse_hex_address};

const PREVIEW_LEN: usize = 16;

pub fn run(
    registry: &FieldRegistry,
    pattern: &str,
    base: Option<&str>,
    size: Option<&str>,
    limit: usize,
    pid: Option<u32>,
) -> Result<()> {
    let pattern: BytePattern = pattern.parse()?;
    let base = base.map(parse_hex_address).transpose()?.unwrap_or(registry.scan.base);
    let size = size.map(parse_hex_address).transpose()?.unwrap_or(registry.scan.size);

    let process = open_process(registry, pid)?;
    let reader = MemoryReader::new(&process);

    println!("Copying 0x{:X}..0x{:X}...", base, base.saturating_add(size));
    let snapshot = MemorySnapshot::create(&reader, base, usize::try_from(size)?)?;
    println!(
        "{} of {} bytes readable, {} unreadable ranges",
        snapshot.readable_bytes(),
        snapshot.len(),
        snapshot.unreadable_ranges().len()
    );

    let hits = snapshot.find_all(&pattern);
    println!();
    println!("=== {} matches for {} ===", hits.len(), pattern);
    for address in hits.iter().take(limit) {
        let available = (snapshot.end() - address).min(PREVIEW_LEN as u64) as usize;
        let preview = snapshot
            .slice_at(*address, available)?
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        println!("0x{:016X}  {}", address, preview);
    }
    if hits.len() > limit {
        println!("... {} more", hits.len() - limit);
    }
    Ok(())
}
