//! Chain command: walk a pointer chain hop by hop.

use anyhow::Result;
use kobot_core::resolve::resolve_pointer_chain;
use kobot_core::{
    FieldRegistry, MemoryReader, PointerChainSpec, PointerWidth, ReadMemory, SystemDirectory,
};

use super::common::{open_process, parse_hex_address, parse_hex_offset};

pub fn run(
    registry: &FieldRegistry,
    base_offset: &str,
    offsets: &[String],
    module: Option<&str>,
    width: &str,
    pid: Option<u32>,
) -> Result<()> {
    let spec = PointerChainSpec {
        module: module.unwrap_or(registry.process.module()).to_string(),
        base_offset: parse_hex_address(base_offset)?,
        offsets: offsets
            .iter()
            .map(|o| parse_hex_offset(o))
            .collect::<Result<Vec<_>>>()?,
        width: if width == "64" {
            PointerWidth::U64
        } else {
            PointerWidth::U32
        },
    };

    let process = open_process(registry, pid)?;
    let reader = MemoryReader::new(&process);
    println!("Chain {}", spec);

    // Walk each prefix so a broken hop shows where it broke.
    let mut address = 0;
    for hops in 0..=spec.offsets.len() {
        let prefix = PointerChainSpec {
            offsets: spec.offsets[..hops].to_vec(),
            ..spec.clone()
        };
        address = resolve_pointer_chain(&reader, &SystemDirectory, process.pid, &prefix)?;
        println!("  hop {:<2} 0x{:016X}", hops, address);
    }

    println!();
    println!("Final address: 0x{:016X}", address);
    match (reader.read_u32(address), reader.read_f32(address)) {
        (Ok(as_u32), Ok(as_f32)) => println!("  u32: {}  f32: {}", as_u32, as_f32),
        (Err(e), _) | (_, Err(e)) => println!("  unreadable: {}", e),
    }
    Ok(())
}
