//! Resolve command: print where every registry field was found.

use anyhow::Result;
use kobot_core::FieldRegistry;
use serde::Serialize;

use super::common::{establish_session, open_process};

#[derive(Serialize)]
struct ResolveOutput<'a> {
    nation: Option<kobot_core::NationTag>,
    fields: &'a [kobot_core::ResolvedField],
    failures: Vec<FailureOutput>,
}

#[derive(Serialize)]
struct FailureOutput {
    field: String,
    error: String,
}

pub fn run(registry: &FieldRegistry, pid: Option<u32>, json: bool) -> Result<()> {
    let process = open_process(registry, pid)?;
    let session = establish_session(&process, registry)?;

    if json {
        let output = ResolveOutput {
            nation: session.nation(),
            fields: session.fields(),
            failures: session
                .failures()
                .iter()
                .map(|f| FailureOutput {
                    field: f.field.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    if let Some(nation) = session.nation() {
        println!("Nation: {}", nation);
    }
    println!("=== Resolved ({}) ===", session.fields().len());
    for field in session.fields() {
        println!(
            "{:<16} 0x{:016X}  {:<4} {:?}",
            field.name,
            field.address,
            field.kind.name(),
            field.via
        );
    }

    if !session.failures().is_empty() {
        println!();
        println!("=== Unresolved ({}) ===", session.failures().len());
        for failure in session.failures() {
            println!("{:<16} {}", failure.field, failure.error);
        }
    }
    Ok(())
}
