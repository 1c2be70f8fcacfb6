//! Turning registry entries into addresses in the client.
//!
//! Pattern-sourced fields are found in one [`MemorySnapshot`] of the scan
//! window; chain-sourced fields are walked live. Each field resolves
//! independently: a failure is recorded and the remaining fields still
//! resolve.

pub mod chain;
pub mod nation;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::process::{ProcessDirectory, ReadMemory};
use crate::registry::{FieldKind, FieldRegistry, FieldSource, FieldSpec};
use crate::snapshot::MemorySnapshot;

pub use chain::{PointerChainSpec, resolve_pointer_chain};
pub use nation::{
    Disambiguation, NationIdentification, NationTag, NationTags, locate_for_nation,
    resolve_nation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    Pattern,
    Chain,
}

/// A field address plus how to decode it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    pub address: u64,
    pub kind: FieldKind,
    pub via: ResolvedVia,
}

#[derive(Debug)]
pub struct FieldFailure {
    pub field: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub nation: Option<NationTag>,
    pub fields: Vec<ResolvedField>,
    pub failures: Vec<FieldFailure>,
}

impl Resolution {
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Resolve every field in `registry` inside process `pid`.
///
/// Returns `Err` only for problems that make the whole session unusable:
/// the scan window cannot be copied, or the nation byte is unrecognized while
/// some field depends on it. When the nation fingerprint itself cannot be
/// found, only the fields that depend on the nation fail.
pub fn resolve_all<R, D>(
    reader: &R,
    directory: &D,
    pid: u32,
    registry: &FieldRegistry,
) -> Result<Resolution>
where
    R: ReadMemory + ?Sized,
    D: ProcessDirectory + ?Sized,
{
    let mut resolution = Resolution::default();

    let snapshot = if registry.needs_snapshot() {
        info!(
            "Copying scan window {:#x}..{:#x}",
            registry.scan.base,
            registry.scan.base.saturating_add(registry.scan.size)
        );
        Some(MemorySnapshot::create(
            reader,
            registry.scan.base,
            registry.scan.size as usize,
        )?)
    } else {
        None
    };

    let mut nation_error = None;
    if let (Some(identification), Some(snapshot)) = (&registry.nation, &snapshot) {
        match resolve_nation(snapshot, reader, identification) {
            Ok(nation) => {
                info!("Player nation: {}", nation);
                resolution.nation = Some(nation);
            }
            Err(e @ Error::UnknownNation(_)) if registry.needs_nation() => return Err(e),
            Err(e) => {
                warn!("Player nation unavailable: {}", e);
                nation_error = Some(e);
            }
        }
    }

    for spec in &registry.fields {
        let outcome = resolve_field(
            reader,
            directory,
            pid,
            registry,
            snapshot.as_ref(),
            resolution.nation.ok_or(nation_error.as_ref()),
            spec,
        );
        match outcome {
            Ok(field) => {
                debug!("Resolved {} at {:#x} via {:?}", field.name, field.address, field.via);
                resolution.fields.push(field);
            }
            Err(e) => {
                warn!("Failed to resolve field '{}': {}", spec.name, e);
                resolution.failures.push(FieldFailure {
                    field: spec.name.clone(),
                    error: e,
                });
            }
        }
    }

    info!(
        "Resolved {} of {} fields",
        resolution.fields.len(),
        registry.fields.len()
    );
    Ok(resolution)
}

fn resolve_field<R, D>(
    reader: &R,
    directory: &D,
    pid: u32,
    registry: &FieldRegistry,
    snapshot: Option<&MemorySnapshot>,
    nation: std::result::Result<NationTag, Option<&Error>>,
    spec: &FieldSpec,
) -> Result<ResolvedField>
where
    R: ReadMemory + ?Sized,
    D: ProcessDirectory + ?Sized,
{
    let resolved = |address: u64, via: ResolvedVia| ResolvedField {
        name: spec.name.clone(),
        address,
        kind: spec.kind,
        via,
    };
    let require_snapshot = || {
        snapshot.ok_or_else(|| Error::PatternNotFound(format!("{}: no snapshot", spec.name)))
    };
    let require_nation = || nation.map_err(|cause| nation_unavailable(&spec.name, cause));

    match spec.source()? {
        FieldSource::Chain(chain) if chain.module.is_empty() => {
            let chain = PointerChainSpec {
                module: registry.process.module().to_string(),
                ..chain.clone()
            };
            let address = resolve_pointer_chain(reader, directory, pid, &chain)?;
            Ok(resolved(address, ResolvedVia::Chain))
        }
        FieldSource::Chain(chain) => {
            let address = resolve_pointer_chain(reader, directory, pid, chain)?;
            Ok(resolved(address, ResolvedVia::Chain))
        }
        FieldSource::Pattern {
            pattern,
            offset,
            nation_specific: false,
        } => {
            let anchor = require_snapshot()?.find(pattern, None)?;
            Ok(resolved(
                anchor.wrapping_add_signed(offset),
                ResolvedVia::Pattern,
            ))
        }
        FieldSource::Pattern {
            pattern,
            offset,
            nation_specific: true,
        } => {
            let rule = registry.disambiguation.as_ref().ok_or_else(|| {
                Error::ConfigParseError(format!("{}: [disambiguation] is missing", spec.name))
            })?;
            let anchor = locate_for_nation(
                require_snapshot()?,
                reader,
                &spec.name,
                pattern,
                require_nation()?,
                rule,
            )?;
            Ok(resolved(
                anchor.wrapping_add_signed(offset),
                ResolvedVia::Pattern,
            ))
        }
        FieldSource::PerNation { patterns, offset } => {
            let pattern = patterns.for_nation(require_nation()?);
            let anchor = require_snapshot()?.find(pattern, None)?;
            Ok(resolved(
                anchor.wrapping_add_signed(offset),
                ResolvedVia::Pattern,
            ))
        }
    }
}

/// The failure recorded for a nation-dependent field when the player's
/// nation could not be resolved.
fn nation_unavailable(field: &str, cause: Option<&Error>) -> Error {
    match cause {
        Some(Error::PatternNotFound(pattern)) => {
            Error::PatternNotFound(format!("{}: nation fingerprint {}", field, pattern))
        }
        Some(Error::ReadFailed { address, message }) => Error::ReadFailed {
            address: *address,
            message: format!("{}: nation tag: {}", field, message),
        },
        Some(Error::UnknownNation(byte)) => Error::UnknownNation(*byte),
        Some(other) => {
            Error::ConfigParseError(format!("{}: player nation is unknown: {}", field, other))
        }
        None => Error::ConfigParseError(format!("{}: player nation is unknown", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockMemoryBuilder, MockMemoryReader};

    const PID: u32 = 4242;

    fn registry(fields: &str) -> FieldRegistry {
        FieldRegistry::parse(&format!(
            r#"
            [process]
            name = "game.exe"

            [scan]
            base = 0x1000
            size = 0x400

            [nation]
            pattern = "4E 41 54"
            offset = 0x8

            [disambiguation]
            offset = 0x10

            {}
            "#,
            fields
        ))
        .unwrap()
    }

    fn memory() -> MockMemoryReader {
        MockMemoryBuilder::new()
            .with_size(0x400)
            .module("game.exe", 0x1000)
            // nation marker: Karus
            .write_bytes(0x20, b"NAT")
            .write_u8(0x28, 75)
            // skill fingerprint twice: first El Morad, second Karus
            .write_bytes(0x100, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x110, 38)
            .write_bytes(0x200, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x210, 62)
            // static pointer for a chain
            .write_u32(0x40, 0x1300)
            .build()
    }

    #[test]
    fn test_resolve_all_fields() {
        let registry = registry(
            r#"
            [[fields]]
            name = "spike"
            pattern = "AA BB CC"
            offset = 0x20
            nation_specific = true

            [[fields]]
            name = "marker"
            kind = "u32"
            pattern = "4E 41 54"
            offset = -4

            [[fields]]
            name = "hp"
            kind = "u32"
            [fields.chain]
            base_offset = 0x40
            offsets = [0x8]
            "#,
        );
        let memory = memory();

        let resolution = resolve_all(&memory, &memory, PID, &registry).unwrap();
        assert_eq!(resolution.nation, Some(NationTag::Karus));
        assert!(resolution.failures.is_empty());
        assert_eq!(resolution.field("spike").unwrap().address, 0x1220);
        assert_eq!(resolution.field("marker").unwrap().address, 0x101C);
        let hp = resolution.field("hp").unwrap();
        assert_eq!(hp.address, 0x1308);
        assert_eq!(hp.via, ResolvedVia::Chain);
        assert_eq!(hp.kind, FieldKind::U32);
    }

    #[test]
    fn test_failures_do_not_block_other_fields() {
        let registry = registry(
            r#"
            [[fields]]
            name = "missing"
            pattern = "DE AD BE EF"

            [[fields]]
            name = "broken_chain"
            [fields.chain]
            module = "other.dll"
            base_offset = 0

            [[fields]]
            name = "spike"
            pattern = "AA BB CC"
            nation_specific = true
            "#,
        );
        let memory = memory();

        let resolution = resolve_all(&memory, &memory, PID, &registry).unwrap();
        assert_eq!(resolution.fields.len(), 1);
        assert_eq!(resolution.field("spike").unwrap().address, 0x1200);
        assert_eq!(resolution.failures.len(), 2);
        assert!(matches!(
            resolution.failures[0].error,
            Error::PatternNotFound(_)
        ));
        assert!(matches!(
            resolution.failures[1].error,
            Error::ModuleNotFound(_)
        ));
    }

    #[test]
    fn test_per_nation_patterns() {
        let registry = registry(
            r#"
            [[fields]]
            name = "max_hp"
            kind = "u32"
            offset = 1
            [fields.patterns]
            karus = "AA BB CC"
            el_morad = "4E 41 54"
            "#,
        );
        let memory = memory();

        let resolution = resolve_all(&memory, &memory, PID, &registry).unwrap();
        assert_eq!(resolution.field("max_hp").unwrap().address, 0x1101);
    }

    #[test]
    fn test_unknown_nation_is_fatal() {
        let reg = registry("");
        let memory = MockMemoryBuilder::new()
            .with_size(0x400)
            .write_bytes(0x20, b"NAT")
            .write_u8(0x28, 1)
            .build();

        // No pattern fields means no snapshot, so the nation is not needed.
        let resolution = resolve_all(&memory, &memory, PID, &reg).unwrap();
        assert_eq!(resolution.nation, None);

        // A plain pattern field does not care about the nation byte.
        let reg = registry(
            r#"
            [[fields]]
            name = "marker"
            pattern = "4E 41 54"
            "#,
        );
        let resolution = resolve_all(&memory, &memory, PID, &reg).unwrap();
        assert_eq!(resolution.nation, None);
        assert_eq!(resolution.field("marker").unwrap().address, 0x1020);

        let reg = registry(
            r#"
            [[fields]]
            name = "marker"
            pattern = "4E 41 54"
            nation_specific = true
            "#,
        );
        assert!(matches!(
            resolve_all(&memory, &memory, PID, &reg),
            Err(Error::UnknownNation(1))
        ));
    }

    #[test]
    fn test_missing_nation_fingerprint_fails_dependent_fields_only() {
        let registry = registry(
            r#"
            [[fields]]
            name = "hp"
            kind = "u32"
            pattern = "AA BB CC"
            offset = 4

            [[fields]]
            name = "spike"
            pattern = "AA BB CC"
            nation_specific = true

            [[fields]]
            name = "max_hp"
            kind = "u32"
            [fields.patterns]
            karus = "AA BB CC"
            el_morad = "AA BB CC"
            "#,
        );
        let memory = MockMemoryBuilder::new()
            .with_size(0x400)
            .module("game.exe", 0x1000)
            .write_bytes(0x100, &[0xAA, 0xBB, 0xCC])
            .build();

        let resolution = resolve_all(&memory, &memory, PID, &registry).unwrap();
        assert_eq!(resolution.nation, None);
        assert_eq!(resolution.fields.len(), 1);
        assert_eq!(resolution.field("hp").unwrap().address, 0x1104);

        let failed: Vec<&str> = resolution.failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(failed, vec!["spike", "max_hp"]);
        for failure in &resolution.failures {
            match &failure.error {
                Error::PatternNotFound(message) => {
                    assert!(message.starts_with(&failure.field));
                    assert!(message.contains("nation fingerprint"));
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_scan_window_access_denied_is_fatal() {
        let registry = registry(
            r#"
            [[fields]]
            name = "marker"
            pattern = "4E 41 54"
            "#,
        );
        let memory = MockMemoryBuilder::new()
            .region(0, 0x400, crate::process::Protection::NO_ACCESS)
            .build();

        let err = resolve_all(&memory, &memory, PID, &registry).unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
        assert!(err.is_session_fatal());
    }
}
