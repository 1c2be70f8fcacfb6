//! Skill/field registry loaded from TOML.
//!
//! The registry names every value the tool can read and every action it can
//! trigger, together with how each value is located in the client:
//!
//! ```toml
//! [process]
//! name = "KnightOnLine.exe"
//!
//! [nation]
//! pattern = "54 65 78 74 5F 4E 61 74 69 6F 6E"
//! offset = 0xC4
//!
//! [disambiguation]
//! offset = 0x78
//!
//! [[fields]]
//! name = "spike"
//! kind = "f32"
//! pattern = "53 70 69 6B 65 00 ?? ??"
//! offset = 0x9C
//! nation_specific = true
//!
//! [[actions]]
//! name = "spike"
//! field = "spike"
//! keys = ["F1", "2"]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::control::CooldownPolicy;
use crate::error::{Error, Result};
use crate::input::VirtualKey;
use crate::pattern::BytePattern;
use crate::resolve::chain::PointerChainSpec;
use crate::resolve::nation::{Disambiguation, NationIdentification, NationTag};

/// How the bytes at a resolved address are decoded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    U32,
    #[default]
    F32,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSection {
    /// Executable name of the client
    pub name: String,
    /// Module used for pointer chains that omit one (defaults to `name`)
    #[serde(default)]
    pub module: Option<String>,
}

impl ProcessSection {
    pub fn module(&self) -> &str {
        self.module.as_deref().unwrap_or(&self.name)
    }
}

/// Window of the client's address space copied for pattern search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanWindow {
    pub base: u64,
    pub size: u64,
}

impl Default for ScanWindow {
    /// 0.2 GiB to 1.2 GiB, where the client's heap lives.
    fn default() -> Self {
        Self {
            base: 0x0CCC_CCCC,
            size: 0x4000_0000,
        }
    }
}

/// One fingerprint per faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationPatterns {
    pub karus: BytePattern,
    pub el_morad: BytePattern,
}

impl NationPatterns {
    pub fn for_nation(&self, nation: NationTag) -> &BytePattern {
        match nation {
            NationTag::Karus => &self.karus,
            NationTag::ElMorad => &self.el_morad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub pattern: Option<BytePattern>,
    #[serde(default)]
    pub patterns: Option<NationPatterns>,
    /// Offset from the pattern match to the value
    #[serde(default)]
    pub offset: i64,
    /// The pattern matches once per faction; pick the local player's
    #[serde(default)]
    pub nation_specific: bool,
    #[serde(default)]
    pub chain: Option<PointerChainSpec>,
}

/// Where a field is located, borrowed from its [`FieldSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource<'a> {
    Pattern {
        pattern: &'a BytePattern,
        offset: i64,
        nation_specific: bool,
    },
    PerNation {
        patterns: &'a NationPatterns,
        offset: i64,
    },
    Chain(&'a PointerChainSpec),
}

impl FieldSpec {
    pub fn source(&self) -> Result<FieldSource<'_>> {
        match (&self.pattern, &self.patterns, &self.chain) {
            (Some(pattern), None, None) => Ok(FieldSource::Pattern {
                pattern,
                offset: self.offset,
                nation_specific: self.nation_specific,
            }),
            (None, Some(patterns), None) => Ok(FieldSource::PerNation {
                patterns,
                offset: self.offset,
            }),
            (None, None, Some(chain)) => Ok(FieldSource::Chain(chain)),
            _ => Err(Error::ConfigParseError(format!(
                "field '{}' must have exactly one of `pattern`, `patterns` or `chain`",
                self.name
            ))),
        }
    }

    pub fn needs_snapshot(&self) -> bool {
        self.chain.is_none()
    }

    /// Whether locating the field requires the player's nation.
    pub fn needs_nation(&self) -> bool {
        self.nation_specific || self.patterns.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    /// Cooldown field watched while confirming the action
    pub field: String,
    pub keys: Vec<VirtualKey>,
}

/// A current/maximum pair shown as a bar in status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeSpec {
    pub label: String,
    pub current: String,
    #[serde(default)]
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRegistry {
    pub process: ProcessSection,
    #[serde(default)]
    pub scan: ScanWindow,
    #[serde(default)]
    pub nation: Option<NationIdentification>,
    #[serde(default)]
    pub disambiguation: Option<Disambiguation>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub gauges: Vec<GaugeSpec>,
    #[serde(default)]
    pub control: CooldownPolicy,
}

impl FieldRegistry {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::parse(&content).map_err(|e| match e {
            Error::ConfigParseError(message) => Error::ConfigParseError(format!(
                "{}: {}",
                path.as_ref().display(),
                message
            )),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let registry: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParseError(e.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.process.name.trim().is_empty() {
            return Err(Error::ConfigParseError(
                "process.name must not be empty".to_string(),
            ));
        }
        if self.scan.size == 0 && self.fields.iter().any(FieldSpec::needs_snapshot) {
            return Err(Error::ConfigParseError(
                "scan.size must be non-zero when pattern fields are defined".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(Error::ConfigParseError(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
            match field.source()? {
                FieldSource::Pattern {
                    nation_specific: true,
                    ..
                } => {
                    self.require_nation(&field.name)?;
                    if self.disambiguation.is_none() {
                        return Err(Error::ConfigParseError(format!(
                            "field '{}' is nation_specific but [disambiguation] is missing",
                            field.name
                        )));
                    }
                }
                FieldSource::PerNation { .. } => {
                    if field.nation_specific {
                        return Err(Error::ConfigParseError(format!(
                            "field '{}' sets nation_specific but already has per-nation `patterns`",
                            field.name
                        )));
                    }
                    self.require_nation(&field.name)?
                }
                FieldSource::Chain(_) if field.nation_specific => {
                    return Err(Error::ConfigParseError(format!(
                        "field '{}' sets nation_specific, which only applies to `pattern` fields",
                        field.name
                    )));
                }
                _ => {}
            }
        }

        let mut action_names = HashSet::new();
        for action in &self.actions {
            if !action_names.insert(action.name.as_str()) {
                return Err(Error::ConfigParseError(format!(
                    "duplicate action '{}'",
                    action.name
                )));
            }
            let field = self.field(&action.field).ok_or_else(|| {
                Error::ConfigParseError(format!(
                    "action '{}' references unknown field '{}'",
                    action.name, action.field
                ))
            })?;
            if field.kind != FieldKind::F32 {
                return Err(Error::ConfigParseError(format!(
                    "action '{}' watches field '{}' which is {}, expected f32",
                    action.name,
                    field.name,
                    field.kind.name()
                )));
            }
            if action.keys.is_empty() {
                return Err(Error::ConfigParseError(format!(
                    "action '{}' has no keys",
                    action.name
                )));
            }
        }

        for gauge in &self.gauges {
            for name in std::iter::once(&gauge.current).chain(gauge.max.as_ref()) {
                if self.field(name).is_none() {
                    return Err(Error::ConfigParseError(format!(
                        "gauge '{}' references unknown field '{}'",
                        gauge.label, name
                    )));
                }
            }
        }

        self.control.validate()
    }

    fn require_nation(&self, field: &str) -> Result<()> {
        if self.nation.is_none() {
            return Err(Error::ConfigParseError(format!(
                "field '{}' depends on the player's nation but [nation] is missing",
                field
            )));
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Whether any field is located by pattern search.
    pub fn needs_snapshot(&self) -> bool {
        self.fields.iter().any(FieldSpec::needs_snapshot)
    }

    pub fn needs_nation(&self) -> bool {
        self.fields.iter().any(FieldSpec::needs_nation)
    }
}
