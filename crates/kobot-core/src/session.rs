//! An attached client: resolved fields plus the reader used to sample them.
//!
//! A [`ClientSession`] is built once per attach and borrowed by whoever needs
//! it (the action loop, the status loop). Addresses are only valid while the
//! client process that they were resolved in keeps running.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::control::{
    ActionTrigger, Clock, ConfirmOutcome, CooldownLoop, CooldownPolicy, CooldownSource,
};
use crate::error::{Error, Result};
use crate::process::{ProcessDirectory, ReadMemory};
use crate::registry::{ActionSpec, FieldKind, FieldRegistry};
use crate::resolve::{FieldFailure, NationTag, Resolution, ResolvedField, resolve_all};

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    U32(u32),
    F32(f32),
}

impl FieldValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FieldValue::U32(v) => f64::from(v),
            FieldValue::F32(v) => f64::from(v),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::F32(v) => write!(f, "{:.2}", v),
        }
    }
}

pub struct ClientSession<R: ReadMemory> {
    reader: R,
    pid: u32,
    process_name: String,
    nation: Option<NationTag>,
    fields: Vec<ResolvedField>,
    failures: Vec<FieldFailure>,
    actions: Vec<ActionSpec>,
    policy: CooldownPolicy,
    established_at: DateTime<Local>,
}

impl<R: ReadMemory> ClientSession<R> {
    /// Resolve every registry field in process `pid` and attach.
    pub fn establish<D: ProcessDirectory + ?Sized>(
        reader: R,
        directory: &D,
        pid: u32,
        registry: &FieldRegistry,
    ) -> Result<Self> {
        let resolution = resolve_all(&reader, directory, pid, registry)?;
        let session = Self::from_resolution(reader, pid, registry, resolution);
        info!(
            "Attached to {} (PID {}): {} fields, {} unresolved",
            session.process_name,
            pid,
            session.fields.len(),
            session.failures.len()
        );
        Ok(session)
    }

    pub fn from_resolution(
        reader: R,
        pid: u32,
        registry: &FieldRegistry,
        resolution: Resolution,
    ) -> Self {
        Self {
            reader,
            pid,
            process_name: registry.process.name.clone(),
            nation: resolution.nation,
            fields: resolution.fields,
            failures: resolution.failures,
            actions: registry.actions.clone(),
            policy: registry.control.clone(),
            established_at: Local::now(),
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn nation(&self) -> Option<NationTag> {
        self.nation
    }

    pub fn established_at(&self) -> DateTime<Local> {
        self.established_at
    }

    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    pub fn actions(&self) -> &[ActionSpec] {
        &self.actions
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    pub fn field(&self, name: &str) -> Result<&ResolvedField> {
        if let Some(field) = self.fields.iter().find(|f| f.name == name) {
            return Ok(field);
        }
        match self.failures.iter().find(|f| f.field == name) {
            Some(failure) => Err(Error::UnknownField(format!(
                "{} (unresolved: {})",
                name, failure.error
            ))),
            None => Err(Error::UnknownField(name.to_string())),
        }
    }

    pub fn action(&self, name: &str) -> Result<&ActionSpec> {
        self.actions
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::UnknownAction(name.to_string()))
    }

    pub fn read(&self, name: &str) -> Result<FieldValue> {
        let field = self.field(name)?;
        match field.kind {
            FieldKind::U32 => self.reader.read_u32(field.address).map(FieldValue::U32),
            FieldKind::F32 => self.reader.read_f32(field.address).map(FieldValue::F32),
        }
    }

    pub fn read_f32(&self, name: &str) -> Result<f32> {
        let field = self.expect_kind(name, FieldKind::F32)?;
        self.reader.read_f32(field.address)
    }

    pub fn read_u32(&self, name: &str) -> Result<u32> {
        let field = self.expect_kind(name, FieldKind::U32)?;
        self.reader.read_u32(field.address)
    }

    fn expect_kind(&self, name: &str, kind: FieldKind) -> Result<&ResolvedField> {
        let field = self.field(name)?;
        if field.kind != kind {
            return Err(Error::FieldKindMismatch {
                field: name.to_string(),
                expected: kind.name(),
                actual: field.kind.name(),
            });
        }
        Ok(field)
    }

    /// Sampler over an `f32` field, usable as a cooldown source.
    pub fn sampler(&self, name: &str) -> Result<FieldSampler<'_, R>> {
        let field = self.expect_kind(name, FieldKind::F32)?;
        Ok(FieldSampler {
            reader: &self.reader,
            address: field.address,
        })
    }

    /// Trigger action `name` and confirm through its cooldown field.
    pub fn confirm_action<T, C>(&self, name: &str, trigger: &mut T, clock: C) -> Result<ConfirmOutcome>
    where
        T: ActionTrigger + ?Sized,
        C: Clock,
    {
        let action = self.action(name)?;
        let mut sampler = self.sampler(&action.field)?;
        let outcome = CooldownLoop::new(&self.policy, clock).run(&mut sampler, trigger)?;
        if !outcome.confirmation.is_success() {
            warn!(
                "Action '{}' not confirmed: {:?} after {} triggers",
                name, outcome.confirmation, outcome.triggers
            );
        }
        Ok(outcome)
    }
}

/// Reads one `f32` address on every sample.
pub struct FieldSampler<'s, R: ReadMemory> {
    reader: &'s R,
    address: u64,
}

impl<R: ReadMemory> CooldownSource for FieldSampler<'_, R> {
    fn sample(&mut self) -> Result<f32> {
        self.reader.read_f32(self.address)
    }
}
