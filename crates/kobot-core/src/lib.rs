//! # kobot-core
//!
//! Core library for the kobot client inspector.
//!
//! This crate provides:
//! - Windows process memory reading and region queries
//! - Address-space snapshots with masked byte-pattern search
//! - Nation-aware field resolution and pointer-chain walking
//! - A cooldown confirmation loop for triggered actions
//! - A TOML field/action registry and a read-only status report

pub mod control;
pub mod error;
pub mod input;
pub mod pattern;
pub mod process;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod session;
pub mod snapshot;
pub mod status;

pub use control::{
    ActionTrigger, Clock, Confirmation, ConfirmOutcome, CooldownLoop, CooldownPolicy,
    CooldownSource, FailureReason, SystemClock,
};
pub use error::{Error, Result};
pub use input::{KeyboardTrigger, SendInputInjector, VirtualKey};
pub use pattern::BytePattern;
pub use process::{
    MemoryReader, PointerWidth, ProcessDirectory, ProcessHandle, ReadMemory, SystemDirectory,
};
pub use registry::{FieldKind, FieldRegistry};
pub use resolve::{NationTag, PointerChainSpec, Resolution, ResolvedField, resolve_all};
pub use retry::{ExponentialBackoff, FixedDelay, RetryStrategy};
pub use session::{ClientSession, FieldValue};
pub use snapshot::MemorySnapshot;
pub use status::{StatusReport, format_status_console, format_status_json};
