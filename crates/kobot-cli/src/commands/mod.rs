//! CLI command implementations.

pub mod chain;
pub mod common;
pub mod resolve;
pub mod run;
pub mod scan;
pub mod status;
