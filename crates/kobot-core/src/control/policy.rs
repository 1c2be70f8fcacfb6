use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::input::VirtualKey;

/// Tuning of the cooldown confirmation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownPolicy {
    /// Minimum change treated as a real decrease; also the "idle" threshold
    pub epsilon: f32,
    /// Consecutive decreases needed before confirming
    pub required_decreases: u32,
    /// Number of samples kept per confirmation
    pub history: usize,
    pub settle_delay_ms: u64,
    pub timeout_ms: u64,
    pub key_hold_ms: u64,
    /// Upper bound on triggers per confirmation (unbounded when unset)
    pub max_triggers: Option<u32>,
    pub confirm_key: VirtualKey,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            required_decreases: 3,
            history: 3,
            settle_delay_ms: 50,
            timeout_ms: 3000,
            key_hold_ms: 10,
            max_triggers: None,
            confirm_key: VirtualKey::R,
        }
    }
}

impl CooldownPolicy {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::ConfigParseError(format!(
                "control.epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        if self.required_decreases == 0 {
            return Err(Error::ConfigParseError(
                "control.required_decreases must be at least 1".to_string(),
            ));
        }
        if self.history == 0 {
            return Err(Error::ConfigParseError(
                "control.history must be at least 1".to_string(),
            ));
        }
        if self.max_triggers == Some(0) {
            return Err(Error::ConfigParseError(
                "control.max_triggers must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
