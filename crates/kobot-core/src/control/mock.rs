//! Scripted doubles for driving the cooldown loop in tests.

use std::collections::VecDeque;

use crate::control::cooldown::{ActionTrigger, CooldownSource};
use crate::error::{Error, Result};

/// Returns a fixed sequence of samples, optionally repeating a value forever
/// once the sequence is exhausted. Running out of samples is a read error.
#[derive(Debug, Clone)]
pub struct ScriptedSamples {
    samples: VecDeque<f32>,
    repeat: Option<f32>,
    taken: usize,
}

impl ScriptedSamples {
    pub fn new(samples: &[f32]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            repeat: None,
            taken: 0,
        }
    }

    pub fn then_repeat(mut self, value: f32) -> Self {
        self.repeat = Some(value);
        self
    }

    /// Number of samples handed out so far.
    pub fn taken(&self) -> usize {
        self.taken
    }
}

impl CooldownSource for ScriptedSamples {
    fn sample(&mut self) -> Result<f32> {
        let value = self
            .samples
            .pop_front()
            .or(self.repeat)
            .ok_or_else(|| Error::read_failed(0, "scripted samples exhausted"))?;
        self.taken += 1;
        Ok(value)
    }
}

/// Counts triggers and confirmations.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    pub triggers: u32,
    pub confirms: u32,
    /// Interleaved log of calls, `'T'` for trigger and `'C'` for confirm
    pub calls: String,
}

impl ActionTrigger for RecordingTrigger {
    fn trigger(&mut self) -> Result<()> {
        self.triggers += 1;
        self.calls.push('T');
        Ok(())
    }

    fn confirm(&mut self) -> Result<()> {
        self.confirms += 1;
        self.calls.push('C');
        Ok(())
    }
}
