//! Cooldown confirmation loop.
//!
//! Triggers an action and watches the action's cooldown timer. The action is
//! considered to have fired once the timer has decreased on
//! `required_decreases` consecutive samples; a confirmation key is then sent.
//! The trigger is pressed on every iteration, including while the timer is
//! already falling, so a press the client drops is repeated.
//!
//! ```text
//! Idle ──(sample > ε)──────────────────────────▶ Failed(AlreadyOnCooldown)
//!  │
//!  ▼
//! Probing ──trigger, settle, sample──▶ decreased? ──no──▶ Probing
//!                                        │yes
//!                                        ▼
//!                                    Confirming ──trigger, settle, sample──▶ decreased? ──no──▶ Probing
//!                                        │ count == required
//!                                        ▼
//!                                    Succeeded (confirm key sent)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use strum::IntoStaticStr;
use tracing::{debug, info};

use crate::control::clock::Clock;
use crate::control::policy::CooldownPolicy;
use crate::error::Result;

/// Produces cooldown readings.
pub trait CooldownSource {
    fn sample(&mut self) -> Result<f32>;
}

/// Fires the action being confirmed, and the final confirmation signal.
pub trait ActionTrigger {
    fn trigger(&mut self) -> Result<()>;
    fn confirm(&mut self) -> Result<()>;
}

impl<S: CooldownSource + ?Sized> CooldownSource for &mut S {
    fn sample(&mut self) -> Result<f32> {
        (**self).sample()
    }
}

impl<T: ActionTrigger + ?Sized> ActionTrigger for &mut T {
    fn trigger(&mut self) -> Result<()> {
        (**self).trigger()
    }

    fn confirm(&mut self) -> Result<()> {
        (**self).confirm()
    }
}

/// One reading and when it was taken, relative to the start of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CooldownSample {
    pub value: f32,
    pub at: Duration,
}

/// Bounded FIFO of recent samples.
#[derive(Debug, Clone)]
pub struct CooldownHistory {
    samples: VecDeque<CooldownSample>,
    capacity: usize,
}

impl CooldownHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: CooldownSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&CooldownSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn to_vec(&self) -> Vec<CooldownSample> {
        self.samples.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr)]
pub enum FailureReason {
    AlreadyOnCooldown,
    TimedOut,
    TriggerBudgetExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confirmation {
    Succeeded,
    Failed(FailureReason),
}

impl Confirmation {
    pub fn is_success(self) -> bool {
        self == Confirmation::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum LoopState {
    Idle,
    Probing,
    Confirming,
    Done(Confirmation),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub confirmation: Confirmation,
    /// Number of times the action was triggered
    pub triggers: u32,
    /// Time spent since the first trigger (zero when nothing was triggered)
    pub elapsed: Duration,
    /// Most recent samples, oldest first
    pub history: Vec<CooldownSample>,
}

/// Runs one confirmation to completion.
pub struct CooldownLoop<'p, C: Clock> {
    policy: &'p CooldownPolicy,
    clock: C,
}

impl<'p, C: Clock> CooldownLoop<'p, C> {
    pub fn new(policy: &'p CooldownPolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    pub fn run<S, T>(&self, source: &mut S, trigger: &mut T) -> Result<ConfirmOutcome>
    where
        S: CooldownSource + ?Sized,
        T: ActionTrigger + ?Sized,
    {
        let policy = self.policy;
        let started = self.clock.now();
        let mut probing_since = None;
        let mut history = CooldownHistory::new(policy.history);
        let mut triggers = 0u32;
        let mut decreases = 0u32;
        let mut state = LoopState::Idle;

        let mut take_sample = |history: &mut CooldownHistory| -> Result<(Option<f32>, f32)> {
            let previous = history.latest().map(|s| s.value);
            let value = source.sample()?;
            history.push(CooldownSample {
                value,
                at: self.clock.now() - started,
            });
            Ok((previous, value))
        };

        loop {
            state = match state {
                LoopState::Idle => {
                    let (_, value) = take_sample(&mut history)?;
                    if value > policy.epsilon {
                        debug!("Cooldown {} already running, not triggering", value);
                        LoopState::Done(Confirmation::Failed(FailureReason::AlreadyOnCooldown))
                    } else {
                        probing_since = Some(self.clock.now());
                        LoopState::Probing
                    }
                }
                LoopState::Probing | LoopState::Confirming => {
                    let since = probing_since.unwrap_or(started);
                    if self.clock.now() - since >= policy.timeout() {
                        LoopState::Done(Confirmation::Failed(FailureReason::TimedOut))
                    } else if policy.max_triggers.is_some_and(|max| triggers >= max) {
                        LoopState::Done(Confirmation::Failed(
                            FailureReason::TriggerBudgetExhausted,
                        ))
                    } else {
                        trigger.trigger()?;
                        triggers += 1;
                        self.clock.sleep(policy.settle_delay());

                        let (previous, value) = take_sample(&mut history)?;
                        let decreased = previous.is_some_and(|p| p - value > policy.epsilon);
                        if decreased {
                            decreases += 1;
                        } else {
                            decreases = 0;
                        }
                        debug!(
                            "{}: sample {} (previous {:?}), {} consecutive decreases",
                            <&'static str>::from(state),
                            value,
                            previous,
                            decreases
                        );

                        if decreases >= policy.required_decreases {
                            trigger.confirm()?;
                            LoopState::Done(Confirmation::Succeeded)
                        } else if decreased {
                            LoopState::Confirming
                        } else {
                            LoopState::Probing
                        }
                    }
                }
                LoopState::Done(confirmation) => {
                    let elapsed = probing_since
                        .map(|since| self.clock.now() - since)
                        .unwrap_or_default();
                    info!(
                        "Confirmation {:?} after {} triggers in {:?}",
                        confirmation, triggers, elapsed
                    );
                    return Ok(ConfirmOutcome {
                        confirmation,
                        triggers,
                        elapsed,
                        history: history.to_vec(),
                    });
                }
            };
        }
    }
}
