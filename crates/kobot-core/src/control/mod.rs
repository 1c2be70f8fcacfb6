pub mod clock;
pub mod cooldown;
pub mod policy;

#[doc(hidden)]
pub mod mock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{
    ActionTrigger, Confirmation, ConfirmOutcome, CooldownHistory, CooldownLoop, CooldownSample,
    CooldownSource, FailureReason, LoopState,
};
pub use policy::CooldownPolicy;

#[doc(hidden)]
pub use mock::{RecordingTrigger, ScriptedSamples};
