use std::time::Duration;

use tracing::debug;

use crate::control::ActionTrigger;
use crate::error::{Error, Result};
use crate::input::keyboard::InputInjector;
use crate::input::keys::VirtualKey;

/// Triggers an action by pressing its key sequence, and confirms with a
/// single key.
///
/// Skill bars are usually addressed as a page key followed by a slot key
/// (`["F1", "2"]`), so a trigger may be several keys pressed in order.
pub struct KeyboardTrigger<I: InputInjector> {
    injector: I,
    keys: Vec<VirtualKey>,
    confirm_key: VirtualKey,
    hold: Duration,
}

impl<I: InputInjector> KeyboardTrigger<I> {
    pub fn new(
        injector: I,
        keys: Vec<VirtualKey>,
        confirm_key: VirtualKey,
        hold: Duration,
    ) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidKey("empty key sequence".to_string()));
        }
        Ok(Self {
            injector,
            keys,
            confirm_key,
            hold,
        })
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }
}

impl<I: InputInjector> ActionTrigger for KeyboardTrigger<I> {
    fn trigger(&mut self) -> Result<()> {
        for key in &self.keys {
            self.injector.press_and_release(*key, self.hold)?;
        }
        debug!("Sent key sequence {:?}", self.keys);
        Ok(())
    }

    fn confirm(&mut self) -> Result<()> {
        self.injector.press_and_release(self.confirm_key, self.hold)
    }
}
