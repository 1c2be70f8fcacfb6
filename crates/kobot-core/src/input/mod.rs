//! Input simulation for triggering in-game actions.

pub mod keyboard;
pub mod keys;
pub mod trigger;

pub use keyboard::{InputInjector, SendInputInjector, send_key_press};
pub use keys::VirtualKey;
pub use trigger::KeyboardTrigger;
