//! Keyboard input simulation via SendInput API.
//!
//! Uses scan codes with `KEYEVENTF_SCANCODE` so that DirectInput-based game
//! clients recognize the input.

use std::time::Duration;

use crate::error::Result;
use crate::input::keys::VirtualKey;

/// Something that can press and release a key in the foreground window.
pub trait InputInjector {
    fn press_and_release(&mut self, key: VirtualKey, hold: Duration) -> Result<()>;
}

/// Injects keys system-wide through `SendInput`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendInputInjector;

impl InputInjector for SendInputInjector {
    fn press_and_release(&mut self, key: VirtualKey, hold: Duration) -> Result<()> {
        send_key_press(key, hold)
    }
}

/// Send a key press (down + delay + up) for the given key.
///
/// Extended keys (arrows, navigation block) get `KEYEVENTF_EXTENDEDKEY`.
#[cfg(target_os = "windows")]
pub fn send_key_press(key: VirtualKey, hold: Duration) -> Result<()> {
    use crate::error::Error;
    use windows::Win32::UI::Input::KeyboardAndMouse::*;

    // SAFETY: MapVirtualKeyW has no preconditions beyond a valid mapping type.
    let scan = unsafe { MapVirtualKeyW(key.code() as u32, MAPVK_VK_TO_VSC) } as u16;
    if scan == 0 {
        return Err(Error::InputFailed(format!("No scan code for key {}", key)));
    }

    let mut flags_down = KEYEVENTF_SCANCODE;
    let mut flags_up = KEYEVENTF_SCANCODE | KEYEVENTF_KEYUP;
    if key.is_extended() {
        flags_down |= KEYEVENTF_EXTENDEDKEY;
        flags_up |= KEYEVENTF_EXTENDEDKEY;
    }

    let event = |flags: KEYBD_EVENT_FLAGS| INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    // SAFETY: SendInput is called with a properly initialized one-element INPUT array.
    let sent = unsafe { SendInput(&[event(flags_down)], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        return Err(Error::InputFailed(format!(
            "SendInput (key down {}) failed: {}",
            key,
            std::io::Error::last_os_error()
        )));
    }

    std::thread::sleep(hold);

    // SAFETY: as above.
    let sent = unsafe { SendInput(&[event(flags_up)], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        return Err(Error::InputFailed(format!(
            "SendInput (key up {}) failed: {}",
            key,
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub fn send_key_press(key: VirtualKey, _hold: Duration) -> Result<()> {
    Err(crate::error::Error::InputFailed(format!(
        "SendInput is only supported on Windows (key {})",
        key
    )))
}
