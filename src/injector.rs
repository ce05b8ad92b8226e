//! Platform key injection.
//!
//! The loop only needs one primitive: press or release a virtual key. Windows
//! gets it straight from `keybd_event`; other platforms go through `enigo`,
//! which needs the VK code translated to its own key type.

use crate::error::InjectError;
use crate::keymap::KeyCode;
use tracing::debug;

/// Sends a single key-down or key-up event to the OS.
pub trait KeyInjector: Send + Sync {
    fn inject_key(&self, code: KeyCode, down: bool) -> Result<(), InjectError>;
}

/// Logs events instead of sending them. Backs `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInjector;

impl KeyInjector for NoopInjector {
    fn inject_key(&self, code: KeyCode, down: bool) -> Result<(), InjectError> {
        debug!(code, down, "NoopInjector: would inject key");
        Ok(())
    }
}

/// Pick the injector for the current platform.
pub fn default_injector() -> Result<Box<dyn KeyInjector>, InjectError> {
    #[cfg(windows)]
    {
        Ok(Box::new(native::NativeInjector::new()))
    }

    #[cfg(not(windows))]
    {
        Ok(Box::new(enigo_backend::EnigoInjector::new()?))
    }
}

#[cfg(windows)]
pub use native::NativeInjector;

#[cfg(not(windows))]
pub use enigo_backend::EnigoInjector;

#[cfg(windows)]
mod native {
    use super::KeyInjector;
    use crate::error::InjectError;
    use crate::keymap::KeyCode;
    use tracing::debug;
    use winapi::um::winuser::{keybd_event, KEYEVENTF_KEYUP};

    /// Injects keys with `keybd_event`, which takes VK codes directly.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeInjector;

    impl NativeInjector {
        pub fn new() -> Self {
            Self
        }
    }

    impl KeyInjector for NativeInjector {
        fn inject_key(&self, code: KeyCode, down: bool) -> Result<(), InjectError> {
            let vk = u8::try_from(code).map_err(|_| InjectError::UnsupportedCode(code))?;
            let flags = if down { 0 } else { KEYEVENTF_KEYUP };
            debug!(code, down, "keybd_event");
            // SAFETY: keybd_event has no pointer arguments and no failure mode.
            unsafe {
                keybd_event(vk, 0, flags, 0);
            }
            Ok(())
        }
    }
}

#[cfg(not(windows))]
mod enigo_backend {
    use super::KeyInjector;
    use crate::error::InjectError;
    use crate::keymap::KeyCode;
    use enigo::{Direction, Enigo, Keyboard, Settings};
    use std::sync::Mutex;
    use tracing::debug;

    /// Injects keys through `enigo`.
    pub struct EnigoInjector {
        enigo: Mutex<Enigo>,
    }

    impl EnigoInjector {
        pub fn new() -> Result<Self, InjectError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| InjectError::Init(format!("failed to create Enigo: {e}")))?;
            Ok(Self {
                enigo: Mutex::new(enigo),
            })
        }
    }

    impl KeyInjector for EnigoInjector {
        fn inject_key(&self, code: KeyCode, down: bool) -> Result<(), InjectError> {
            let key = super::vk_to_enigo(code).ok_or(InjectError::UnsupportedCode(code))?;
            let direction = if down {
                Direction::Press
            } else {
                Direction::Release
            };
            debug!(code, ?key, down, "injecting key");

            let mut enigo = self
                .enigo
                .lock()
                .map_err(|_| InjectError::Failed("input backend lock poisoned".to_string()))?;
            enigo
                .key(key, direction)
                .map_err(|e| InjectError::Failed(e.to_string()))
        }
    }
}

/// Translate a VK code from the key table into an `enigo` key.
#[cfg(not(windows))]
pub(crate) fn vk_to_enigo(code: KeyCode) -> Option<enigo::Key> {
    use enigo::Key;

    let key = match code {
        0x41..=0x5A => Key::Unicode(char::from(code as u8).to_ascii_lowercase()),
        0x30..=0x39 => Key::Unicode(char::from(code as u8)),
        0x0D => Key::Return,
        0x20 => Key::Space,
        0x09 => Key::Tab,
        0x1B => Key::Escape,
        0x08 => Key::Backspace,
        0x2E => Key::Delete,
        0x24 => Key::Home,
        0x23 => Key::End,
        0x21 => Key::PageUp,
        0x22 => Key::PageDown,
        0x26 => Key::UpArrow,
        0x28 => Key::DownArrow,
        0x25 => Key::LeftArrow,
        0x27 => Key::RightArrow,
        0x70 => Key::F1,
        0x71 => Key::F2,
        0x72 => Key::F3,
        0x73 => Key::F4,
        0x74 => Key::F5,
        0x75 => Key::F6,
        0x76 => Key::F7,
        0x77 => Key::F8,
        0x78 => Key::F9,
        0x79 => Key::F10,
        0x7A => Key::F11,
        0x7B => Key::F12,
        _ => return None,
    };

    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_injector_accepts_everything() {
        let injector = NoopInjector;
        assert!(injector.inject_key(0x41, true).is_ok());
        assert!(injector.inject_key(0xFFFF, false).is_ok());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_vk_to_enigo_covers_key_table() {
        use crate::keymap::KeySymbolTable;

        for (name, code) in KeySymbolTable::global().symbols() {
            assert!(vk_to_enigo(code).is_some(), "no enigo mapping for '{name}'");
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn test_vk_to_enigo_values() {
        use enigo::Key;

        assert!(matches!(vk_to_enigo(0x41), Some(Key::Unicode('a'))));
        assert!(matches!(vk_to_enigo(0x35), Some(Key::Unicode('5'))));
        assert!(matches!(vk_to_enigo(0x0D), Some(Key::Return)));
        assert!(matches!(vk_to_enigo(0x7B), Some(Key::F12)));
        assert!(vk_to_enigo(0x10).is_none());
    }
}
