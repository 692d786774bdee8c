//! Physical key → platform code tables.
//!
//! Each table is an exhaustive `match` over [`PhysicalKey`], so a key added
//! without a table entry fails to compile. `None` marks a key the platform
//! has no code for (macOS has no PrintScreen, for example).

use crate::error::{KeymapError, KmResult};
use crate::keys::{Platform, PhysicalKey};
use std::collections::HashMap;
use strum::EnumCount;

#[derive(Debug, Clone)]
pub struct ScanCodeTable {
    platform: Platform,
    codes: Vec<Option<u32>>,
}

impl ScanCodeTable {
    pub fn for_platform(platform: Platform) -> KmResult<Self> {
        let lookup: fn(PhysicalKey) -> Option<u32> = match platform {
            Platform::Windows => windows_scan_code,
            Platform::X11 => x11_keycode,
            Platform::MacOs => mac_virtual_key,
        };
        Self::from_fn(platform, lookup)
    }

    /// Builds and verifies a table. Two keys sharing one platform code means
    /// the table drifted from the key enumeration.
    pub fn from_fn<F>(platform: Platform, lookup: F) -> KmResult<Self>
    where
        F: Fn(PhysicalKey) -> Option<u32>,
    {
        let mut codes = Vec::with_capacity(PhysicalKey::COUNT);
        let mut seen: HashMap<u32, PhysicalKey> = HashMap::new();

        for key in PhysicalKey::canonical_order() {
            let code = lookup(key);
            if let Some(c) = code {
                if let Some(prev) = seen.insert(c, key) {
                    return Err(KeymapError::Consistency(format!(
                        "{} table maps both {} and {} to code {:#x}",
                        platform, prev, key, c
                    )));
                }
            }
            codes.push(code);
        }

        Ok(Self { platform, codes })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn code(&self, key: PhysicalKey) -> Option<u32> {
        self.codes[key.index()]
    }

    /// The key universe in canonical order, with each key's platform code.
    pub fn entries(&self) -> impl Iterator<Item = (PhysicalKey, Option<u32>)> + '_ {
        PhysicalKey::canonical_order().zip(self.codes.iter().copied())
    }

    pub fn key_for_code(&self, code: u32) -> Option<PhysicalKey> {
        self.entries()
            .find(|(_, c)| *c == Some(code))
            .map(|(key, _)| key)
    }

    pub fn mapped_count(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }
}

/// PC/AT set-1 scan codes; `0xE0xx` marks extended keys.
pub fn windows_scan_code(key: PhysicalKey) -> Option<u32> {
    use PhysicalKey::*;
    let code = match key {
        KeyA => 0x1e,
        KeyB => 0x30,
        KeyC => 0x2e,
        KeyD => 0x20,
        KeyE => 0x12,
        KeyF => 0x21,
        KeyG => 0x22,
        KeyH => 0x23,
        KeyI => 0x17,
        KeyJ => 0x24,
        KeyK => 0x25,
        KeyL => 0x26,
        KeyM => 0x32,
        KeyN => 0x31,
        KeyO => 0x18,
        KeyP => 0x19,
        KeyQ => 0x10,
        KeyR => 0x13,
        KeyS => 0x1f,
        KeyT => 0x14,
        KeyU => 0x16,
        KeyV => 0x2f,
        KeyW => 0x11,
        KeyX => 0x2d,
        KeyY => 0x15,
        KeyZ => 0x2c,
        Digit1 => 0x02,
        Digit2 => 0x03,
        Digit3 => 0x04,
        Digit4 => 0x05,
        Digit5 => 0x06,
        Digit6 => 0x07,
        Digit7 => 0x08,
        Digit8 => 0x09,
        Digit9 => 0x0a,
        Digit0 => 0x0b,
        Enter => 0x1c,
        Escape => 0x01,
        Backspace => 0x0e,
        Tab => 0x0f,
        Space => 0x39,
        Minus => 0x0c,
        Equal => 0x0d,
        BracketLeft => 0x1a,
        BracketRight => 0x1b,
        Backslash => 0x2b,
        Semicolon => 0x27,
        Quote => 0x28,
        Backquote => 0x29,
        Comma => 0x33,
        Period => 0x34,
        Slash => 0x35,
        CapsLock => 0x3a,
        F1 => 0x3b,
        F2 => 0x3c,
        F3 => 0x3d,
        F4 => 0x3e,
        F5 => 0x3f,
        F6 => 0x40,
        F7 => 0x41,
        F8 => 0x42,
        F9 => 0x43,
        F10 => 0x44,
        F11 => 0x57,
        F12 => 0x58,
        PrintScreen => 0xe037,
        ScrollLock => 0x46,
        Pause => 0x45,
        Insert => 0xe052,
        Home => 0xe047,
        PageUp => 0xe049,
        Delete => 0xe053,
        End => 0xe04f,
        PageDown => 0xe051,
        ArrowRight => 0xe04d,
        ArrowLeft => 0xe04b,
        ArrowDown => 0xe050,
        ArrowUp => 0xe048,
        NumLock => 0xe045,
        NumpadDivide => 0xe035,
        NumpadMultiply => 0x37,
        NumpadSubtract => 0x4a,
        NumpadAdd => 0x4e,
        NumpadEnter => 0xe01c,
        Numpad1 => 0x4f,
        Numpad2 => 0x50,
        Numpad3 => 0x51,
        Numpad4 => 0x4b,
        Numpad5 => 0x4c,
        Numpad6 => 0x4d,
        Numpad7 => 0x47,
        Numpad8 => 0x48,
        Numpad9 => 0x49,
        Numpad0 => 0x52,
        NumpadDecimal => 0x53,
        IntlBackslash => 0x56,
        ContextMenu => 0xe05d,
        NumpadEqual => 0x59,
        IntlRo => 0x73,
        IntlYen => 0x7d,
        ControlLeft => 0x1d,
        ShiftLeft => 0x2a,
        AltLeft => 0x38,
        MetaLeft => 0xe05b,
        ControlRight => 0xe01d,
        ShiftRight => 0x36,
        AltRight => 0xe038,
        MetaRight => 0xe05c,
    };
    Some(code)
}

const VK_NUMPAD0: u32 = 0x60;
const VK_DECIMAL: u32 = 0x6e;

/// Windows virtual keys that must not be derived from the scan code.
///
/// Numpad digit scan codes resolve to their NumLock-off navigation keys
/// (`VK_INSERT`, `VK_END`, ...), which translate to nothing.
pub fn windows_fixed_virtual_key(key: PhysicalKey) -> Option<u32> {
    use PhysicalKey::*;
    let digit = match key {
        Numpad0 => 0,
        Numpad1 => 1,
        Numpad2 => 2,
        Numpad3 => 3,
        Numpad4 => 4,
        Numpad5 => 5,
        Numpad6 => 6,
        Numpad7 => 7,
        Numpad8 => 8,
        Numpad9 => 9,
        NumpadDecimal => return Some(VK_DECIMAL),
        _ => return None,
    };
    Some(VK_NUMPAD0 + digit)
}

/// X11 keycodes (evdev code + 8).
pub fn x11_keycode(key: PhysicalKey) -> Option<u32> {
    use PhysicalKey::*;
    let code = match key {
        KeyA => 38,
        KeyB => 56,
        KeyC => 54,
        KeyD => 40,
        KeyE => 26,
        KeyF => 41,
        KeyG => 42,
        KeyH => 43,
        KeyI => 31,
        KeyJ => 44,
        KeyK => 45,
        KeyL => 46,
        KeyM => 58,
        KeyN => 57,
        KeyO => 32,
        KeyP => 33,
        KeyQ => 24,
        KeyR => 27,
        KeyS => 39,
        KeyT => 28,
        KeyU => 30,
        KeyV => 55,
        KeyW => 25,
        KeyX => 53,
        KeyY => 29,
        KeyZ => 52,
        Digit1 => 10,
        Digit2 => 11,
        Digit3 => 12,
        Digit4 => 13,
        Digit5 => 14,
        Digit6 => 15,
        Digit7 => 16,
        Digit8 => 17,
        Digit9 => 18,
        Digit0 => 19,
        Enter => 36,
        Escape => 9,
        Backspace => 22,
        Tab => 23,
        Space => 65,
        Minus => 20,
        Equal => 21,
        BracketLeft => 34,
        BracketRight => 35,
        Backslash => 51,
        Semicolon => 47,
        Quote => 48,
        Backquote => 49,
        Comma => 59,
        Period => 60,
        Slash => 61,
        CapsLock => 66,
        F1 => 67,
        F2 => 68,
        F3 => 69,
        F4 => 70,
        F5 => 71,
        F6 => 72,
        F7 => 73,
        F8 => 74,
        F9 => 75,
        F10 => 76,
        F11 => 95,
        F12 => 96,
        PrintScreen => 107,
        ScrollLock => 78,
        Pause => 127,
        Insert => 118,
        Home => 110,
        PageUp => 112,
        Delete => 119,
        End => 115,
        PageDown => 117,
        ArrowRight => 114,
        ArrowLeft => 113,
        ArrowDown => 116,
        ArrowUp => 111,
        NumLock => 77,
        NumpadDivide => 106,
        NumpadMultiply => 63,
        NumpadSubtract => 82,
        NumpadAdd => 86,
        NumpadEnter => 104,
        Numpad1 => 87,
        Numpad2 => 88,
        Numpad3 => 89,
        Numpad4 => 83,
        Numpad5 => 84,
        Numpad6 => 85,
        Numpad7 => 79,
        Numpad8 => 80,
        Numpad9 => 81,
        Numpad0 => 90,
        NumpadDecimal => 91,
        IntlBackslash => 94,
        ContextMenu => 135,
        NumpadEqual => 125,
        IntlRo => 97,
        IntlYen => 132,
        ControlLeft => 37,
        ShiftLeft => 50,
        AltLeft => 64,
        MetaLeft => 133,
        ControlRight => 105,
        ShiftRight => 62,
        AltRight => 108,
        MetaRight => 134,
    };
    Some(code)
}

/// Carbon `kVK_*` virtual key codes.
pub fn mac_virtual_key(key: PhysicalKey) -> Option<u32> {
    use PhysicalKey::*;
    let code = match key {
        KeyA => 0x00,
        KeyB => 0x0b,
        KeyC => 0x08,
        KeyD => 0x02,
        KeyE => 0x0e,
        KeyF => 0x03,
        KeyG => 0x05,
        KeyH => 0x04,
        KeyI => 0x22,
        KeyJ => 0x26,
        KeyK => 0x28,
        KeyL => 0x25,
        KeyM => 0x2e,
        KeyN => 0x2d,
        KeyO => 0x1f,
        KeyP => 0x23,
        KeyQ => 0x0c,
        KeyR => 0x0f,
        KeyS => 0x01,
        KeyT => 0x11,
        KeyU => 0x20,
        KeyV => 0x09,
        KeyW => 0x0d,
        KeyX => 0x07,
        KeyY => 0x10,
        KeyZ => 0x06,
        Digit1 => 0x12,
        Digit2 => 0x13,
        Digit3 => 0x14,
        Digit4 => 0x15,
        Digit5 => 0x17,
        Digit6 => 0x16,
        Digit7 => 0x1a,
        Digit8 => 0x1c,
        Digit9 => 0x19,
        Digit0 => 0x1d,
        Enter => 0x24,
        Escape => 0x35,
        Backspace => 0x33,
        Tab => 0x30,
        Space => 0x31,
        Minus => 0x1b,
        Equal => 0x18,
        BracketLeft => 0x21,
        BracketRight => 0x1e,
        Backslash => 0x2a,
        Semicolon => 0x29,
        Quote => 0x27,
        Backquote => 0x32,
        Comma => 0x2b,
        Period => 0x2f,
        Slash => 0x2c,
        CapsLock => 0x39,
        F1 => 0x7a,
        F2 => 0x78,
        F3 => 0x63,
        F4 => 0x76,
        F5 => 0x60,
        F6 => 0x61,
        F7 => 0x62,
        F8 => 0x64,
        F9 => 0x65,
        F10 => 0x6d,
        F11 => 0x67,
        F12 => 0x6f,
        PrintScreen | ScrollLock | Pause => return None,
        Insert => 0x72,
        Home => 0x73,
        PageUp => 0x74,
        Delete => 0x75,
        End => 0x77,
        PageDown => 0x79,
        ArrowRight => 0x7c,
        ArrowLeft => 0x7b,
        ArrowDown => 0x7d,
        ArrowUp => 0x7e,
        NumLock => 0x47,
        NumpadDivide => 0x4b,
        NumpadMultiply => 0x43,
        NumpadSubtract => 0x4e,
        NumpadAdd => 0x45,
        NumpadEnter => 0x4c,
        Numpad1 => 0x53,
        Numpad2 => 0x54,
        Numpad3 => 0x55,
        Numpad4 => 0x56,
        Numpad5 => 0x57,
        Numpad6 => 0x58,
        Numpad7 => 0x59,
        Numpad8 => 0x5b,
        Numpad9 => 0x5c,
        Numpad0 => 0x52,
        NumpadDecimal => 0x41,
        IntlBackslash => 0x0a,
        ContextMenu => 0x6e,
        NumpadEqual => 0x51,
        IntlRo => 0x5e,
        IntlYen => 0x5d,
        ControlLeft => 0x3b,
        ShiftLeft => 0x38,
        AltLeft => 0x3a,
        MetaLeft => 0x37,
        ControlRight => 0x3e,
        ShiftRight => 0x3c,
        AltRight => 0x3d,
        MetaRight => 0x36,
    };
    Some(code)
}
