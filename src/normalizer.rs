//! Turns raw platform translations into [`KeyValue`]s.
//!
//! All knowledge of platform sentinel values lives here: negative
//! `ToUnicodeEx` returns, X11 dead keysyms, `UCKeyTranslate` dead-key state.

use crate::keymap::{KeyMap, KeyMapEntry, KeyValue};
use crate::keys::PhysicalKey;
use crate::source::{RawKeyData, RawKeyRecord, RawOutput};
use strum::EnumCount;
use tracing::debug;

pub const X11_NO_SYMBOL: u32 = 0;
pub const X11_VOID_SYMBOL: u32 = 0x00ff_ffff;
pub const X11_DEAD_FIRST: u32 = 0xfe50;
pub const X11_DEAD_LAST: u32 = 0xfe93;

/// Builds the canonical-order key map from whatever the source reported.
/// Keys the source did not report get an unassigned `none` cell.
pub fn normalize(raw: &RawKeyData) -> KeyMap {
    let mut by_key: Vec<Option<&RawKeyRecord>> = vec![None; PhysicalKey::COUNT];
    for record in &raw.records {
        let slot = &mut by_key[record.key.index()];
        if slot.is_some() {
            debug!("Duplicate raw record for {}; keeping the first", record.key);
            continue;
        }
        *slot = Some(record);
    }

    let entries = PhysicalKey::canonical_order()
        .zip(by_key)
        .map(|(key, record)| {
            let mut entry = KeyMapEntry::unassigned(key);
            if let Some(record) = record {
                entry.vkey = record.vkey;
                for (modifiers, output) in &record.cells {
                    entry.set(*modifiers, classify(output));
                }
            }
            entry
        })
        .collect();

    KeyMap::from_entries(entries)
}

pub fn classify(raw: &RawOutput) -> KeyValue {
    match raw {
        RawOutput::Windows { ret, units } => classify_windows(*ret, units),
        RawOutput::X11 { keysym, utf8 } => classify_x11(*keysym, utf8),
        RawOutput::Mac {
            status,
            dead_key_state,
            units,
        } => classify_mac(*status, *dead_key_state, units),
        RawOutput::Unresolved => KeyValue::Unassigned,
    }
}

fn classify_windows(ret: i32, units: &[u16]) -> KeyValue {
    if ret < 0 {
        // The buffer holds the spacing form of the dead key.
        let accent = units.first().and_then(|u| printable(std::slice::from_ref(u)));
        return KeyValue::Dead { accent };
    }
    let len = (ret as usize).min(units.len());
    match printable(&units[..len]) {
        Some(s) => KeyValue::Literal(s),
        None => KeyValue::Unassigned,
    }
}

fn classify_x11(keysym: u32, utf8: &str) -> KeyValue {
    if is_dead_keysym(keysym) {
        return KeyValue::Dead {
            accent: dead_keysym_accent(keysym).map(str::to_string),
        };
    }
    if keysym == X11_NO_SYMBOL || keysym == X11_VOID_SYMBOL {
        return KeyValue::Unassigned;
    }
    if utf8.is_empty() || utf8.chars().all(char::is_control) {
        return KeyValue::Unassigned;
    }
    KeyValue::Literal(utf8.to_string())
}

fn classify_mac(status: i32, dead_key_state: u32, units: &[u16]) -> KeyValue {
    if status != 0 {
        return KeyValue::Unassigned;
    }
    if dead_key_state != 0 {
        return KeyValue::Dead {
            accent: printable(units),
        };
    }
    match printable(units) {
        Some(s) => KeyValue::Literal(s),
        None => KeyValue::Unassigned,
    }
}

/// UTF-16 output as a string, unless it is empty or only control characters.
fn printable(units: &[u16]) -> Option<String> {
    let s: String = char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if s.is_empty() || s.chars().all(char::is_control) {
        None
    } else {
        Some(s)
    }
}

pub fn is_dead_keysym(keysym: u32) -> bool {
    (X11_DEAD_FIRST..=X11_DEAD_LAST).contains(&keysym)
}

/// Spacing forms of the common X11 dead keysyms.
pub fn dead_keysym_accent(keysym: u32) -> Option<&'static str> {
    let accent = match keysym {
        0xfe50 => "`",  // dead_grave
        0xfe51 => "´",  // dead_acute
        0xfe52 => "^",  // dead_circumflex
        0xfe53 => "~",  // dead_tilde
        0xfe54 => "¯",  // dead_macron
        0xfe55 => "˘",  // dead_breve
        0xfe56 => "˙",  // dead_abovedot
        0xfe57 => "¨",  // dead_diaeresis
        0xfe58 => "˚",  // dead_abovering
        0xfe59 => "˝",  // dead_doubleacute
        0xfe5a => "ˇ",  // dead_caron
        0xfe5b => "¸",  // dead_cedilla
        0xfe5c => "˛",  // dead_ogonek
        0xfe5d => "ͺ",  // dead_iota
        _ => return None,
    };
    Some(accent)
}
