//! Platform keyboard sources: the only code that talks to the OS.

pub mod fixture;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod win32;
#[cfg(all(
    unix,
    not(target_os = "macos"),
    not(target_os = "ios"),
    not(target_os = "android")
))]
mod xkb;

use crate::error::KmResult;
use crate::keymap::KeyboardLayoutInfo;
use crate::keys::{ModifierState, Platform, PhysicalKey};
use crate::scancodes::ScanCodeTable;
use std::sync::Arc;

pub use fixture::FixtureSource;

/// Untranslated result of asking the OS what a key/modifier pair produces.
/// Only the normalizer interprets these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// `ToUnicodeEx` return value and the UTF-16 units it wrote.
    Windows { ret: i32, units: Vec<u16> },
    /// xkbcommon keysym and its UTF-8 rendering.
    X11 { keysym: u32, utf8: String },
    /// `UCKeyTranslate` status, resulting dead-key state and UTF-16 output.
    Mac {
        status: i32,
        dead_key_state: u32,
        units: Vec<u16>,
    },
    /// The OS could not translate this pair at all.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyRecord {
    pub key: PhysicalKey,
    /// The OS virtual-key code behind `key`, where the platform has one.
    pub vkey: Option<u32>,
    pub cells: Vec<(ModifierState, RawOutput)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawKeyData {
    pub records: Vec<RawKeyRecord>,
}

impl RawKeyData {
    pub fn unresolved(&self) -> impl Iterator<Item = (PhysicalKey, ModifierState)> + '_ {
        self.records.iter().flat_map(|r| {
            r.cells
                .iter()
                .filter(|(_, raw)| *raw == RawOutput::Unresolved)
                .map(move |(m, _)| (r.key, *m))
        })
    }
}

pub trait KeyboardSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Modifier chords this source reads for every key.
    fn supported_modifiers(&self) -> &'static [ModifierState] {
        ModifierState::ALL
    }

    /// `Ok(None)` when the OS has no determinable active layout.
    fn current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>>;

    /// Translates every mapped key in `table` under every supported chord.
    fn raw_key_data(&self, table: &ScanCodeTable) -> KmResult<RawKeyData>;

    /// Whether the physical keyboard is ISO-shaped. Only macOS reports a
    /// keyboard type; elsewhere this is unknown.
    fn is_iso_keyboard(&self) -> KmResult<Option<bool>> {
        Ok(None)
    }
}

/// The source for the OS this binary targets, or `None` where no source
/// exists.
pub fn select_platform_source() -> Option<Arc<dyn KeyboardSource>> {
    #[cfg(target_os = "windows")]
    {
        Some(Arc::new(win32::Win32Source::new()))
    }
    #[cfg(target_os = "macos")]
    {
        Some(Arc::new(macos::MacSource::new()))
    }
    #[cfg(all(
        unix,
        not(target_os = "macos"),
        not(target_os = "ios"),
        not(target_os = "android")
    ))]
    {
        Some(Arc::new(xkb::XkbSource::new()))
    }
    #[cfg(not(any(
        target_os = "windows",
        all(unix, not(target_os = "ios"), not(target_os = "android"))
    )))]
    {
        None
    }
}
