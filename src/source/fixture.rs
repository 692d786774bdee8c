//! A scripted [`KeyboardSource`] that never touches the OS.
//!
//! Hosts use it to exercise their key map handling without a live session;
//! every integration test in this crate runs against it.

use super::{KeyboardSource, RawKeyData, RawKeyRecord, RawOutput};
use crate::error::{KeymapError, KmResult};
use crate::keymap::KeyboardLayoutInfo;
use crate::keys::{ModifierState, Platform, PhysicalKey};
use crate::scancodes::ScanCodeTable;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FixtureSource {
    platform: Platform,
    layout: Option<KeyboardLayoutInfo>,
    cells: BTreeMap<PhysicalKey, Vec<(ModifierState, RawOutput)>>,
    vkeys: BTreeMap<PhysicalKey, u32>,
    iso: Option<bool>,
    unavailable: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl FixtureSource {
    /// A source for `platform` reporting no layout and no keys.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            layout: None,
            cells: BTreeMap::new(),
            vkeys: BTreeMap::new(),
            iso: None,
            unavailable: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that fails every call as if no session were reachable.
    pub fn unavailable(platform: Platform, reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new(platform)
        }
    }

    pub fn with_layout(mut self, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.layout = Some(KeyboardLayoutInfo::new(id, display_name));
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_iso_keyboard(mut self, iso: bool) -> Self {
        self.iso = Some(iso);
        self
    }

    pub fn with_vkey(mut self, key: PhysicalKey, vkey: u32) -> Self {
        self.vkeys.insert(key, vkey);
        self
    }

    /// Source calls started so far, shared by every clone of this fixture.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn with_raw(mut self, key: PhysicalKey, modifiers: ModifierState, raw: RawOutput) -> Self {
        let cells = self.cells.entry(key).or_default();
        cells.retain(|(m, _)| *m != modifiers);
        cells.push((modifiers, raw));
        self
    }

    /// Scripts `key` + `modifiers` to produce `text`, encoded the way this
    /// source's platform would report it.
    pub fn with_literal(self, key: PhysicalKey, modifiers: ModifierState, text: &str) -> Self {
        let raw = match self.platform {
            Platform::Windows => {
                let units: Vec<u16> = text.encode_utf16().collect();
                RawOutput::Windows {
                    ret: units.len() as i32,
                    units,
                }
            }
            Platform::X11 => RawOutput::X11 {
                keysym: text.chars().next().map(unicode_keysym).unwrap_or(0),
                utf8: text.to_string(),
            },
            Platform::MacOs => RawOutput::Mac {
                status: 0,
                dead_key_state: 0,
                units: text.encode_utf16().collect(),
            },
        };
        self.with_raw(key, modifiers, raw)
    }

    /// Scripts a dead key whose spacing accent is `accent`.
    pub fn with_dead_key(self, key: PhysicalKey, modifiers: ModifierState, accent: char) -> Self {
        let raw = match self.platform {
            Platform::Windows => RawOutput::Windows {
                ret: -1,
                units: accent.encode_utf16(&mut [0; 2]).to_vec(),
            },
            Platform::X11 => RawOutput::X11 {
                keysym: dead_keysym_for(accent),
                utf8: String::new(),
            },
            Platform::MacOs => RawOutput::Mac {
                status: 0,
                dead_key_state: 1,
                units: accent.encode_utf16(&mut [0; 2]).to_vec(),
            },
        };
        self.with_raw(key, modifiers, raw)
    }

    /// Scripts every `(key, none/shift)` pair of a plain lowercase/uppercase
    /// layout, e.g. `("qwerty...", "QWERTY...")` against `keys`.
    pub fn with_rows(mut self, keys: &[PhysicalKey], base: &str, shifted: &str) -> Self {
        for ((key, lower), upper) in keys.iter().zip(base.chars()).zip(shifted.chars()) {
            self = self
                .with_literal(*key, ModifierState::None, &lower.to_string())
                .with_literal(*key, ModifierState::Shift, &upper.to_string());
        }
        self
    }

    fn wait(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
    }

    fn check_available(&self) -> KmResult<()> {
        match &self.unavailable {
            Some(reason) => Err(KeymapError::SourceUnavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl KeyboardSource for FixtureSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>> {
        self.wait();
        self.check_available()?;
        Ok(self.layout.clone())
    }

    fn raw_key_data(&self, table: &ScanCodeTable) -> KmResult<RawKeyData> {
        self.wait();
        self.check_available()?;

        let supported = self.supported_modifiers();
        let records = table
            .entries()
            .filter(|(_, code)| code.is_some())
            .filter(|(key, _)| self.cells.contains_key(key) || self.vkeys.contains_key(key))
            .map(|(key, _)| RawKeyRecord {
                key,
                vkey: self.vkeys.get(&key).copied(),
                cells: self
                    .cells
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .filter(|(m, _)| supported.contains(m))
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(RawKeyData { records })
    }

    fn is_iso_keyboard(&self) -> KmResult<Option<bool>> {
        self.wait();
        self.check_available()?;
        Ok(self.iso)
    }
}

/// X11 keysym for a character: Latin-1 maps directly, everything else
/// goes through the `0x0100_0000` Unicode range.
fn unicode_keysym(c: char) -> u32 {
    let cp = c as u32;
    if (0x20..=0x7e).contains(&cp) || (0xa0..=0xff).contains(&cp) {
        cp
    } else {
        0x0100_0000 | cp
    }
}

fn dead_keysym_for(accent: char) -> u32 {
    match accent {
        '`' => 0xfe50,
        '´' => 0xfe51,
        '^' => 0xfe52,
        '~' => 0xfe53,
        '¨' => 0xfe57,
        'ˇ' => 0xfe5a,
        '¸' => 0xfe5b,
        _ => 0xfe80,
    }
}
