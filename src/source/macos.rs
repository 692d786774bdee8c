use super::{KeyboardSource, RawKeyData, RawKeyRecord, RawOutput};
use crate::error::{KeymapError, KmResult};
use crate::keymap::KeyboardLayoutInfo;
use crate::keys::{ModifierState, Platform, PhysicalKey};
use crate::scancodes::{mac_virtual_key, ScanCodeTable};
use std::ffi::c_void;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

type CFTypeRef = *const c_void;
type CFStringRef = *const c_void;
type CFDataRef = *const c_void;
type CFIndex = isize;
type TISInputSourceRef = *const c_void;
type OSStatus = i32;
type UniCharCount = usize;

#[repr(C)]
struct CFRange {
    location: CFIndex,
    length: CFIndex,
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: CFTypeRef);
    fn CFDataGetBytePtr(data: CFDataRef) -> *const u8;
    fn CFStringGetLength(string: CFStringRef) -> CFIndex;
    fn CFStringGetCharacters(string: CFStringRef, range: CFRange, buffer: *mut u16);
}

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    static kTISPropertyUnicodeKeyLayoutData: CFStringRef;
    static kTISPropertyInputSourceID: CFStringRef;
    static kTISPropertyLocalizedName: CFStringRef;

    fn TISCopyCurrentKeyboardLayoutInputSource() -> TISInputSourceRef;
    fn TISCopyCurrentASCIICapableKeyboardLayoutInputSource() -> TISInputSourceRef;
    fn TISGetInputSourceProperty(source: TISInputSourceRef, key: CFStringRef) -> *const c_void;
    fn LMGetKbdType() -> u8;
    fn KBGetLayoutType(keyboard_type: i16) -> u32;
    #[allow(clippy::too_many_arguments)]
    fn UCKeyTranslate(
        key_layout_ptr: *const u8,
        virtual_key_code: u16,
        key_action: u16,
        modifier_key_state: u32,
        keyboard_type: u32,
        key_translate_options: u32,
        dead_key_state: *mut u32,
        max_string_length: UniCharCount,
        actual_string_length: *mut UniCharCount,
        unicode_string: *mut u16,
    ) -> OSStatus;
}

const UC_KEY_ACTION_DOWN: u16 = 0;
// PhysicalKeyboardLayoutType four-char codes.
const KEYBOARD_ISO: u32 = u32::from_be_bytes(*b"ISO ");
const KEYBOARD_ANSI: u32 = u32::from_be_bytes(*b"ANSI");
const KEYBOARD_JIS: u32 = u32::from_be_bytes(*b"JIS ");
// Carbon modifier bits, already shifted right by 8 as UCKeyTranslate expects.
const SHIFT_KEY: u32 = 0x02;
const OPTION_KEY: u32 = 0x08;

/// Text Input Source calls are not reentrant; every query goes through here.
static TIS_LOCK: Mutex<()> = Mutex::new(());

/// Reads the current Text Input Source.
///
/// Recent macOS releases expect TIS calls on the main thread and log (or
/// assert) otherwise. The service calls sources from a worker thread unless
/// `QueryConfig::run_inline` is set; hosts that own the main run loop should
/// set it and query from there.
pub(crate) struct MacSource;

impl MacSource {
    pub(crate) fn new() -> Self {
        Self
    }
}

/// Releases the wrapped Core Foundation object on drop.
struct Owned(CFTypeRef);

impl Drop for Owned {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { CFRelease(self.0) };
        }
    }
}

fn cf_string(s: CFStringRef) -> Option<String> {
    if s.is_null() {
        return None;
    }
    unsafe {
        let len = CFStringGetLength(s);
        if len <= 0 {
            return None;
        }
        let mut buf = vec![0u16; len as usize];
        CFStringGetCharacters(
            s,
            CFRange {
                location: 0,
                length: len,
            },
            buf.as_mut_ptr(),
        );
        Some(String::from_utf16_lossy(&buf))
    }
}

fn current_source() -> KmResult<Owned> {
    let source = unsafe { TISCopyCurrentKeyboardLayoutInputSource() };
    if source.is_null() {
        return Err(KeymapError::unavailable(
            "TISCopyCurrentKeyboardLayoutInputSource returned nothing",
        ));
    }
    Ok(Owned(source))
}

/// Input methods (e.g. Japanese IME) carry no key layout data; fall back to
/// the ASCII-capable layout the IME types through.
fn layout_data_source() -> KmResult<(Owned, *const u8)> {
    let current = current_source()?;
    let data = unsafe { TISGetInputSourceProperty(current.0, kTISPropertyUnicodeKeyLayoutData) };
    if !data.is_null() {
        let bytes = unsafe { CFDataGetBytePtr(data) };
        return Ok((current, bytes));
    }

    debug!("Current input source has no layout data; using ASCII-capable layout");
    let fallback = Owned(unsafe { TISCopyCurrentASCIICapableKeyboardLayoutInputSource() });
    if fallback.0.is_null() {
        return Err(KeymapError::unavailable("no ASCII-capable keyboard layout"));
    }
    let data = unsafe { TISGetInputSourceProperty(fallback.0, kTISPropertyUnicodeKeyLayoutData) };
    if data.is_null() {
        return Err(KeymapError::unavailable("keyboard layout has no Unicode data"));
    }
    let bytes = unsafe { CFDataGetBytePtr(data) };
    Ok((fallback, bytes))
}

fn modifier_bits(modifiers: ModifierState) -> u32 {
    let mut bits = 0;
    if modifiers.has_shift() {
        bits |= SHIFT_KEY;
    }
    if modifiers.has_alt() || modifiers.has_altgr() {
        bits |= OPTION_KEY;
    }
    bits
}

fn key_translate(
    layout: *const u8,
    keycode: u16,
    modifiers: u32,
    keyboard_type: u32,
    dead_key_state: &mut u32,
) -> (OSStatus, Vec<u16>) {
    let mut chars = [0u16; 8];
    let mut len: UniCharCount = 0;
    let status = unsafe {
        UCKeyTranslate(
            layout,
            keycode,
            UC_KEY_ACTION_DOWN,
            modifiers,
            keyboard_type,
            0,
            dead_key_state,
            chars.len(),
            &mut len,
            chars.as_mut_ptr(),
        )
    };
    (status, chars[..len.min(chars.len())].to_vec())
}

fn translate(
    layout: *const u8,
    keycode: u16,
    modifiers: ModifierState,
    keyboard_type: u32,
) -> RawOutput {
    let bits = modifier_bits(modifiers);
    let mut dead_key_state = 0u32;
    let (status, units) = key_translate(layout, keycode, bits, keyboard_type, &mut dead_key_state);

    if status == 0 && dead_key_state != 0 && units.is_empty() {
        // Pressing Space after a dead key yields its spacing accent.
        let space = mac_virtual_key(PhysicalKey::Space).unwrap_or(0x31) as u16;
        let mut follow_up = dead_key_state;
        let (_, accent) = key_translate(layout, space, 0, keyboard_type, &mut follow_up);
        return RawOutput::Mac {
            status,
            dead_key_state,
            units: accent,
        };
    }

    RawOutput::Mac {
        status,
        dead_key_state: 0,
        units,
    }
}

impl KeyboardSource for MacSource {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>> {
        let _guard = TIS_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let source = current_source()?;

        let id =
            cf_string(unsafe { TISGetInputSourceProperty(source.0, kTISPropertyInputSourceID) });
        let name =
            cf_string(unsafe { TISGetInputSourceProperty(source.0, kTISPropertyLocalizedName) });

        Ok(match (id, name) {
            (Some(id), Some(name)) => Some(KeyboardLayoutInfo::new(id, name)),
            (Some(id), None) => Some(KeyboardLayoutInfo::new(id.clone(), id)),
            (None, Some(name)) => Some(KeyboardLayoutInfo::new(name.clone(), name)),
            (None, None) => None,
        })
    }

    fn raw_key_data(&self, table: &ScanCodeTable) -> KmResult<RawKeyData> {
        let _guard = TIS_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        // `_source` owns the CFData that `layout` points into.
        let (_source, layout) = layout_data_source()?;
        if layout.is_null() {
            return Err(KeymapError::unavailable("keyboard layout data is empty"));
        }
        let keyboard_type = unsafe { LMGetKbdType() } as u32;

        let supported = self.supported_modifiers();
        let mut records = Vec::with_capacity(table.mapped_count());
        for (key, code) in table.entries() {
            let Some(code) = code else { continue };
            let cells = supported
                .iter()
                .map(|&m| (m, translate(layout, code as u16, m, keyboard_type)))
                .collect();
            records.push(RawKeyRecord {
                key,
                vkey: Some(code),
                cells,
            });
        }

        Ok(RawKeyData { records })
    }

    fn is_iso_keyboard(&self) -> KmResult<Option<bool>> {
        let _guard = TIS_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let layout_type = unsafe { KBGetLayoutType(LMGetKbdType() as i16) };
        Ok(match layout_type {
            KEYBOARD_ISO => Some(true),
            KEYBOARD_ANSI | KEYBOARD_JIS => Some(false),
            other => {
                debug!("Unknown physical keyboard type {:#x}", other);
                None
            }
        })
    }
}
