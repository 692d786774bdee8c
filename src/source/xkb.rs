use super::{KeyboardSource, RawKeyData, RawKeyRecord, RawOutput};
use crate::error::{KeymapError, KmResult};
use crate::keymap::KeyboardLayoutInfo;
use crate::keys::{ModifierState, Platform, PhysicalKey};
use crate::scancodes::{x11_keycode, ScanCodeTable};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xkb::ConnectionExt as _;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _, Window};
use x11rb::xcb_ffi::XCBConnection;
use xkbcommon::xkb::{
    self, keysyms,
    x11::ffi::{XKB_X11_MIN_MAJOR_XKB_VERSION, XKB_X11_MIN_MINOR_XKB_VERSION},
    Keycode,
};

/// Reads the layout of the X server named by `$DISPLAY` through XKB.
///
/// A fresh connection is opened per query and dropped before returning,
/// so a layout switch between calls is always observed.
pub(crate) struct XkbSource;

impl XkbSource {
    pub(crate) fn new() -> Self {
        Self
    }
}

struct Session {
    conn: XCBConnection,
    root: Window,
    keymap: xkb::Keymap,
    group: xkb::LayoutIndex,
}

#[derive(Debug, Clone, Copy)]
struct ModifierMasks {
    shift: xkb::ModMask,
    alt: xkb::ModMask,
    level3: Option<xkb::ModMask>,
}

impl Session {
    fn open() -> KmResult<Self> {
        let (conn, screen_num) = XCBConnection::connect(None)
            .map_err(|e| KeymapError::unavailable(format!("cannot connect to X server: {}", e)))?;

        let xkb_reply = conn
            .xkb_use_extension(
                XKB_X11_MIN_MAJOR_XKB_VERSION,
                XKB_X11_MIN_MINOR_XKB_VERSION,
            )
            .map_err(KeymapError::unavailable)?
            .reply()
            .map_err(KeymapError::unavailable)?;
        if !xkb_reply.supported {
            return Err(KeymapError::unavailable(
                "X server does not support the XKB extension",
            ));
        }

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| KeymapError::unavailable("X server reported no screens"))?;

        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let device_id = xkb::x11::get_core_keyboard_device_id(&conn);
        if device_id < 0 {
            return Err(KeymapError::unavailable("no core keyboard device"));
        }
        let keymap = xkb::x11::keymap_new_from_device(
            &context,
            &conn,
            device_id,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        );
        let state = xkb::x11::state_new_from_device(&keymap, &conn, device_id);
        let group = state.serialize_layout(xkb::STATE_LAYOUT_EFFECTIVE);

        Ok(Self {
            conn,
            root,
            keymap,
            group,
        })
    }

    /// Masks of the real modifiers set by pressing Shift, Alt and the
    /// third-level key of this keymap.
    fn modifier_masks(&self) -> ModifierMasks {
        let press = |keycode: Keycode| {
            let mut state = xkb::State::new(&self.keymap);
            state.update_key(keycode, xkb::KeyDirection::Down);
            state.serialize_mods(xkb::STATE_MODS_DEPRESSED)
        };

        let shift = press(keycode_of(PhysicalKey::ShiftLeft));
        let alt = press(keycode_of(PhysicalKey::AltLeft));
        let level3 = self.level3_keycode().map(press).filter(|mask| *mask != 0);

        ModifierMasks { shift, alt, level3 }
    }

    fn level3_keycode(&self) -> Option<Keycode> {
        let scratch = xkb::State::new(&self.keymap);
        let min = self.keymap.min_keycode().raw();
        let max = self.keymap.max_keycode().raw();
        (min..=max).map(Keycode::new).find(|&keycode| {
            let sym = scratch.key_get_one_sym(keycode).raw();
            sym == keysyms::KEY_ISO_Level3_Shift || sym == keysyms::KEY_Mode_switch
        })
    }

    fn translate(&self, keycode: Keycode, mods: xkb::ModMask) -> RawOutput {
        let mut state = xkb::State::new(&self.keymap);
        state.update_mask(mods, 0, 0, 0, 0, self.group);
        RawOutput::X11 {
            keysym: state.key_get_one_sym(keycode).raw(),
            utf8: state.key_get_utf8(keycode),
        }
    }

    /// The `layout(variant)` entry of `_XKB_RULES_NAMES` for the active group.
    fn rules_layout_id(&self) -> KmResult<Option<String>> {
        let atom = self
            .conn
            .intern_atom(true, b"_XKB_RULES_NAMES")
            .map_err(KeymapError::unavailable)?
            .reply()
            .map_err(KeymapError::unavailable)?
            .atom;
        if atom == x11rb::NONE {
            return Ok(None);
        }

        let reply = self
            .conn
            .get_property(false, self.root, atom, AtomEnum::STRING, 0, 1024)
            .map_err(KeymapError::unavailable)?
            .reply()
            .map_err(KeymapError::unavailable)?;

        // rules \0 model \0 layout \0 variant \0 options
        let fields: Vec<String> = reply
            .value
            .split(|b| *b == 0)
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        let group = self.group as usize;
        let layout = fields
            .get(2)
            .and_then(|l| l.split(',').nth(group))
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let variant = fields
            .get(3)
            .and_then(|v| v.split(',').nth(group))
            .map(str::trim)
            .filter(|v| !v.is_empty());

        Ok(layout.map(|l| match variant {
            Some(v) => format!("{}({})", l, v),
            None => l.to_string(),
        }))
    }
}

fn keycode_of(key: PhysicalKey) -> Keycode {
    // The X11 table covers every key.
    Keycode::new(x11_keycode(key).unwrap_or(0))
}

impl KeyboardSource for XkbSource {
    fn platform(&self) -> Platform {
        Platform::X11
    }

    fn current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>> {
        let session = Session::open()?;
        let display_name = session.keymap.layout_get_name(session.group).to_string();
        let id = match session.rules_layout_id() {
            Ok(id) => id,
            Err(e) => {
                debug!("Cannot read _XKB_RULES_NAMES: {}", e);
                None
            }
        };

        Ok(match (id, display_name.is_empty()) {
            (Some(id), true) => Some(KeyboardLayoutInfo::new(id.clone(), id)),
            (Some(id), false) => Some(KeyboardLayoutInfo::new(id, display_name)),
            (None, false) => Some(KeyboardLayoutInfo::new(display_name.clone(), display_name)),
            (None, true) => None,
        })
    }

    fn raw_key_data(&self, table: &ScanCodeTable) -> KmResult<RawKeyData> {
        let session = Session::open()?;
        let masks = session.modifier_masks();
        if masks.level3.is_none() {
            debug!("Keymap has no third-level modifier; AltGr cells unresolved");
        }

        let min = session.keymap.min_keycode().raw();
        let max = session.keymap.max_keycode().raw();
        let supported = self.supported_modifiers();

        let mut records = Vec::with_capacity(table.mapped_count());
        for (key, code) in table.entries() {
            let Some(code) = code else { continue };
            if !(min..=max).contains(&code) {
                warn!("{} (keycode {}) is outside the keymap range", key, code);
                records.push(RawKeyRecord {
                    key,
                    vkey: None,
                    cells: supported
                        .iter()
                        .map(|m| (*m, RawOutput::Unresolved))
                        .collect(),
                });
                continue;
            }

            let keycode = Keycode::new(code);
            let cells = supported
                .iter()
                .map(|&m| {
                    let raw = match mask_for(m, &masks) {
                        Some(mask) => session.translate(keycode, mask),
                        None => RawOutput::Unresolved,
                    };
                    (m, raw)
                })
                .collect();
            records.push(RawKeyRecord {
                key,
                vkey: None,
                cells,
            });
        }

        Ok(RawKeyData { records })
    }
}

fn mask_for(modifiers: ModifierState, masks: &ModifierMasks) -> Option<xkb::ModMask> {
    let mut mask = 0;
    if modifiers.has_shift() {
        mask |= masks.shift;
    }
    if modifiers.has_alt() {
        mask |= masks.alt;
    }
    if modifiers.has_altgr() {
        mask |= masks.level3?;
    }
    Some(mask)
}
