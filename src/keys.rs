use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// A physical key position, named after its W3C `KeyboardEvent.code`.
///
/// Declaration order is the canonical key map order. Adding a variant
/// breaks the build until every platform table in `scancodes` covers it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    EnumCount,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum PhysicalKey {
    // Letters
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    // Digit row
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Digit0,

    // Writing system controls and punctuation
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    Minus,
    Equal,
    BracketLeft,
    BracketRight,
    Backslash,
    Semicolon,
    Quote,
    Backquote,
    Comma,
    Period,
    Slash,
    CapsLock,

    // Function row
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Control pad and arrows
    PrintScreen,
    ScrollLock,
    Pause,
    Insert,
    Home,
    PageUp,
    Delete,
    End,
    PageDown,
    ArrowRight,
    ArrowLeft,
    ArrowDown,
    ArrowUp,

    // Numpad
    NumLock,
    NumpadDivide,
    NumpadMultiply,
    NumpadSubtract,
    NumpadAdd,
    NumpadEnter,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    Numpad0,
    NumpadDecimal,

    // International and menu
    IntlBackslash,
    ContextMenu,
    NumpadEqual,
    IntlRo,
    IntlYen,

    // Modifiers
    ControlLeft,
    ShiftLeft,
    AltLeft,
    MetaLeft,
    ControlRight,
    ShiftRight,
    AltRight,
    MetaRight,
}

impl PhysicalKey {
    /// Position of this key in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn canonical_order() -> impl Iterator<Item = PhysicalKey> {
        PhysicalKey::iter()
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// The modifier chords every key map is read under.
///
/// `AltGr` is the third-level chord: Ctrl+Alt on Windows, the
/// ISO_Level3_Shift key on X11. macOS has a single Option key, so its
/// `alt` and `altGr` cells carry the same Option reading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    EnumCount,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ModifierState {
    None,
    Shift,
    Alt,
    ShiftAlt,
    AltGr,
    ShiftAltGr,
}

impl ModifierState {
    pub const ALL: &'static [ModifierState] = &[
        ModifierState::None,
        ModifierState::Shift,
        ModifierState::Alt,
        ModifierState::ShiftAlt,
        ModifierState::AltGr,
        ModifierState::ShiftAltGr,
    ];

    pub fn has_shift(self) -> bool {
        matches!(self, Self::Shift | Self::ShiftAlt | Self::ShiftAltGr)
    }

    pub fn has_alt(self) -> bool {
        matches!(self, Self::Alt | Self::ShiftAlt)
    }

    pub fn has_altgr(self) -> bool {
        matches!(self, Self::AltGr | Self::ShiftAltGr)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    MacOs,
    X11,
}

impl Platform {
    /// The platform this binary was built for, if it has a keyboard source.
    pub fn current() -> Option<Platform> {
        if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Platform::MacOs)
        } else if cfg!(all(
            unix,
            not(target_os = "ios"),
            not(target_os = "android")
        )) {
            Some(Platform::X11)
        } else {
            None
        }
    }
}
