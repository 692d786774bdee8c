pub mod api;
pub mod config;
pub mod error;
pub mod keymap;
pub mod keys;
pub mod normalizer;
pub mod scancodes;
pub mod service;
pub mod source;

pub use api::{
    get_current_keyboard_layout, get_current_keyboard_layout_name, get_key_map, initialize,
    install_source, is_iso_keyboard, reinitialize, set_error_hook, status, SourceStatus,
};
pub use config::QueryConfig;
pub use error::{ErrorHook, KeymapError, KmResult};
pub use keymap::{KeyMap, KeyMapEntry, KeyValue, KeyboardLayoutInfo};
pub use keys::{ModifierState, PhysicalKey, Platform};
pub use service::KeyboardService;
