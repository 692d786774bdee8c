pub mod keymap;
pub mod layout;
