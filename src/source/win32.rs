use super::{KeyboardSource, RawKeyData, RawKeyRecord, RawOutput};
use crate::error::{KeymapError, KmResult};
use crate::keymap::KeyboardLayoutInfo;
use crate::keys::{ModifierState, Platform};
use crate::scancodes::{windows_fixed_virtual_key, ScanCodeTable};
use tracing::debug;
use windows::core::{HSTRING, PCWSTR, PWSTR};
use windows::Win32::Foundation::ERROR_SUCCESS;
use windows::Win32::Globalization::LCIDToLocaleName;
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegGetValueW, RegOpenKeyExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
    RRF_RT_REG_SZ,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyboardLayout, MapVirtualKeyExW, ToUnicodeEx, HKL, MAPVK_VSC_TO_VK_EX, VK_CONTROL,
    VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_MENU, VK_RMENU, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

const KEYBOARD_LAYOUTS_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Keyboard Layouts";

/// Do not touch the kernel's dead-key buffer (Windows 10 1607+).
const TOUNICODE_NO_STATE_CHANGE: u32 = 0x4;

const KEY_DOWN: u8 = 0x80;

pub(crate) struct Win32Source;

impl Win32Source {
    pub(crate) fn new() -> Self {
        Self
    }
}

/// The layout of the thread owning the foreground window: our own query
/// thread never has input focus, so its layout is the system default.
fn active_layout() -> HKL {
    unsafe {
        let hwnd = GetForegroundWindow();
        let thread_id = if hwnd.is_invalid() {
            0
        } else {
            GetWindowThreadProcessId(hwnd, None)
        };
        GetKeyboardLayout(thread_id)
    }
}

fn hkl_bits(hkl: HKL) -> usize {
    hkl.0 as usize
}

fn key_state(modifiers: ModifierState) -> [u8; 256] {
    let mut state = [0u8; 256];
    if modifiers.has_shift() {
        state[VK_SHIFT.0 as usize] = KEY_DOWN;
        state[VK_LSHIFT.0 as usize] = KEY_DOWN;
    }
    if modifiers.has_alt() {
        state[VK_MENU.0 as usize] = KEY_DOWN;
        state[VK_LMENU.0 as usize] = KEY_DOWN;
    }
    if modifiers.has_altgr() {
        state[VK_CONTROL.0 as usize] = KEY_DOWN;
        state[VK_LCONTROL.0 as usize] = KEY_DOWN;
        state[VK_MENU.0 as usize] = KEY_DOWN;
        state[VK_RMENU.0 as usize] = KEY_DOWN;
    }
    state
}

fn translate(vk: u32, scan: u32, modifiers: ModifierState, hkl: HKL) -> RawOutput {
    let state = key_state(modifiers);
    let mut buf = [0u16; 8];
    // Bit 15 of the scan code means "key up", so extended keys drop the E0 prefix.
    let ret = unsafe {
        ToUnicodeEx(
            vk,
            scan & 0xff,
            &state,
            &mut buf,
            TOUNICODE_NO_STATE_CHANGE,
            hkl,
        )
    };
    let written = (ret.unsigned_abs() as usize).min(buf.len());
    RawOutput::Windows {
        ret,
        units: buf[..written].to_vec(),
    }
}

fn locale_name(lang_id: u16) -> Option<String> {
    let mut buf = [0u16; 85];
    let len = unsafe { LCIDToLocaleName(lang_id as u32, Some(&mut buf), 0) };
    if len <= 1 {
        return None;
    }
    Some(String::from_utf16_lossy(&buf[..len as usize - 1]))
}

fn read_registry_string(subkey: &str, value: &str) -> Option<String> {
    let subkey = HSTRING::from(subkey);
    let value = HSTRING::from(value);
    let mut size: u32 = 0;

    unsafe {
        let status = RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(subkey.as_ptr()),
            PCWSTR(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            None,
            Some(&mut size),
        );
        if status != ERROR_SUCCESS || size == 0 {
            return None;
        }

        let mut buf = vec![0u16; (size as usize + 1) / 2];
        let status = RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(subkey.as_ptr()),
            PCWSTR(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            Some(buf.as_mut_ptr().cast()),
            Some(&mut size),
        );
        if status != ERROR_SUCCESS {
            return None;
        }
        let end = buf.iter().position(|&u| u == 0).unwrap_or(buf.len());
        Some(String::from_utf16_lossy(&buf[..end]))
    }
}

/// KLIDs ("00000409", "00020409", ...) registered under Keyboard Layouts.
fn registered_layout_ids() -> Vec<String> {
    let mut ids = Vec::new();
    let path = HSTRING::from(KEYBOARD_LAYOUTS_KEY);
    let mut key = HKEY::default();

    unsafe {
        if RegOpenKeyExW(HKEY_LOCAL_MACHINE, PCWSTR(path.as_ptr()), 0, KEY_READ, &mut key)
            != ERROR_SUCCESS
        {
            return ids;
        }

        let mut index = 0;
        loop {
            let mut name = [0u16; 16];
            let mut name_len = name.len() as u32;
            let status = RegEnumKeyExW(
                key,
                index,
                PWSTR(name.as_mut_ptr()),
                &mut name_len,
                None,
                PWSTR::null(),
                None,
                None,
            );
            if status != ERROR_SUCCESS {
                break;
            }
            ids.push(String::from_utf16_lossy(&name[..name_len as usize]));
            index += 1;
        }

        let _ = RegCloseKey(key);
    }

    ids
}

/// Resolves the registry KLID for an HKL. The high word is either the
/// layout's device id or `0xFnnn`, where `nnn` is the KLID's `Layout Id`.
fn layout_id_for(hkl: HKL) -> String {
    let bits = hkl_bits(hkl);
    let lang_id = (bits & 0xffff) as u16;
    let device = ((bits >> 16) & 0xffff) as u16;

    if device & 0xf000 != 0xf000 {
        return format!("{:08X}", device as u32);
    }

    let wanted = device & 0x0fff;
    registered_layout_ids()
        .into_iter()
        .find(|klid| {
            let path = format!(r"{}\{}", KEYBOARD_LAYOUTS_KEY, klid);
            read_registry_string(&path, "Layout Id")
                .and_then(|id| u16::from_str_radix(id.trim(), 16).ok())
                .is_some_and(|id| id == wanted)
        })
        .unwrap_or_else(|| format!("{:08X}", lang_id as u32))
}

impl KeyboardSource for Win32Source {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>> {
        let hkl = active_layout();
        let bits = hkl_bits(hkl);
        if bits == 0 {
            return Err(KeymapError::unavailable("GetKeyboardLayout returned no layout"));
        }

        let klid = layout_id_for(hkl);
        let id = locale_name((bits & 0xffff) as u16).unwrap_or_else(|| klid.clone());
        let display_name = read_registry_string(
            &format!(r"{}\{}", KEYBOARD_LAYOUTS_KEY, klid),
            "Layout Text",
        )
        .unwrap_or_else(|| klid.clone());

        debug!("Active layout {:#x} -> {} ({})", bits, id, klid);
        Ok(Some(KeyboardLayoutInfo::new(id, display_name)))
    }

    fn raw_key_data(&self, table: &ScanCodeTable) -> KmResult<RawKeyData> {
        let hkl = active_layout();
        if hkl_bits(hkl) == 0 {
            return Err(KeymapError::unavailable("GetKeyboardLayout returned no layout"));
        }

        let supported = self.supported_modifiers();
        let mut records = Vec::with_capacity(table.mapped_count());

        for (key, code) in table.entries() {
            let Some(scan) = code else { continue };
            let vk = windows_fixed_virtual_key(key)
                .unwrap_or_else(|| unsafe { MapVirtualKeyExW(scan, MAPVK_VSC_TO_VK_EX, hkl) });
            let cells = supported
                .iter()
                .map(|&m| {
                    let raw = if vk == 0 {
                        RawOutput::Unresolved
                    } else {
                        translate(vk, scan, m, hkl)
                    };
                    (m, raw)
                })
                .collect();
            records.push(RawKeyRecord {
                key,
                vkey: (vk != 0).then_some(vk),
                cells,
            });
        }

        Ok(RawKeyData { records })
    }
}
