//! Windows backend: the `Fonts` registry key and GDI font resources.

use std::ffi::{OsStr, OsString};
use std::iter::once;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use fontmgr_types::{RegistrationEntry, RegistrationScope};
use tracing::warn;
use windows::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, LPARAM, WIN32_ERROR, WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    AddFontResourceExW, FONT_RESOURCE_CHARACTERISTICS, RemoveFontResourceExW,
};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE, REG_SAM_FLAGS, REG_SZ,
    RegCloseKey, RegDeleteValueW, RegEnumValueW, RegOpenKeyExW, RegSetValueExW,
};
use windows::Win32::UI::WindowsAndMessaging::{HWND_BROADCAST, PostMessageW, WM_FONTCHANGE};
use windows::core::{PCWSTR, PWSTR};

use crate::error::RegistrarError;
use crate::loader::FontLoader;
use crate::store::RegistrationStore;

const FONTS_KEY: &str = r"Software\Microsoft\Windows NT\CurrentVersion\Fonts";

/// Longest registry value name plus terminator.
const MAX_VALUE_NAME: usize = 16_384;
const MAX_VALUE_DATA: usize = 32_768;

fn wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(once(0)).collect()
}

fn check(status: WIN32_ERROR, what: &str) -> Result<(), RegistrarError> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(RegistrarError::Store(format!("{what} failed: {status:?}")))
    }
}

/// Open registry key, closed on drop.
struct RegKey(HKEY);

impl Drop for RegKey {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful RegOpenKeyExW.
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

/// `HKCU`/`HKLM\Software\Microsoft\Windows NT\CurrentVersion\Fonts`.
#[derive(Debug, Default)]
pub struct WindowsRegistryStore;

impl WindowsRegistryStore {
    pub fn new() -> Self {
        Self
    }

    fn open(scope: RegistrationScope, access: REG_SAM_FLAGS) -> Result<RegKey, RegistrarError> {
        let root = match scope {
            RegistrationScope::User => HKEY_CURRENT_USER,
            RegistrationScope::System => HKEY_LOCAL_MACHINE,
        };
        let subkey = wide(FONTS_KEY);
        let mut key = HKEY::default();
        // SAFETY: `subkey` is NUL-terminated and outlives the call.
        let status = unsafe { RegOpenKeyExW(root, PCWSTR(subkey.as_ptr()), None, access, &mut key) };
        check(status, "RegOpenKeyExW")?;
        Ok(RegKey(key))
    }

    /// System entries usually hold a bare file name relative to `%WINDIR%\Fonts`.
    fn absolutize(scope: RegistrationScope, value: PathBuf) -> PathBuf {
        if value.is_absolute() || scope == RegistrationScope::User {
            return value;
        }
        let windir = std::env::var_os("WINDIR").unwrap_or_else(|| OsString::from(r"C:\Windows"));
        PathBuf::from(windir).join("Fonts").join(value)
    }
}

impl RegistrationStore for WindowsRegistryStore {
    fn entries(&self, scope: RegistrationScope) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let key = Self::open(scope, KEY_READ)?;
        let mut entries = Vec::new();
        let mut name = vec![0u16; MAX_VALUE_NAME];
        let mut data = vec![0u8; MAX_VALUE_DATA];

        for index in 0u32.. {
            let mut name_len = name.len() as u32;
            let mut data_len = data.len() as u32;
            let mut kind = 0u32;
            // SAFETY: buffer lengths are passed alongside their pointers.
            let status = unsafe {
                RegEnumValueW(
                    key.0,
                    index,
                    Some(PWSTR(name.as_mut_ptr())),
                    &mut name_len,
                    None,
                    Some(&mut kind),
                    Some(data.as_mut_ptr()),
                    Some(&mut data_len),
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            check(status, "RegEnumValueW")?;
            if kind != REG_SZ.0 {
                continue;
            }

            let value_name = String::from_utf16_lossy(&name[..name_len as usize]);
            let value: Vec<u16> = data[..data_len as usize]
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .take_while(|&c| c != 0)
                .collect();
            let path = Self::absolutize(scope, PathBuf::from(OsString::from_wide(&value)));
            entries.push(RegistrationEntry::new(value_name, path, scope));
        }
        Ok(entries)
    }

    fn set(&self, scope: RegistrationScope, key: &str, path: &Path) -> Result<(), RegistrarError> {
        let reg = Self::open(scope, KEY_SET_VALUE)?;
        let name = wide(key);
        let value = wide(path.as_os_str());
        let bytes: Vec<u8> = value.iter().flat_map(|c| c.to_le_bytes()).collect();
        // SAFETY: `name` is NUL-terminated; `bytes` is a NUL-terminated UTF-16 string.
        let status = unsafe { RegSetValueExW(reg.0, PCWSTR(name.as_ptr()), None, REG_SZ, Some(&bytes)) };
        check(status, "RegSetValueExW")
    }

    fn remove(&self, scope: RegistrationScope, key: &str) -> Result<(), RegistrarError> {
        let reg = Self::open(scope, KEY_SET_VALUE)?;
        let name = wide(key);
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let status = unsafe { RegDeleteValueW(reg.0, PCWSTR(name.as_ptr())) };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(());
        }
        check(status, "RegDeleteValueW")
    }
}

/// Loads fonts into the GDI font table and broadcasts `WM_FONTCHANGE`.
#[derive(Debug, Default)]
pub struct GdiLoader;

impl GdiLoader {
    pub fn new() -> Self {
        Self
    }
}

impl FontLoader for GdiLoader {
    fn load(&self, path: &Path) -> Result<(), RegistrarError> {
        let file = wide(path.as_os_str());
        // SAFETY: `file` is NUL-terminated and outlives the call.
        let added = unsafe { AddFontResourceExW(PCWSTR(file.as_ptr()), FONT_RESOURCE_CHARACTERISTICS(0), None) };
        if added > 0 {
            Ok(())
        } else {
            Err(RegistrarError::Load(format!("AddFontResourceExW rejected {}", path.display())))
        }
    }

    fn unload(&self, path: &Path) -> Result<(), RegistrarError> {
        let file = wide(path.as_os_str());
        // SAFETY: `file` is NUL-terminated and outlives the call.
        let removed = unsafe { RemoveFontResourceExW(PCWSTR(file.as_ptr()), 0, None) };
        if removed.as_bool() {
            Ok(())
        } else {
            Err(RegistrarError::Load(format!("RemoveFontResourceExW rejected {}", path.display())))
        }
    }

    fn broadcast_change(&self) {
        // SAFETY: posting a message without pointers in its parameters.
        if let Err(e) = unsafe { PostMessageW(Some(HWND_BROADCAST), WM_FONTCHANGE, WPARAM(0), LPARAM(0)) } {
            warn!(error = %e, "WM_FONTCHANGE broadcast failed");
        }
    }
}
