// ─── Registry Search (Windows) ───
// Installed JREs/JDKs register their VM library under HKLM\SOFTWARE\JavaSoft.

use std::path::PathBuf;

pub const JAVASOFT_KEYS: &[&str] = &[
    "SOFTWARE\\JavaSoft\\JRE",
    "SOFTWARE\\JavaSoft\\JDK",
    "SOFTWARE\\JavaSoft\\Java Runtime Environment",
    "SOFTWARE\\JavaSoft\\Java Development Kit",
];

/// Reads `CurrentVersion` then `<version>\RuntimeLib` for each known key and
/// returns the first existing VM library. Every key read is added to `probed`.
#[cfg(windows)]
pub fn find_registry_vm(probed: &mut Vec<String>) -> Option<PathBuf> {
    for key in JAVASOFT_KEYS {
        probed.push(format!("HKEY_LOCAL_MACHINE\\{key}"));
        let Some(version) = win::read_string(key, "CurrentVersion") else {
            continue;
        };
        let version_key = format!("{key}\\{version}");
        if let Some(runtime_lib) = win::read_string(&version_key, "RuntimeLib") {
            let path = PathBuf::from(runtime_lib);
            if path.is_file() {
                tracing::debug!("Registry VM library {:?} from {}", path, version_key);
                return Some(path);
            }
        }
    }
    None
}

#[cfg(not(windows))]
pub fn find_registry_vm(_probed: &mut Vec<String>) -> Option<PathBuf> {
    None
}

#[cfg(windows)]
mod win {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};

    fn to_wide(s: &str) -> Vec<u16> {
        let mut wide: Vec<u16> = s.encode_utf16().collect();
        wide.push(0);
        wide
    }

    pub fn read_string(subkey: &str, value: &str) -> Option<String> {
        let subkey_w = to_wide(subkey);
        let value_w = to_wide(value);
        let mut size: u32 = 0;
        let status = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(subkey_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                RRF_RT_REG_SZ,
                None,
                None,
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS || size == 0 {
            return None;
        }

        let mut buffer = vec![0u16; (size as usize).div_ceil(2)];
        let status = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(subkey_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                RRF_RT_REG_SZ,
                None,
                Some(buffer.as_mut_ptr().cast()),
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            return None;
        }
        let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        Some(String::from_utf16_lossy(&buffer[..end]))
    }
}
