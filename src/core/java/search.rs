// ─── VM Search ───
// PATH lookup, symlink resolution and the VM-library-next-to-executable probe.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::core::platform::{jvm_locations, VM_LIBRARY, VM_VERSION_HINT_VAR};

use super::classify::is_vm_library;

/// Finds `command` either as a path (relative to the working directory) or
/// by searching PATH when it has no directory component.
pub fn find_command(command: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_default();
    find_command_in(command, std::env::var_os("PATH"), &cwd)
}

pub fn find_command_in(command: &str, path_var: Option<OsString>, cwd: &Path) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }
    if has_dir_separator(command) {
        let path = Path::new(command);
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        return with_executable_suffixes(&candidate)
            .into_iter()
            .find(|candidate| is_executable_file(candidate));
    }

    let path_var = path_var?;
    for dir in std::env::split_paths(&path_var) {
        // An empty PATH entry means the working directory.
        let dir = if dir.as_os_str().is_empty() {
            cwd.to_path_buf()
        } else {
            dir
        };
        if let Some(found) = with_executable_suffixes(&dir.join(command))
            .into_iter()
            .find(|candidate| is_executable_file(candidate))
        {
            debug!("Found {} on PATH at {:?}", command, found);
            return Some(found);
        }
    }
    None
}

pub fn has_dir_separator(value: &str) -> bool {
    value.contains('/') || (cfg!(windows) && value.contains('\\'))
}

fn with_executable_suffixes(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    if cfg!(windows) && path.extension().is_none() {
        candidates.push(path.with_extension("exe"));
    }
    candidates
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Resolves symlinks, steering versioned framework links with the
/// `JAVA_JVM_VERSION` hint when it is set. Falls back to the input path.
pub fn resolve_symlinks(path: &Path) -> PathBuf {
    let resolved = match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(_) => return path.to_path_buf(),
    };
    let hint = std::env::var(VM_VERSION_HINT_VAR).ok();
    steer_versioned_path(&resolved, hint.as_deref())
}

/// Swaps the component after `Versions/` for `hint` when that version
/// exists, e.g. `.../Versions/Current/...` to `.../Versions/1.8/...`.
pub fn steer_versioned_path(resolved: &Path, hint: Option<&str>) -> PathBuf {
    let Some(hint) = hint.filter(|h| !h.trim().is_empty()) else {
        return resolved.to_path_buf();
    };
    let components: Vec<Component<'_>> = resolved.components().collect();
    let Some(versions_at) = components
        .iter()
        .position(|c| c.as_os_str() == "Versions")
    else {
        return resolved.to_path_buf();
    };
    if versions_at + 1 >= components.len() {
        return resolved.to_path_buf();
    }

    let mut steered = PathBuf::new();
    for (idx, component) in components.iter().enumerate() {
        if idx == versions_at + 1 {
            steered.push(hint.trim());
        } else {
            steered.push(component.as_os_str());
        }
    }
    if steered.exists() {
        debug!("Steered {:?} to {:?} via {}", resolved, steered, VM_VERSION_HINT_VAR);
        steered
    } else {
        resolved.to_path_buf()
    }
}

/// Looks for the VM library next to a java executable using the platform's
/// ordered location list, first as given and then with symlinks resolved.
/// Every path tested is appended to `probed`.
pub fn find_vm_library(command: &Path, probed: &mut Vec<String>) -> Option<PathBuf> {
    if is_vm_library(command) {
        probed.push(command.to_string_lossy().to_string());
        return command.is_file().then(|| command.to_path_buf());
    }

    let mut bases = vec![command.to_path_buf()];
    let resolved = resolve_symlinks(command);
    if resolved != command {
        bases.push(resolved);
    }

    for base in bases {
        let Some(dir) = base.parent() else {
            continue;
        };
        for location in jvm_locations() {
            let candidate = dir.join(location).join(VM_LIBRARY);
            probed.push(candidate.to_string_lossy().to_string());
            if candidate.is_file() {
                debug!("VM library for {:?} at {:?}", command, candidate);
                return Some(candidate);
            }
        }
    }
    None
}
