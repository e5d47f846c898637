use std::path::{Path, PathBuf};

use crate::core::platform::SHARED_LIBRARY_EXTENSIONS;

/// What a `-vm` value points at. Classification only; no searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmHint {
    Nothing,
    Directory(PathBuf),
    EeProps(PathBuf),
    Library(PathBuf),
    /// An executable name or path, possibly to be found on PATH.
    Other(String),
}

pub fn classify(hint: Option<&str>) -> VmHint {
    let Some(hint) = hint.filter(|h| !h.is_empty()) else {
        return VmHint::Nothing;
    };
    let path = Path::new(hint);
    if path.is_dir() {
        return VmHint::Directory(path.to_path_buf());
    }
    match extension_lowercase(path).as_deref() {
        Some("ee") => VmHint::EeProps(path.to_path_buf()),
        Some(ext) if SHARED_LIBRARY_EXTENSIONS.contains(&ext) => VmHint::Library(path.to_path_buf()),
        _ => VmHint::Other(hint.to_string()),
    }
}

pub fn is_vm_library(path: &Path) -> bool {
    extension_lowercase(path).is_some_and(|ext| SHARED_LIBRARY_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_total_over_hint_shapes() {
        assert_eq!(classify(None), VmHint::Nothing);
        assert_eq!(classify(Some("")), VmHint::Nothing);
        assert_eq!(
            classify(Some(std::env::temp_dir().to_str().unwrap())),
            VmHint::Directory(std::env::temp_dir())
        );
        assert_eq!(
            classify(Some("/opt/jdk/default.ee")),
            VmHint::EeProps(PathBuf::from("/opt/jdk/default.ee"))
        );
        assert_eq!(
            classify(Some("/opt/jdk/lib/server/libjvm.so")),
            VmHint::Library(PathBuf::from("/opt/jdk/lib/server/libjvm.so"))
        );
        assert_eq!(
            classify(Some("C:\\jdk\\bin\\server\\JVM.DLL")),
            VmHint::Library(PathBuf::from("C:\\jdk\\bin\\server\\JVM.DLL"))
        );
        assert_eq!(classify(Some("java")), VmHint::Other("java".into()));
        assert_eq!(
            classify(Some("/opt/jdk/bin/java")),
            VmHint::Other("/opt/jdk/bin/java".into())
        );
    }

    #[test]
    fn library_detection_ignores_case() {
        assert!(is_vm_library(Path::new("libjvm.dylib")));
        assert!(is_vm_library(Path::new("JVM.DLL")));
        assert!(!is_vm_library(Path::new("java")));
    }
}
