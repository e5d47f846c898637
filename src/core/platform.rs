// ─── Platform ───
// Per-OS constants: names of the Java binaries and VM library, and the
// directory layouts searched for the VM library next to a java executable.

pub const DEFAULT_EE: &str = "default.ee";
pub const SHIPPED_VM_DIR: &str = "jre/bin";

#[cfg(windows)]
pub const DEFAULT_VM: &str = "javaw.exe";
#[cfg(not(windows))]
pub const DEFAULT_VM: &str = "java";

#[cfg(windows)]
pub const CONSOLE_VM: &str = "java.exe";
#[cfg(not(windows))]
pub const CONSOLE_VM: &str = "java";

#[cfg(windows)]
pub const VM_LIBRARY: &str = "jvm.dll";
#[cfg(target_os = "macos")]
pub const VM_LIBRARY: &str = "libjvm.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
pub const VM_LIBRARY: &str = "libjvm.so";

/// Environment variable the dynamic loader reads when a new process starts.
/// `None` where changing it at runtime is unnecessary.
#[cfg(target_os = "aix")]
pub const LIBRARY_PATH_VAR: Option<&str> = Some("LIBPATH");
#[cfg(all(unix, not(any(target_os = "macos", target_os = "aix"))))]
pub const LIBRARY_PATH_VAR: Option<&str> = Some("LD_LIBRARY_PATH");
#[cfg(not(all(unix, not(target_os = "macos"))))]
pub const LIBRARY_PATH_VAR: Option<&str> = None;

/// Env hint consulted when resolving versioned VM symlinks.
pub const VM_VERSION_HINT_VAR: &str = "JAVA_JVM_VERSION";

pub const SHARED_LIBRARY_EXTENSIONS: &[&str] = &["so", "dll", "dylib", "jnilib", "a"];

pub fn path_list_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

pub fn os_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "macosx",
        "linux" => "linux",
        "aix" => "aix",
        "solaris" | "illumos" => "solaris",
        "freebsd" => "freebsd",
        other => other,
    }
}

pub fn window_system() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "cocoa",
        _ => "gtk",
    }
}

pub fn os_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        other => other,
    }
}

/// Architecture directory name used inside a JRE's `lib/` tree.
pub fn java_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Relative directories (from the directory holding the java executable)
/// probed in order for the VM library. The order matches existing JVM
/// installation layouts and must not change.
pub fn jvm_locations() -> Vec<String> {
    #[cfg(windows)]
    {
        [
            "j9vm",
            "..\\jre\\bin\\j9vm",
            "client",
            "..\\jre\\bin\\client",
            "server",
            "..\\jre\\bin\\server",
            "classic",
            "..\\jre\\bin\\classic",
            "jrockit",
            "..\\jre\\bin\\jrockit",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
    #[cfg(target_os = "macos")]
    {
        [
            "../lib/server",
            "../lib/client",
            "../jre/lib/server",
            "../jre/lib/client",
            "server",
            "client",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
    #[cfg(not(any(windows, target_os = "macos")))]
    {
        let arch = java_arch();
        vec![
            "j9vm".to_string(),
            "../jre/bin/j9vm".to_string(),
            "classic".to_string(),
            "../jre/bin/classic".to_string(),
            format!("../lib/{arch}/client"),
            format!("../lib/{arch}/server"),
            format!("../lib/{arch}/j9vm"),
            format!("../lib/{arch}/classic"),
            format!("../jre/lib/{arch}/client"),
            format!("../jre/lib/{arch}/server"),
            format!("../jre/lib/{arch}/j9vm"),
            format!("../jre/lib/{arch}/classic"),
            "../lib/server".to_string(),
            "../lib/client".to_string(),
        ]
    }
}

/// VM arguments used when the user gave no `-vmargs` at all.
pub fn default_vm_args(window_system: &str, embedded: bool) -> Vec<String> {
    if window_system == "cocoa" && !embedded {
        vec!["-XstartOnFirstThread".to_string()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jvm_locations_start_with_j9_layouts_and_keep_their_order() {
        let locations = jvm_locations();
        assert!(!locations.is_empty());
        assert!(locations[0].contains("j9vm") || cfg!(target_os = "macos"));
        let mut deduped = locations.clone();
        deduped.dedup();
        assert_eq!(deduped, locations);
    }

    #[test]
    fn cocoa_exec_launches_get_first_thread_flag() {
        assert_eq!(default_vm_args("cocoa", false), vec!["-XstartOnFirstThread"]);
        assert!(default_vm_args("cocoa", true).is_empty());
        assert!(default_vm_args("gtk", false).is_empty());
    }
}
