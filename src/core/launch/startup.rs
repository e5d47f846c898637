// ─── Startup Artifacts ───
// Locates the launcher jar and the companion native library, and reads the
// jar's `Main-Class`.

use std::cmp::Ordering;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::config::LaunchOptions;
use crate::core::error::{LauncherError, LauncherResult};

pub const PLUGINS_DIR: &str = "plugins";
pub const LAUNCHER_JAR_PREFIX: &str = "org.eclipse.equinox.launcher_";
pub const LAUNCHER_FRAGMENT_PREFIX: &str = "org.eclipse.equinox.launcher";
pub const DEFAULT_STARTUP_JAR: &str = "startup.jar";
pub const DEFAULT_MAIN_CLASS: &str = "org.eclipse.equinox.launcher.Main";
const COMPANION_LIBRARY_STEM: &str = "jvm_bootstrap_lib";

fn parse_numeric_version_parts(raw: &str) -> Vec<u32> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.parse::<u32>().ok())
        .collect()
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = parse_numeric_version_parts(a);
    let b_parts = parse_numeric_version_parts(b);

    let max_len = a_parts.len().max(b_parts.len());
    for idx in 0..max_len {
        let a_val = a_parts.get(idx).copied().unwrap_or(0);
        let b_val = b_parts.get(idx).copied().unwrap_or(0);
        match a_val.cmp(&b_val) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }

    a.cmp(b)
}

/// Highest-versioned entry of `dir` named `<prefix><version><suffix>`.
fn find_versioned(dir: &Path, prefix: &str, suffix: &str, want_dir: bool) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let version = name.strip_prefix(prefix)?.strip_suffix(suffix)?.to_string();
            let path = entry.path();
            (path.is_dir() == want_dir).then_some((version, path))
        })
        .max_by(|(a, _), (b, _)| compare_versions(a, b))
        .map(|(_, path)| path)
}

/// `-startup` if it exists, then the newest launcher jar under `plugins/`,
/// then `startup.jar` next to the program.
pub fn find_startup_jar(options: &LaunchOptions) -> LauncherResult<PathBuf> {
    if let Some(startup) = &options.startup_jar {
        let path = PathBuf::from(startup);
        let path = if path.is_absolute() {
            path
        } else {
            options.program_dir.join(path)
        };
        if path.is_file() {
            return Ok(path);
        }
        warn!("Startup jar {:?} given with -startup does not exist", path);
    }

    let plugins = options.program_dir.join(PLUGINS_DIR);
    if let Some(jar) = find_versioned(&plugins, LAUNCHER_JAR_PREFIX, ".jar", false) {
        debug!("Using launcher jar {:?}", jar);
        return Ok(jar);
    }

    let fallback = options.program_dir.join(DEFAULT_STARTUP_JAR);
    if fallback.is_file() {
        return Ok(fallback);
    }
    Err(LauncherError::StartupJarMissing(options.official_name.clone()))
}

/// File name of this crate's cdylib on the current platform.
pub fn companion_library_name() -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        COMPANION_LIBRARY_STEM,
        std::env::consts::DLL_SUFFIX
    )
}

/// `-library` if given, else the library inside the newest matching
/// launcher fragment directory. `None` leaves `-library` off the command.
pub fn find_companion_library(options: &LaunchOptions) -> Option<PathBuf> {
    if let Some(library) = &options.library {
        return Some(PathBuf::from(library));
    }

    let prefix = format!(
        "{LAUNCHER_FRAGMENT_PREFIX}.{}.{}.{}_",
        options.ws, options.os, options.arch
    );
    let fragment = find_versioned(&options.program_dir.join(PLUGINS_DIR), &prefix, "", true)?;
    let library = fragment.join(companion_library_name());
    library.is_file().then_some(library)
}

/// `Main-Class` from the jar manifest, continuation lines included.
pub fn read_main_class(jar: &Path) -> LauncherResult<String> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::Io {
        path: jar.to_path_buf(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF")?;

    let mut text = String::new();
    manifest.read_to_string(&mut text)?;

    let mut main_class: Option<String> = None;
    let mut current_key: Option<String> = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if current_key.as_deref() == Some("Main-Class") {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim_end());
                }
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
            }
        }
    }

    main_class
        .filter(|class| !class.is_empty())
        .ok_or_else(|| LauncherError::Config(format!("Main-Class missing in {}", jar.display())))
}

/// Any manifest failure falls back to the default entry class.
pub fn main_class_or_default(jar: &Path) -> String {
    match read_main_class(jar) {
        Ok(class) => class,
        Err(err) => {
            debug!("{}; using {}", err, DEFAULT_MAIN_CLASS);
            DEFAULT_MAIN_CLASS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::core::config::LaunchFlags;

    fn scratch(name: &str) -> PathBuf {
        let temp = std::env::temp_dir().join(format!("startup-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        std::fs::create_dir_all(&temp).unwrap();
        temp
    }

    fn options(program_dir: &Path) -> LaunchOptions {
        LaunchOptions {
            official_name: "Tool".into(),
            program_path: program_dir.join("tool"),
            program_dir: program_dir.to_path_buf(),
            config_dir: program_dir.to_path_buf(),
            vm_hint: None,
            startup_jar: None,
            library: None,
            vm_args: None,
            prog_args: Vec::new(),
            splash: None,
            open_files: Vec::new(),
            timeout_secs: 60,
            os: "linux".into(),
            ws: "gtk".into(),
            arch: "x86_64".into(),
            flags: LaunchFlags::default(),
        }
    }

    fn write_jar(path: &Path, manifest: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("META-INF/MANIFEST.MF", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_compare_versions_numeric() {
        assert_eq!(compare_versions("1.6.900.v2024", "1.6.1000.v2023"), Ordering::Less);
        assert_eq!(compare_versions("1.10.0", "1.9.9"), Ordering::Greater);
    }

    #[test]
    fn newest_launcher_jar_wins_over_startup_jar() {
        let temp = scratch("jar-order");
        let plugins = temp.join(PLUGINS_DIR);
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(temp.join(DEFAULT_STARTUP_JAR), b"jar").unwrap();
        assert_eq!(find_startup_jar(&options(&temp)).unwrap(), temp.join(DEFAULT_STARTUP_JAR));

        std::fs::write(plugins.join("org.eclipse.equinox.launcher_1.6.900.v2024.jar"), b"jar").unwrap();
        std::fs::write(plugins.join("org.eclipse.equinox.launcher_1.6.1000.v2023.jar"), b"jar").unwrap();
        assert_eq!(
            find_startup_jar(&options(&temp)).unwrap(),
            plugins.join("org.eclipse.equinox.launcher_1.6.1000.v2023.jar")
        );

        let _ = std::fs::remove_dir_all(&temp);
    }

    #[test]
    fn missing_startup_jar_is_fatal() {
        let temp = scratch("jar-missing");
        let err = find_startup_jar(&options(&temp)).unwrap_err();
        assert!(matches!(err, LauncherError::StartupJarMissing(name) if name == "Tool"));
        let _ = std::fs::remove_dir_all(&temp);
    }

    #[test]
    fn companion_library_is_found_in_platform_fragment() {
        let temp = scratch("fragment");
        let fragment = temp
            .join(PLUGINS_DIR)
            .join("org.eclipse.equinox.launcher.gtk.linux.x86_64_1.2.0.v2024");
        std::fs::create_dir_all(&fragment).unwrap();
        let options = options(&temp);
        assert_eq!(find_companion_library(&options), None);

        std::fs::write(fragment.join(companion_library_name()), b"lib").unwrap();
        assert_eq!(
            find_companion_library(&options),
            Some(fragment.join(companion_library_name()))
        );

        let _ = std::fs::remove_dir_all(&temp);
    }

    #[test]
    fn main_class_reads_continuation_lines_and_falls_back() {
        let temp = scratch("manifest");
        let jar = temp.join("launcher.jar");
        write_jar(
            &jar,
            "Manifest-Version: 1.0\r\nMain-Class: org.example.launch\r\n er.Main\r\nBundle-Name: x\r\n",
        );
        assert_eq!(read_main_class(&jar).unwrap(), "org.example.launcher.Main");

        write_jar(&jar, "Manifest-Version: 1.0\n");
        assert_eq!(main_class_or_default(&jar), DEFAULT_MAIN_CLASS);
        assert_eq!(main_class_or_default(&temp.join("absent.jar")), DEFAULT_MAIN_CLASS);

        let _ = std::fs::remove_dir_all(&temp);
    }
}
