// ─── VM Probe ───
// Determines the Java version of a resolved VM, preferring the `release`
// file of its Java home and falling back to running `-version`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument};

/// First Java release with the module system.
const MODULAR_MAJOR: u32 = 9;
const RELEASE_SEARCH_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    pub version: String,
    pub major: u32,
}

impl JavaVersion {
    fn from_version(version: String) -> Self {
        let major = parse_major_version(&version);
        Self { version, major }
    }

    pub fn is_modular(&self) -> bool {
        self.major >= MODULAR_MAJOR
    }
}

/// Version from the nearest `release` file above `vm_path`.
pub fn release_version(vm_path: &Path) -> Option<JavaVersion> {
    let release = find_release_file(vm_path)?;
    let content = std::fs::read_to_string(&release).ok()?;
    let version = parse_release_version(&content)?;
    debug!("{:?} declares JAVA_VERSION={}", release, version);
    Some(JavaVersion::from_version(version))
}

fn find_release_file(vm_path: &Path) -> Option<PathBuf> {
    vm_path
        .ancestors()
        .skip(1)
        .take(RELEASE_SEARCH_DEPTH)
        .map(|dir| dir.join("release"))
        .find(|candidate| candidate.is_file())
}

fn parse_release_version(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("JAVA_VERSION=")?;
        Some(value.trim().trim_matches('"').to_string())
    })
}

/// Runs `<java> -version` and parses the quoted version string.
#[instrument]
pub fn probe_java(path: &Path) -> Option<JavaVersion> {
    let output = Command::new(path).arg("-version").output().ok()?;
    let version_output = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!(
        "Probing {:?}: {}",
        path,
        version_output.lines().next().unwrap_or("")
    );
    parse_version_string(&version_output).map(JavaVersion::from_version)
}

/// Module support of a VM: `release` file first, then (for executables only)
/// a `-version` probe. Unknown means not modular.
pub fn is_modular_vm(vm_path: &Path, executable: bool) -> bool {
    if let Some(version) = release_version(vm_path) {
        return version.is_modular();
    }
    if executable {
        if let Some(version) = probe_java(vm_path) {
            return version.is_modular();
        }
    }
    false
}

fn parse_version_string(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
    }
    None
}

pub fn parse_major_version(version: &str) -> u32 {
    let first_part = version
        .split(|c: char| c == '.' || c == '-' || c == '+' || c == '_')
        .next()
        .unwrap_or("0");
    let major: u32 = first_part.parse().unwrap_or(0);

    if major == 1 {
        version
            .split('.')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(major)
    } else {
        major
    }
}
