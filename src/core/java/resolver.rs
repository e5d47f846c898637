// ─── VM Resolver ───
// Turns a classified `-vm` hint into a concrete VM. A library means the VM
// is embedded through JNI; an executable means it is started as a child.
//
// Every candidate tested is recorded so a failure can list them all.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::config::LaunchOptions;
use crate::core::context::LauncherContext;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::{
    path_list_separator, CONSOLE_VM, DEFAULT_EE, DEFAULT_VM, LIBRARY_PATH_VAR, SHIPPED_VM_DIR,
    VM_LIBRARY,
};
use crate::core::restart::RestartRequest;

use super::classify::{classify, VmHint};
use super::ee::{load_ee, EeProps};
use super::probe::is_modular_vm;
use super::registry::find_registry_vm;
use super::search::{find_command_in, find_vm_library, has_dir_separator, resolve_symlinks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmKind {
    Executable,
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVm {
    pub kind: VmKind,
    pub path: PathBuf,
    pub is_modular: bool,
    pub needs_framework_fixup: bool,
}

impl ResolvedVm {
    pub fn new(kind: VmKind, path: PathBuf) -> Self {
        let is_modular = is_modular_vm(&path, kind == VmKind::Executable);
        let needs_framework_fixup =
            cfg!(target_os = "macos") && kind == VmKind::Library && is_bundle_home_library(&path);
        Self {
            kind,
            path,
            is_modular,
            needs_framework_fixup,
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.kind == VmKind::Library
    }
}

/// A resolved VM plus whatever its `.ee` file contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub vm: ResolvedVm,
    pub ee_vm_args: Vec<String>,
    pub ee_library_path: Option<String>,
}

impl Resolution {
    fn plain(vm: ResolvedVm) -> Self {
        Self {
            vm,
            ee_vm_args: Vec::new(),
            ee_library_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(Resolution),
    /// The loader search path must change, which only a fresh process sees.
    RestartRequested(RestartRequest),
}

/// Search environment. Defaults to the real process environment; tests pin
/// PATH and the working directory.
#[derive(Debug, Clone)]
pub struct VmResolver {
    program_dir: PathBuf,
    config_dir: PathBuf,
    cwd: PathBuf,
    path_var: Option<OsString>,
    console: bool,
    use_registry: bool,
}

impl VmResolver {
    pub fn new(program_dir: &Path, console: bool) -> Self {
        Self {
            program_dir: program_dir.to_path_buf(),
            config_dir: program_dir.to_path_buf(),
            cwd: std::env::current_dir().unwrap_or_default(),
            path_var: std::env::var_os("PATH"),
            console,
            use_registry: true,
        }
    }

    pub fn with_search_env(mut self, cwd: &Path, path_var: Option<OsString>) -> Self {
        self.cwd = cwd.to_path_buf();
        self.path_var = path_var;
        self.use_registry = false;
        self
    }

    /// Relative `.ee` paths fall back to this directory before the working dir.
    pub fn with_config_dir(mut self, config_dir: &Path) -> Self {
        self.config_dir = config_dir.to_path_buf();
        self
    }

    fn default_vm_name(&self) -> &'static str {
        if self.console {
            CONSOLE_VM
        } else {
            DEFAULT_VM
        }
    }

    #[instrument(skip(self))]
    pub fn resolve(&self, hint: &VmHint) -> LauncherResult<Resolution> {
        let mut probed = Vec::new();
        let found = match hint {
            VmHint::Nothing => self.resolve_default(&mut probed),
            VmHint::Directory(dir) => self.resolve_directory(dir, &mut probed),
            VmHint::EeProps(file) => self.resolve_ee(file, &mut probed),
            VmHint::Library(path) => self.resolve_library(path, &mut probed),
            VmHint::Other(name) => self.resolve_other(name, &mut probed),
        };
        match found {
            Some(resolution) => {
                info!(
                    "Resolved {:?} VM at {:?} (modular: {})",
                    resolution.vm.kind, resolution.vm.path, resolution.vm.is_modular
                );
                Ok(resolution)
            }
            None => {
                warn!("No VM found for {:?}, probed {} locations", hint, probed.len());
                Err(LauncherError::VmNotFound { probed })
            }
        }
    }

    fn resolve_default(&self, probed: &mut Vec<String>) -> Option<Resolution> {
        let shipped = self.program_dir.join(SHIPPED_VM_DIR);

        let default_ee = shipped.join(DEFAULT_EE);
        if default_ee.is_file() {
            if let Some(resolution) = self.resolve_ee(&default_ee, probed) {
                return Some(resolution);
            }
        } else {
            probed.push(display(&default_ee));
        }

        let bundled = shipped.join(self.default_vm_name());
        probed.push(display(&bundled));
        if let Some(exe) = find_command_in(&display(&bundled), None, &self.cwd) {
            return Some(self.prefer_library(exe));
        }

        probed.push(path_message(self.default_vm_name()));
        if let Some(exe) = find_command_in(self.default_vm_name(), self.path_var.clone(), &self.cwd) {
            return Some(self.prefer_library(resolve_symlinks(&exe)));
        }

        if self.use_registry {
            if let Some(lib) = find_registry_vm(probed) {
                return Some(Resolution::plain(ResolvedVm::new(VmKind::Library, lib)));
            }
        }
        None
    }

    fn resolve_directory(&self, dir: &Path, probed: &mut Vec<String>) -> Option<Resolution> {
        let default_ee = dir.join(DEFAULT_EE);
        probed.push(display(&default_ee));
        if default_ee.is_file() {
            if let Some(resolution) = self.resolve_ee(&default_ee, probed) {
                return Some(resolution);
            }
        }

        let exe = dir.join(self.default_vm_name());
        probed.push(display(&exe));
        if let Some(exe) = find_command_in(&display(&exe), None, &self.cwd) {
            return Some(self.prefer_library(exe));
        }

        let lib = dir.join(VM_LIBRARY);
        probed.push(display(&lib));
        if lib.is_file() {
            return Some(Resolution::plain(ResolvedVm::new(VmKind::Library, lib)));
        }
        None
    }

    fn resolve_ee(&self, file: &Path, probed: &mut Vec<String>) -> Option<Resolution> {
        let props = match load_ee(file, &[self.config_dir.clone(), self.cwd.clone()]) {
            Ok(props) => props,
            Err(err) => {
                debug!("Cannot read ee file {:?}: {}", file, err);
                probed.push(display(file));
                return None;
            }
        };

        let mut candidates: Vec<(VmKind, &String)> = Vec::new();
        if let Some(lib) = &props.vm_library {
            candidates.push((VmKind::Library, lib));
        }
        if self.console {
            if let Some(console) = &props.console {
                candidates.push((VmKind::Executable, console));
            }
        }
        if let Some(exe) = &props.executable {
            candidates.push((VmKind::Executable, exe));
        }
        if candidates.is_empty() {
            probed.push(display(file));
            return None;
        }

        for (kind, candidate) in candidates {
            probed.push(candidate.clone());
            let path = PathBuf::from(candidate);
            let exists = match kind {
                VmKind::Library => path.is_file(),
                VmKind::Executable => find_command_in(candidate, None, &props.home).is_some(),
            };
            if exists {
                return Some(from_ee(ResolvedVm::new(kind, path), props));
            }
        }
        None
    }

    fn resolve_library(&self, path: &Path, probed: &mut Vec<String>) -> Option<Resolution> {
        let shown = display(path);
        if path.is_file() {
            return Some(Resolution::plain(ResolvedVm::new(VmKind::Library, path.to_path_buf())));
        }
        probed.push(if has_dir_separator(&shown) {
            shown
        } else {
            path_message(&shown)
        });
        None
    }

    fn resolve_other(&self, name: &str, probed: &mut Vec<String>) -> Option<Resolution> {
        match find_command_in(name, self.path_var.clone(), &self.cwd) {
            Some(exe) => Some(self.prefer_library(resolve_symlinks(&exe))),
            None => {
                probed.push(if has_dir_separator(name) {
                    name.to_string()
                } else {
                    path_message(name)
                });
                None
            }
        }
    }

    /// An executable with a VM library next to it is embedded instead.
    fn prefer_library(&self, exe: PathBuf) -> Resolution {
        let mut library_probes = Vec::new();
        match find_vm_library(&exe, &mut library_probes) {
            Some(lib) => {
                debug!("Embedding {:?} found next to {:?}", lib, exe);
                Resolution::plain(ResolvedVm::new(VmKind::Library, lib))
            }
            None => {
                debug!("No VM library near {:?}, probed {:?}", exe, library_probes);
                Resolution::plain(ResolvedVm::new(VmKind::Executable, exe))
            }
        }
    }
}

fn from_ee(vm: ResolvedVm, props: EeProps) -> Resolution {
    Resolution {
        vm,
        ee_vm_args: props.vm_args,
        ee_library_path: props.library_path,
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn path_message(name: &str) -> String {
    format!("{name} in your current PATH")
}

/// True for `.../Contents/Home/...` libraries inside a JDK bundle.
pub fn is_bundle_home_library(path: &Path) -> bool {
    let components: Vec<Component<'_>> = path.components().collect();
    components
        .windows(2)
        .any(|pair| pair[0].as_os_str() == "Contents" && pair[1].as_os_str() == "Home")
}

/// Java home of a framework library: the `Contents` directory's sibling
/// `MacOS` holds `libjli.dylib`.
pub fn framework_jli_path(path: &Path) -> Option<PathBuf> {
    let contents = path
        .ancestors()
        .find(|dir| dir.file_name().is_some_and(|name| name == "Contents"))?;
    Some(contents.join("MacOS").join("libjli.dylib"))
}

/// Directories the loader must see before an embedded VM library can load.
pub fn required_library_dirs(library: &Path, ee_library_path: Option<&str>) -> Vec<String> {
    if let Some(list) = ee_library_path.filter(|list| !list.is_empty()) {
        return list
            .split(path_list_separator())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
    }
    let mut dirs = Vec::new();
    if let Some(lib_dir) = library.parent() {
        dirs.push(display(lib_dir));
        if let Some(parent) = lib_dir.parent() {
            dirs.push(display(parent));
        }
    }
    dirs
}

/// Builds the self-restart that puts `required` on the loader path, or
/// `None` when `current` already lists every directory.
pub fn library_path_restart(
    ctx: &LauncherContext,
    var: &str,
    required: &[String],
    current: Option<&str>,
) -> Option<RestartRequest> {
    let separator = path_list_separator();
    let existing: Vec<&str> = current
        .unwrap_or("")
        .split(separator)
        .map(|entry| entry.trim_end_matches(['/', '\\']))
        .filter(|entry| !entry.is_empty())
        .collect();
    let missing = required
        .iter()
        .any(|dir| !existing.contains(&dir.trim_end_matches(['/', '\\'])));
    if !missing {
        return None;
    }

    let mut value = required.join(&separator.to_string());
    if let Some(current) = current.filter(|current| !current.is_empty()) {
        value.push(separator);
        value.push_str(current);
    }

    let mut argv = ctx.initial_argv.clone();
    let program = display(&ctx.program);
    match argv.first_mut() {
        Some(first) => *first = program,
        None => argv.push(program),
    }

    Some(RestartRequest {
        reason: format!("{var} must include {}", required.join(&separator.to_string())),
        argv,
        env: vec![(var.to_string(), value)],
    })
}

/// Classifies the hint, resolves it and checks the loader search path for
/// embedded VMs.
pub fn resolve_vm(ctx: &LauncherContext, options: &LaunchOptions) -> LauncherResult<ResolveOutcome> {
    let resolver = VmResolver::new(&options.program_dir, options.flags.console || options.flags.debug)
        .with_config_dir(&options.config_dir);
    let loader_path = LIBRARY_PATH_VAR.and_then(|var| std::env::var(var).ok());
    resolve_vm_with(ctx, options, &resolver, loader_path.as_deref())
}

/// `resolve_vm` against an explicit search environment and loader path.
pub fn resolve_vm_with(
    ctx: &LauncherContext,
    options: &LaunchOptions,
    resolver: &VmResolver,
    loader_path: Option<&str>,
) -> LauncherResult<ResolveOutcome> {
    let hint = classify(options.vm_hint.as_deref());
    debug!("VM hint {:?} classified as {:?}", options.vm_hint, hint);
    let resolution = resolver.resolve(&hint)?;

    if resolution.vm.is_embedded() {
        if let Some(var) = LIBRARY_PATH_VAR {
            let required =
                required_library_dirs(&resolution.vm.path, resolution.ee_library_path.as_deref());
            if let Some(restart) = library_path_restart(ctx, var, &required, loader_path) {
                info!("Restart requested: {}", restart.reason);
                return Ok(ResolveOutcome::RestartRequested(restart));
            }
        }
    }
    Ok(ResolveOutcome::Resolved(resolution))
}
