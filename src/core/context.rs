// ─── Launcher Context ───
// Process-wide facts computed once at startup and passed to every component.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::java::search::find_command;
use crate::core::platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub ws: String,
    pub arch: String,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: platform::os_name().to_string(),
            ws: platform::window_system().to_string(),
            arch: platform::os_arch().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LauncherContext {
    /// Absolute path of the launcher executable.
    pub program: PathBuf,
    pub program_dir: PathBuf,
    /// argv exactly as the process received it, argv[0] included.
    pub initial_argv: Vec<String>,
    pub platform: Platform,
}

impl LauncherContext {
    pub fn from_env() -> Self {
        let initial_argv: Vec<String> = std::env::args().collect();
        let program = std::env::current_exe()
            .ok()
            .or_else(|| initial_argv.first().and_then(|argv0| find_command(argv0)))
            .unwrap_or_else(|| PathBuf::from(initial_argv.first().map(String::as_str).unwrap_or("launcher")));
        Self::new(program, initial_argv)
    }

    pub fn new(program: PathBuf, initial_argv: Vec<String>) -> Self {
        let program_dir = program
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Program {:?} in {:?}", program, program_dir);
        Self {
            program,
            program_dir,
            initial_argv,
            platform: Platform::current(),
        }
    }

    /// File stem of the launcher, e.g. `eclipse` for `/opt/eclipse/eclipse.exe`.
    pub fn program_stem(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "launcher".to_string())
    }

    /// Name used in dialogs when `-name` is not given: the stem, capitalized.
    pub fn default_official_name(&self) -> String {
        let stem = self.program_stem();
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => stem,
        }
    }

    /// User arguments, argv[0] excluded.
    pub fn user_args(&self) -> &[String] {
        self.initial_argv.get(1..).unwrap_or(&[])
    }
}
