// ─── Option Table ───
// Declarative description of every argument the bootstrap itself consumes,
// and the table-driven scanner that applies it to an argument vector.

use std::ops::BitOr;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const VMARGS: &str = "-vmargs";
pub const VM: &str = "-vm";
pub const NAME: &str = "-name";
pub const STARTUP: &str = "-startup";
pub const LIBRARY: &str = "-library";
pub const SHOWSPLASH: &str = "-showsplash";
pub const NOSPLASH: &str = "-nosplash";
pub const EXITDATA: &str = "-exitdata";
pub const LAUNCHER: &str = "-launcher";
pub const OS: &str = "-os";
pub const WS: &str = "-ws";
pub const ARCH: &str = "-arch";
pub const CONSOLE: &str = "-console";
pub const CONSOLELOG: &str = "-consoleLog";
pub const DEBUG: &str = "-debug";
pub const INI: &str = "--launcher.ini";
pub const SUPPRESS_ERRORS: &str = "--launcher.suppressErrors";
pub const SECOND_THREAD: &str = "--launcher.secondThread";
pub const APPEND_VMARGS: &str = "--launcher.appendVmargs";
pub const OVERRIDE_VMARGS: &str = "--launcher.overrideVmargs";
pub const OPEN_FILE: &str = "--launcher.openFile";
pub const OPEN_FILE_QUEUE: &str = "--launcher.openFileQueue";
pub const TIMEOUT: &str = "--launcher.timeout";
pub const DEFAULT_ACTION: &str = "--launcher.defaultAction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionFlags(u8);

impl OptionFlags {
    pub const NONE: Self = Self(0);
    /// No value follows; the slot becomes a boolean.
    pub const IS_FLAG: Self = Self(1);
    /// A value follows unless the next token starts with `-`.
    pub const OPTIONAL_VALUE: Self = Self(1 << 1);
    /// Relative values are resolved against the probe directories.
    pub const ADJUST_PATH: Self = Self(1 << 2);
    /// Every following token not starting with `-` is a value.
    pub const IS_LIST: Self = Self(1 << 3);
    /// Flag clears the slot instead of setting it.
    pub const INVERT: Self = Self(1 << 4);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OptionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Console,
    Debug,
    NoSplash,
    SuppressErrors,
    SecondThread,
    AppendVmArgs,
    Library,
    Ini,
    Os,
    Ws,
    Arch,
    ShowSplash,
    Startup,
    Vm,
    Name,
    OpenFile,
    OpenFileQueue,
    Timeout,
    DefaultAction,
    ExitData,
    Launcher,
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub slot: Slot,
    pub flags: OptionFlags,
    /// Tokens spliced out of argv on a match. 0 keeps the option visible to
    /// the launched program as well.
    pub remove: usize,
}

const fn spec(name: &'static str, slot: Slot, flags: OptionFlags, remove: usize) -> OptionSpec {
    OptionSpec {
        name,
        slot,
        flags,
        remove,
    }
}

pub const LAUNCHER_OPTIONS: &[OptionSpec] = &[
    spec(CONSOLE, Slot::Console, OptionFlags::IS_FLAG, 0),
    spec(CONSOLELOG, Slot::Console, OptionFlags::IS_FLAG, 0),
    spec(DEBUG, Slot::Debug, OptionFlags::IS_FLAG, 0),
    spec(NOSPLASH, Slot::NoSplash, OptionFlags::IS_FLAG, 1),
    spec(SUPPRESS_ERRORS, Slot::SuppressErrors, OptionFlags::IS_FLAG, 1),
    spec(SECOND_THREAD, Slot::SecondThread, OptionFlags::IS_FLAG, 1),
    spec(APPEND_VMARGS, Slot::AppendVmArgs, OptionFlags::IS_FLAG, 1),
    spec(
        OVERRIDE_VMARGS,
        Slot::AppendVmArgs,
        OptionFlags::IS_FLAG.union(OptionFlags::INVERT),
        1,
    ),
    spec(LIBRARY, Slot::Library, OptionFlags::ADJUST_PATH, 2),
    spec(INI, Slot::Ini, OptionFlags::ADJUST_PATH, 2),
    spec(OS, Slot::Os, OptionFlags::NONE, 2),
    spec(WS, Slot::Ws, OptionFlags::NONE, 2),
    spec(ARCH, Slot::Arch, OptionFlags::NONE, 2),
    spec(SHOWSPLASH, Slot::ShowSplash, OptionFlags::OPTIONAL_VALUE, 2),
    spec(STARTUP, Slot::Startup, OptionFlags::ADJUST_PATH, 2),
    spec(VM, Slot::Vm, OptionFlags::ADJUST_PATH, 2),
    spec(NAME, Slot::Name, OptionFlags::NONE, 2),
    spec(
        OPEN_FILE,
        Slot::OpenFile,
        OptionFlags::ADJUST_PATH.union(OptionFlags::IS_LIST),
        2,
    ),
    spec(OPEN_FILE_QUEUE, Slot::OpenFileQueue, OptionFlags::NONE, 2),
    spec(TIMEOUT, Slot::Timeout, OptionFlags::NONE, 2),
    spec(DEFAULT_ACTION, Slot::DefaultAction, OptionFlags::NONE, 2),
    spec(EXITDATA, Slot::ExitData, OptionFlags::NONE, 2),
    spec(LAUNCHER, Slot::Launcher, OptionFlags::NONE, 2),
];

/// Values captured by a scan. Later scans overwrite earlier ones, which gives
/// command-line options precedence over config-file options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    pub console: bool,
    pub debug: bool,
    pub no_splash: bool,
    pub suppress_errors: bool,
    pub second_thread: bool,
    pub append_vm_args: bool,
    pub show_splash: bool,
    pub splash: Option<String>,
    pub library: Option<String>,
    pub ini: Option<String>,
    pub os: Option<String>,
    pub ws: Option<String>,
    pub arch: Option<String>,
    pub startup: Option<String>,
    pub vm: Option<String>,
    pub name: Option<String>,
    pub open_files: Vec<String>,
    pub open_file_queue: Option<String>,
    pub timeout: Option<String>,
    pub default_action: Option<String>,
    pub exit_data: Option<String>,
    pub launcher: Option<String>,
}

impl ParsedOptions {
    fn set_flag(&mut self, slot: Slot, value: bool) {
        match slot {
            Slot::Console => self.console = value,
            Slot::Debug => self.debug = value,
            Slot::NoSplash => self.no_splash = value,
            Slot::SuppressErrors => self.suppress_errors = value,
            Slot::SecondThread => self.second_thread = value,
            Slot::AppendVmArgs => self.append_vm_args = value,
            Slot::ShowSplash => self.show_splash = value,
            other => debug!("Slot {:?} is not a flag", other),
        }
    }

    fn set_value(&mut self, slot: Slot, value: String) {
        let target = match slot {
            Slot::Library => &mut self.library,
            Slot::Ini => &mut self.ini,
            Slot::Os => &mut self.os,
            Slot::Ws => &mut self.ws,
            Slot::Arch => &mut self.arch,
            Slot::ShowSplash => &mut self.splash,
            Slot::Startup => &mut self.startup,
            Slot::Vm => &mut self.vm,
            Slot::Name => &mut self.name,
            Slot::OpenFileQueue => &mut self.open_file_queue,
            Slot::Timeout => &mut self.timeout,
            Slot::DefaultAction => &mut self.default_action,
            Slot::ExitData => &mut self.exit_data,
            Slot::Launcher => &mut self.launcher,
            Slot::OpenFile => {
                self.open_files.push(value);
                return;
            }
            other => {
                debug!("Slot {:?} does not take a value", other);
                return;
            }
        };
        *target = Some(value);
    }
}

/// Ordered directories a relative ADJUST_PATH value is probed against.
#[derive(Debug, Clone)]
pub struct PathProbe {
    dirs: Vec<PathBuf>,
}

impl PathProbe {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Command-line order: working directory first, then the program dir.
    pub fn command_line(program_dir: &Path) -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::new(vec![cwd, program_dir.to_path_buf()])
    }

    /// Config-file order: the file's own directory first, then the working dir.
    pub fn config_file(config_dir: &Path) -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::new(vec![config_dir.to_path_buf(), cwd])
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing `<dir>/<value>` wins; otherwise the value is kept as is.
    pub fn check_path(&self, value: &str) -> String {
        if is_absolute(value) {
            return value.to_string();
        }
        for dir in &self.dirs {
            if dir.as_os_str().is_empty() {
                continue;
            }
            let candidate = dir.join(value);
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }
        value.to_string()
    }

    /// Applies `check_path` to every entry of a path-separator list.
    pub fn check_path_list(&self, value: &str) -> String {
        let separator = crate::core::platform::path_list_separator();
        value
            .split(separator)
            .map(|entry| self.check_path(entry))
            .collect::<Vec<_>>()
            .join(&separator.to_string())
    }
}

fn is_absolute(value: &str) -> bool {
    let bytes = value.as_bytes();
    Path::new(value).is_absolute()
        || value.starts_with('/')
        || value.starts_with('\\')
        || (bytes.len() > 2 && bytes[1] == b':')
}

/// Splits argv at `-vmargs`: everything after it is captured verbatim and
/// never seen by the option table.
pub fn split_vm_args(mut argv: Vec<String>) -> (Vec<String>, Option<Vec<String>>) {
    match argv.iter().position(|arg| arg.eq_ignore_ascii_case(VMARGS)) {
        Some(index) => {
            let vm_args = argv.split_off(index + 1);
            argv.pop();
            (argv, Some(vm_args))
        }
        None => (argv, None),
    }
}

pub fn find_option<'t>(table: &'t [OptionSpec], arg: &str) -> Option<&'t OptionSpec> {
    table.iter().find(|option| option.name.eq_ignore_ascii_case(arg))
}

/// Scans `argv` left to right, records recognized options into `parsed` and
/// splices the consumed tokens out in place. Returns the number removed.
pub fn parse_args(
    argv: &mut Vec<String>,
    table: &[OptionSpec],
    probe: &PathProbe,
    parsed: &mut ParsedOptions,
) -> usize {
    let mut removed_total = 0;
    let mut index = 0;

    while index < argv.len() {
        let Some(option) = find_option(table, &argv[index]) else {
            index += 1;
            continue;
        };

        let following = |offset: usize| argv.get(index + offset).filter(|next| !next.starts_with('-'));

        let consumed_values = if option.flags.contains(OptionFlags::IS_FLAG) {
            parsed.set_flag(option.slot, !option.flags.contains(OptionFlags::INVERT));
            0
        } else if option.flags.contains(OptionFlags::IS_LIST) {
            let mut count = 0;
            while let Some(value) = following(count + 1) {
                let value = if option.flags.contains(OptionFlags::ADJUST_PATH) {
                    probe.check_path(value)
                } else {
                    value.clone()
                };
                parsed.set_value(option.slot, value);
                count += 1;
            }
            count
        } else {
            if option.slot == Slot::ShowSplash {
                parsed.set_flag(Slot::ShowSplash, true);
            }
            match following(1) {
                Some(value) => {
                    let value = if option.flags.contains(OptionFlags::ADJUST_PATH) {
                        probe.check_path(value)
                    } else {
                        value.clone()
                    };
                    parsed.set_value(option.slot, value);
                    1
                }
                None => {
                    if !option.flags.contains(OptionFlags::OPTIONAL_VALUE) {
                        debug!("Option {} is missing its value", option.name);
                    }
                    0
                }
            }
        };

        let remove = if option.remove == 0 {
            0
        } else {
            (1 + consumed_values).min(argv.len() - index)
        };

        if remove > 0 {
            argv.drain(index..index + remove);
            removed_total += remove;
        } else {
            index += 1 + consumed_values;
        }
    }

    removed_total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn no_probe() -> PathProbe {
        PathProbe::new(Vec::new())
    }

    #[test]
    fn all_recognized_flags_leave_no_residue() {
        let mut argv = args(&[
            "-vm",
            "/x/java",
            "-name",
            "Tool",
            "-nosplash",
            "--launcher.suppressErrors",
            "-startup",
            "/x/startup.jar",
        ]);
        let original = argv.len();
        let mut parsed = ParsedOptions::default();
        let removed = parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);

        assert!(argv.is_empty());
        assert_eq!(removed, original);
        assert_eq!(parsed.vm.as_deref(), Some("/x/java"));
        assert_eq!(parsed.name.as_deref(), Some("Tool"));
        assert!(parsed.no_splash && parsed.suppress_errors);
    }

    #[test]
    fn residual_length_is_original_minus_consumed() {
        let mut argv = args(&["-clean", "-vm", "/x/java", "-data", "/ws", "-debug"]);
        let original = argv.len();
        let mut parsed = ParsedOptions::default();
        let removed = parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);

        assert_eq!(argv.len(), original - removed);
        assert_eq!(argv, args(&["-clean", "-data", "/ws", "-debug"]));
        assert!(parsed.debug);
    }

    #[test]
    fn options_match_case_insensitively() {
        let mut argv = args(&["-NoSplash", "-VM", "java"]);
        let mut parsed = ParsedOptions::default();
        parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert!(parsed.no_splash);
        assert_eq!(parsed.vm.as_deref(), Some("java"));
    }

    #[test]
    fn showsplash_value_is_optional() {
        let mut argv = args(&["-showsplash", "-clean"]);
        let mut parsed = ParsedOptions::default();
        parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert!(parsed.show_splash);
        assert_eq!(parsed.splash, None);
        assert_eq!(argv, args(&["-clean"]));

        let mut argv = args(&["-showsplash", "splash.bmp", "-clean"]);
        let mut parsed = ParsedOptions::default();
        parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert_eq!(parsed.splash.as_deref(), Some("splash.bmp"));
        assert_eq!(argv, args(&["-clean"]));
    }

    #[test]
    fn list_options_consume_until_next_dash_token() {
        let mut argv = args(&["--launcher.openFile", "a.txt", "b.txt", "-clean"]);
        let mut parsed = ParsedOptions::default();
        let removed = parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert_eq!(removed, 3);
        assert_eq!(parsed.open_files, args(&["a.txt", "b.txt"]));
        assert_eq!(argv, args(&["-clean"]));
    }

    #[test]
    fn invert_flag_clears_the_slot() {
        let mut argv = args(&["--launcher.appendVmargs", "--launcher.overrideVmargs"]);
        let mut parsed = ParsedOptions::default();
        parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert!(!parsed.append_vm_args);
    }

    #[test]
    fn value_option_at_end_of_argv_does_not_overrun() {
        let mut argv = args(&["-clean", "-vm"]);
        let mut parsed = ParsedOptions::default();
        let removed = parse_args(&mut argv, LAUNCHER_OPTIONS, &no_probe(), &mut parsed);
        assert_eq!(removed, 1);
        assert_eq!(argv, args(&["-clean"]));
        assert_eq!(parsed.vm, None);
    }

    #[test]
    fn vmargs_split_is_disjoint_and_order_preserving() {
        let (head, tail) = split_vm_args(args(&["-vm", "/x/java", "-vmargs", "-Xmx256m", "-Da=b"]));
        assert_eq!(head, args(&["-vm", "/x/java"]));
        assert_eq!(tail, Some(args(&["-Xmx256m", "-Da=b"])));

        let (head, tail) = split_vm_args(args(&["-clean"]));
        assert_eq!(head, args(&["-clean"]));
        assert_eq!(tail, None);

        let (head, tail) = split_vm_args(args(&["-vmargs"]));
        assert!(head.is_empty());
        assert_eq!(tail, Some(Vec::new()));
    }

    #[test]
    fn check_path_prefers_first_existing_probe_dir() {
        let temp = std::env::temp_dir().join(format!("options-probe-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        let first = temp.join("first");
        let second = temp.join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(second.join("startup.jar"), b"jar").unwrap();

        let probe = PathProbe::new(vec![first.clone(), second.clone()]);
        assert_eq!(
            probe.check_path("startup.jar"),
            second.join("startup.jar").to_string_lossy()
        );

        std::fs::write(first.join("startup.jar"), b"jar").unwrap();
        assert_eq!(
            probe.check_path("startup.jar"),
            first.join("startup.jar").to_string_lossy()
        );
        assert_eq!(probe.check_path("missing.jar"), "missing.jar");

        let _ = std::fs::remove_dir_all(&temp);
    }
}
