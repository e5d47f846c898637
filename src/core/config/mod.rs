// ─── Configuration ───
// Merges `.ini` arguments and command-line arguments into `LaunchOptions`.
// Command-line values win; config-file user arguments come first so that
// "last definition wins" holds for duplicated program flags.

pub mod ini;
pub mod options;

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::core::context::LauncherContext;
use crate::core::error::LauncherError;

use options::{parse_args, split_vm_args, ParsedOptions, PathProbe, LAUNCHER_OPTIONS};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const OPEN_FILE_ACTION: &str = "openFile";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchFlags {
    pub console: bool,
    pub debug: bool,
    pub show_splash: bool,
    pub no_splash: bool,
    pub suppress_errors: bool,
    pub second_thread: bool,
    pub append_vm_args: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub official_name: String,
    pub program_path: PathBuf,
    pub program_dir: PathBuf,
    /// Directory of the config file, or the program dir without one.
    pub config_dir: PathBuf,
    pub vm_hint: Option<String>,
    pub startup_jar: Option<String>,
    pub library: Option<String>,
    /// `None` when neither the command line nor the config file had `-vmargs`.
    pub vm_args: Option<Vec<String>>,
    pub prog_args: Vec<String>,
    pub splash: Option<String>,
    pub open_files: Vec<String>,
    pub timeout_secs: u64,
    pub os: String,
    pub ws: String,
    pub arch: String,
    pub flags: LaunchFlags,
}

/// Reads the config file (if any) and merges it with the command line.
pub fn load_launch_options(ctx: &LauncherContext) -> LaunchOptions {
    let (command_args, _) = split_vm_args(ctx.user_args().to_vec());
    let ini_path = ini::locate_ini(ctx, ini::ini_override(&command_args).as_deref());

    let config_args = match &ini_path {
        Some(path) => match ini::read_config_file(path) {
            Ok(args) => {
                info!("Using config file {:?}", path);
                args
            }
            Err(err) => {
                // Missing or unreadable config is not fatal.
                let err = LauncherError::Config(err.to_string());
                debug!("{}", err);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let config_dir = ini_path
        .as_ref()
        .and_then(|path| path.parent().map(PathBuf::from))
        .unwrap_or_else(|| ctx.program_dir.clone());

    let mut options = merge_options(
        ctx,
        config_args,
        ctx.user_args().to_vec(),
        &PathProbe::config_file(&config_dir),
        &PathProbe::command_line(&ctx.program_dir),
    );
    options.config_dir = config_dir;
    options
}

/// Pure merge of config-file and command-line argument vectors.
pub fn merge_options(
    ctx: &LauncherContext,
    config_args: Vec<String>,
    command_args: Vec<String>,
    config_probe: &PathProbe,
    command_probe: &PathProbe,
) -> LaunchOptions {
    let (mut config_args, config_vm_args) = split_vm_args(config_args);
    let (mut command_args, command_vm_args) = split_vm_args(command_args);

    let mut parsed = ParsedOptions::default();
    parse_args(&mut config_args, LAUNCHER_OPTIONS, config_probe, &mut parsed);
    parse_args(&mut command_args, LAUNCHER_OPTIONS, command_probe, &mut parsed);

    apply_default_action(&mut parsed, &mut command_args, command_probe);

    let vm_args = match (config_vm_args, command_vm_args) {
        (Some(mut config), Some(command)) if parsed.append_vm_args => {
            config.extend(command);
            Some(config)
        }
        (_, Some(command)) => Some(command),
        (config, None) => config,
    };

    let mut prog_args = config_args;
    prog_args.extend(command_args);

    let timeout_secs = match parsed.timeout.as_deref() {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                "{}",
                LauncherError::Config(format!("invalid timeout {raw:?}, using {DEFAULT_TIMEOUT_SECS}s"))
            );
            DEFAULT_TIMEOUT_SECS
        }),
        None => DEFAULT_TIMEOUT_SECS,
    };

    let options = LaunchOptions {
        official_name: parsed
            .name
            .clone()
            .unwrap_or_else(|| ctx.default_official_name()),
        program_path: ctx.program.clone(),
        program_dir: ctx.program_dir.clone(),
        config_dir: ctx.program_dir.clone(),
        vm_hint: parsed.vm.clone(),
        startup_jar: parsed.startup.clone(),
        library: parsed.library.clone(),
        vm_args,
        prog_args,
        splash: parsed.splash.clone(),
        open_files: parsed.open_files.clone(),
        timeout_secs,
        os: parsed.os.clone().unwrap_or_else(|| ctx.platform.os.clone()),
        ws: parsed.ws.clone().unwrap_or_else(|| ctx.platform.ws.clone()),
        arch: parsed.arch.clone().unwrap_or_else(|| ctx.platform.arch.clone()),
        flags: LaunchFlags {
            console: parsed.console,
            debug: parsed.debug,
            show_splash: parsed.show_splash,
            no_splash: parsed.no_splash,
            suppress_errors: parsed.suppress_errors,
            second_thread: parsed.second_thread,
            append_vm_args: parsed.append_vm_args,
        },
    };
    debug!("Launch options: {:?}", options);
    options
}

/// With `--launcher.defaultAction openFile`, a command line made only of bare
/// arguments is treated as a list of files to open.
fn apply_default_action(parsed: &mut ParsedOptions, command_args: &mut Vec<String>, probe: &PathProbe) {
    let wants_open_file = parsed
        .default_action
        .as_deref()
        .is_some_and(|action| action.eq_ignore_ascii_case(OPEN_FILE_ACTION));
    if !wants_open_file || !parsed.open_files.is_empty() || command_args.is_empty() {
        return;
    }
    if command_args.iter().any(|arg| arg.starts_with('-')) {
        return;
    }
    parsed.open_files = command_args.drain(..).map(|arg| probe.check_path(&arg)).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn ctx() -> LauncherContext {
        LauncherContext::new(PathBuf::from("/opt/tool/tool"), vec!["tool".into()])
    }

    fn merge(config: &[&str], command: &[&str]) -> LaunchOptions {
        let probe = PathProbe::new(Vec::new());
        merge_options(&ctx(), args(config), args(command), &probe, &probe)
    }

    #[test]
    fn config_vmargs_are_used_when_command_line_has_none() {
        let options = merge(&["-consoleLog", "-vmargs", "-Xms40m"], &[]);
        assert_eq!(options.vm_args, Some(args(&["-Xms40m"])));
        assert!(options.flags.console);
        assert_eq!(options.prog_args, args(&["-consoleLog"]));
    }

    #[test]
    fn command_line_vmargs_replace_config_vmargs() {
        let options = merge(&["-vmargs", "-Xms40m"], &["-vmargs", "-Xmx1g"]);
        assert_eq!(options.vm_args, Some(args(&["-Xmx1g"])));
    }

    #[test]
    fn append_vmargs_concatenates_config_then_command_line() {
        let options = merge(
            &["--launcher.appendVmargs", "-vmargs", "-Xms40m"],
            &["-vmargs", "-Xmx1g"],
        );
        assert_eq!(options.vm_args, Some(args(&["-Xms40m", "-Xmx1g"])));
        assert!(options.flags.append_vm_args);
    }

    #[test]
    fn command_line_override_beats_config_append() {
        let options = merge(
            &["--launcher.appendVmargs", "-vmargs", "-Xms40m"],
            &["--launcher.overrideVmargs", "-vmargs", "-Xmx1g"],
        );
        assert_eq!(options.vm_args, Some(args(&["-Xmx1g"])));
    }

    #[test]
    fn config_user_args_precede_command_line_user_args() {
        let options = merge(&["-data", "/cfg", "-vm", "/cfg/java"], &["-data", "/cli", "-vm", "/cli/java"]);
        assert_eq!(options.prog_args, args(&["-data", "/cfg", "-data", "/cli"]));
        assert_eq!(options.vm_hint.as_deref(), Some("/cli/java"));
    }

    #[test]
    fn no_vmargs_anywhere_stays_none() {
        let options = merge(&["-clean"], &["-nosplash"]);
        assert_eq!(options.vm_args, None);
        assert!(options.flags.no_splash);
        assert_eq!(options.official_name, "Tool");
        assert_eq!(options.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn default_action_turns_bare_args_into_open_files() {
        let options = merge(&["--launcher.defaultAction", "openFile"], &["a.txt", "b.txt"]);
        assert_eq!(options.open_files, args(&["a.txt", "b.txt"]));
        assert!(options.prog_args.is_empty());

        let options = merge(&["--launcher.defaultAction", "openFile"], &["-clean", "a.txt"]);
        assert!(options.open_files.is_empty());
    }

    #[test]
    fn bad_timeout_falls_back_to_default() {
        let options = merge(&[], &["--launcher.timeout", "soon"]);
        assert_eq!(options.timeout_secs, DEFAULT_TIMEOUT_SECS);
        let options = merge(&[], &["--launcher.timeout", "5"]);
        assert_eq!(options.timeout_secs, 5);
    }
}
