// ─── VM Command ───
// Pure construction of the VM and program argument vectors. Nothing here
// touches the filesystem or the environment, so equal inputs give equal
// output.

use std::path::{Path, PathBuf};

use crate::core::config::options;
use crate::core::config::LaunchOptions;
use crate::core::java::Resolution;
use crate::core::platform::default_vm_args;

use super::LaunchMode;

pub const CLASSPATH_PROPERTY: &str = "-Djava.class.path=";
pub const JAR_FLAG: &str = "-jar";

/// Module-system VM options a Java 8 VM refuses to start with.
pub const MODULE_FLAGS: &[&str] = &[
    "--add-modules",
    "--add-opens",
    "--add-exports",
    "--add-reads",
    "--patch-module",
    "--limit-modules",
    "--illegal-access",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmCommand {
    /// `None` for commands read back from exit data, whose first token
    /// names the program when it is not an option.
    pub executable: Option<PathBuf>,
    pub vm_argv: Vec<String>,
    pub prog_argv: Vec<String>,
}

impl VmCommand {
    /// Full argv, executable first when there is one.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.vm_argv.len() + self.prog_argv.len());
        if let Some(executable) = &self.executable {
            argv.push(executable.to_string_lossy().to_string());
        }
        argv.extend(self.vm_argv.iter().cloned());
        argv.extend(self.prog_argv.iter().cloned());
        argv
    }

    /// One argument per line; an empty trailing line is dropped.
    pub fn from_exit_data(data: &str) -> Self {
        let mut lines: Vec<String> = data.split('\n').map(|line| line.trim_end_matches('\r').to_string()).collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        Self {
            executable: None,
            vm_argv: Vec::new(),
            prog_argv: lines,
        }
    }

    /// Program and arguments for a child process. A command without an
    /// executable whose first token is an option is a launcher command line.
    pub fn program_and_args(&self, launcher: &Path) -> (PathBuf, Vec<String>) {
        let mut argv = self.argv();
        match &self.executable {
            Some(executable) => {
                argv.remove(0);
                (executable.clone(), argv)
            }
            None => match argv.first() {
                Some(first) if !first.starts_with('-') => {
                    let program = PathBuf::from(argv.remove(0));
                    (program, argv)
                }
                _ => (launcher.to_path_buf(), argv),
            },
        }
    }

    pub fn classpath_arg_count(&self) -> usize {
        self.vm_argv
            .iter()
            .filter(|arg| arg.starts_with(CLASSPATH_PROPERTY) || arg.as_str() == JAR_FLAG)
            .count()
    }
}

/// Everything `build_command` needs beyond the merged options.
#[derive(Debug, Clone)]
pub struct CommandInputs<'a> {
    pub options: &'a LaunchOptions,
    pub resolution: &'a Resolution,
    pub mode: LaunchMode,
    pub startup_jar: &'a Path,
    pub library: Option<&'a Path>,
    pub exit_data_id: Option<&'a str>,
    /// Where a running instance collects files forwarded by later launchers.
    pub open_file_queue: Option<&'a Path>,
}

pub fn build_command(inputs: &CommandInputs<'_>) -> VmCommand {
    let options = inputs.options;
    let vm = &inputs.resolution.vm;
    let embedded = inputs.mode == LaunchMode::InProcess;
    let jar = inputs.startup_jar.to_string_lossy().to_string();

    let user_vm_args = options
        .vm_args
        .clone()
        .unwrap_or_else(|| default_vm_args(&options.ws, embedded));
    let ee_vm_args = &inputs.resolution.ee_vm_args;
    let mut vm_argv = drop_classpath_args(&user_vm_args, &jar);
    // A relaunch passes the previous run's .ee arguments back through -vmargs.
    vm_argv.retain(|arg| !ee_vm_args.contains(arg));
    vm_argv.extend(ee_vm_args.iter().cloned());
    if !vm.is_modular {
        vm_argv = strip_module_flags(&vm_argv);
    }
    if embedded {
        vm_argv.push(format!("{CLASSPATH_PROPERTY}{jar}"));
    } else {
        vm_argv.push(JAR_FLAG.to_string());
        vm_argv.push(jar.clone());
    }

    let mut prog_argv = vec![
        options::OS.to_string(),
        options.os.clone(),
        options::WS.to_string(),
        options.ws.clone(),
        options::ARCH.to_string(),
        options.arch.clone(),
    ];
    if options.flags.show_splash && !options.flags.no_splash {
        prog_argv.push(options::SHOWSPLASH.to_string());
        if let Some(splash) = &options.splash {
            prog_argv.push(splash.clone());
        }
    }
    prog_argv.push(options::LAUNCHER.to_string());
    prog_argv.push(options.program_path.to_string_lossy().to_string());
    prog_argv.push(options::NAME.to_string());
    prog_argv.push(options.official_name.clone());
    if let Some(library) = inputs.library {
        prog_argv.push(options::LIBRARY.to_string());
        prog_argv.push(library.to_string_lossy().to_string());
    }
    prog_argv.push(options::STARTUP.to_string());
    prog_argv.push(jar);
    prog_argv.push(if options.flags.append_vm_args {
        options::APPEND_VMARGS.to_string()
    } else {
        options::OVERRIDE_VMARGS.to_string()
    });
    if !embedded {
        if let Some(id) = inputs.exit_data_id {
            prog_argv.push(options::EXITDATA.to_string());
            prog_argv.push(id.to_string());
        }
    }
    if !options.open_files.is_empty() {
        prog_argv.push(options::OPEN_FILE.to_string());
        prog_argv.extend(options.open_files.iter().cloned());
    }
    if let Some(queue) = inputs.open_file_queue {
        prog_argv.push(options::OPEN_FILE_QUEUE.to_string());
        prog_argv.push(queue.to_string_lossy().to_string());
    }
    prog_argv.extend(options.prog_args.iter().cloned());
    prog_argv.push(options::VM.to_string());
    prog_argv.push(vm.path.to_string_lossy().to_string());
    prog_argv.push(options::VMARGS.to_string());
    prog_argv.extend(vm_argv.iter().cloned());

    VmCommand {
        executable: (!embedded).then(|| vm.path.clone()),
        vm_argv,
        prog_argv,
    }
}

/// Removes user classpath arguments that name the startup jar. `-jar` and
/// `-Djava.class.path=` always go, since the injected one takes their place.
fn drop_classpath_args(raw_args: &[String], jar: &str) -> Vec<String> {
    let mut kept = Vec::with_capacity(raw_args.len());
    let mut i = 0;
    while i < raw_args.len() {
        let arg = &raw_args[i];
        match arg.as_str() {
            JAR_FLAG => {
                i += 2;
                continue;
            }
            "-cp" | "-classpath" | "--class-path" => {
                let value = raw_args.get(i + 1);
                if value.is_some_and(|value| value == jar) {
                    i += 2;
                    continue;
                }
                kept.push(arg.clone());
                kept.extend(value.cloned());
                i += 2;
                continue;
            }
            _ if arg.starts_with(CLASSPATH_PROPERTY) => {
                i += 1;
                continue;
            }
            _ => {}
        }
        kept.push(arg.clone());
        i += 1;
    }
    kept
}

/// Drops module-system flags in both `--flag value` and `--flag=value` form.
pub fn strip_module_flags(args: &[String]) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if MODULE_FLAGS.contains(&arg.as_str()) {
            i += 2;
            continue;
        }
        let joined = MODULE_FLAGS
            .iter()
            .any(|flag| arg.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')));
        if !joined {
            kept.push(arg.clone());
        }
        i += 1;
    }
    kept
}

/// The argv to restart the launcher with: what the user ran, minus the
/// splash argument and the classpath argument, with `program` as argv[0].
///
/// A token after `-showsplash` is taken as its bitmap unless it starts
/// with `-`.
pub fn relaunch_argv(program: &Path, retained: &[String]) -> Vec<String> {
    let start = match retained
        .iter()
        .position(|arg| arg.starts_with(CLASSPATH_PROPERTY) || arg == JAR_FLAG)
    {
        Some(index) if retained[index] == JAR_FLAG => index + 2,
        Some(index) => index + 1,
        None if retained.first().is_some_and(|arg| arg.starts_with('-')) => 0,
        None => 1,
    };

    let mut argv = vec![program.to_string_lossy().to_string()];
    let mut i = start;
    while i < retained.len() {
        let arg = &retained[i];
        if arg.eq_ignore_ascii_case(options::SHOWSPLASH) {
            let has_bitmap = retained.get(i + 1).is_some_and(|next| !next.starts_with('-'));
            i += if has_bitmap { 2 } else { 1 };
            continue;
        }
        if arg.starts_with(CLASSPATH_PROPERTY) {
            i += 1;
            continue;
        }
        argv.push(arg.clone());
        i += 1;
    }
    argv
}

/// Multi-line rendering for dialogs: every option starts a new line.
pub fn format_command_message(argv: &[String]) -> String {
    let mut message = String::new();
    for arg in argv {
        if !message.is_empty() {
            message.push(if arg.starts_with('-') { '\n' } else { ' ' });
        }
        message.push_str(arg);
    }
    message
}

/// Copy/paste-able single-line form for logs.
pub fn format_command_for_logs(program: &Path, args: &[String]) -> String {
    let program = shell_escape(&program.to_string_lossy());
    let args = args.iter().map(|arg| shell_escape(arg)).collect::<Vec<_>>().join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
