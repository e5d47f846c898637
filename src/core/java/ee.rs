// ─── Execution Environment Files ───
// A `.ee` file describes a non-default JVM as `-Dee.*=` lines. Every line,
// recognized or not, is also passed to the VM as an extra argument.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::config::ini::read_config_file;
use crate::core::config::options::{OptionFlags, PathProbe};
use crate::core::error::LauncherResult;

const EE_HOME_VAR: &str = "${ee.home}";
const EE_HOME_PROPERTY: &str = "-Dee.home=";
const EE_FILENAME_PROPERTY: &str = "-Dee.filename=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EeSlot {
    Executable,
    Console,
    VmLibrary,
    LibraryPath,
}

struct EeOption {
    prefix: &'static str,
    slot: EeSlot,
    flags: OptionFlags,
}

const EE_OPTIONS: &[EeOption] = &[
    EeOption {
        prefix: "-Dee.executable=",
        slot: EeSlot::Executable,
        flags: OptionFlags::ADJUST_PATH,
    },
    EeOption {
        prefix: "-Dee.executable.console=",
        slot: EeSlot::Console,
        flags: OptionFlags::ADJUST_PATH,
    },
    EeOption {
        prefix: "-Dee.vm.library=",
        slot: EeSlot::VmLibrary,
        flags: OptionFlags::ADJUST_PATH,
    },
    EeOption {
        prefix: "-Dee.library.path=",
        slot: EeSlot::LibraryPath,
        flags: OptionFlags::ADJUST_PATH.union(OptionFlags::IS_LIST),
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EeProps {
    pub file: PathBuf,
    pub home: PathBuf,
    pub executable: Option<String>,
    pub console: Option<String>,
    pub vm_library: Option<String>,
    /// Path-separator list the VM library needs on the loader search path.
    pub library_path: Option<String>,
    pub vm_args: Vec<String>,
}

pub fn load_ee(file: &Path, fallback_dirs: &[PathBuf]) -> LauncherResult<EeProps> {
    let lines = read_config_file(file)?;
    Ok(parse_ee(file, lines, fallback_dirs))
}

/// Relative paths are tried against the file's directory, then each of
/// `fallback_dirs` in order.
pub fn parse_ee(file: &Path, lines: Vec<String>, fallback_dirs: &[PathBuf]) -> EeProps {
    let home = file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let home_str = home.to_string_lossy().to_string();
    let mut search = vec![home.clone()];
    search.extend(fallback_dirs.iter().cloned());
    let probe = PathProbe::new(search);

    let mut props = EeProps {
        file: file.to_path_buf(),
        home: home.clone(),
        ..EeProps::default()
    };

    for line in lines {
        let line = line.replace(EE_HOME_VAR, &home_str);

        if let Some(option) = EE_OPTIONS.iter().find(|option| line.starts_with(option.prefix)) {
            let raw = &line[option.prefix.len()..];
            let value = if option.flags.contains(OptionFlags::ADJUST_PATH | OptionFlags::IS_LIST) {
                probe.check_path_list(raw)
            } else if option.flags.contains(OptionFlags::ADJUST_PATH) {
                probe.check_path(raw)
            } else {
                raw.to_string()
            };
            let target = match option.slot {
                EeSlot::Executable => &mut props.executable,
                EeSlot::Console => &mut props.console,
                EeSlot::VmLibrary => &mut props.vm_library,
                EeSlot::LibraryPath => &mut props.library_path,
            };
            *target = Some(value);
        }

        props.vm_args.push(line);
    }

    props.vm_args.push(format!("{EE_HOME_PROPERTY}{home_str}"));
    props
        .vm_args
        .push(format!("{EE_FILENAME_PROPERTY}{}", file.to_string_lossy()));
    debug!("Parsed ee file {:?}: {:?}", file, props);
    props
}
