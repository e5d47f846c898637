// ─── Config File ───
// `.ini` and `.ee` files share one format: one argument per line, `#`
// comments and blank lines ignored, trailing whitespace trimmed.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::core::context::LauncherContext;
use crate::core::error::{LauncherError, LauncherResult};

use super::options::{find_option, INI};
use super::options::LAUNCHER_OPTIONS;

#[instrument]
pub fn read_config_file(path: &Path) -> LauncherResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let args = parse_config_lines(&content);
    debug!("Read {} arguments from {:?}", args.len(), path);
    Ok(args)
}

pub fn parse_config_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// The value of `--launcher.ini` on the command line, if any. Only the raw
/// value is returned; the full scan happens later with the whole table.
pub fn ini_override(argv: &[String]) -> Option<String> {
    let ini = find_option(LAUNCHER_OPTIONS, INI)?;
    argv.iter()
        .position(|arg| arg.eq_ignore_ascii_case(ini.name))
        .and_then(|index| argv.get(index + 1))
        .cloned()
}

/// Candidate default config files, in lookup order.
pub fn default_ini_candidates(ctx: &LauncherContext) -> Vec<PathBuf> {
    let stem = ctx.program_stem();
    let mut names = vec![format!("{stem}.ini")];
    // A console twin (`toolc`) shares the GUI launcher's config.
    if let Some(gui_stem) = stem.strip_suffix('c') {
        if !gui_stem.is_empty() {
            names.push(format!("{gui_stem}.ini"));
        }
    }

    let mut candidates: Vec<PathBuf> = names.iter().map(|name| ctx.program_dir.join(name)).collect();
    if cfg!(target_os = "macos") {
        candidates.push(ctx.program_dir.join("..").join("Eclipse").join(format!("{stem}.ini")));
    }
    candidates
}

/// Locates the config file to use: an explicit override must exist, the
/// defaults are optional.
pub fn locate_ini(ctx: &LauncherContext, override_path: Option<&str>) -> Option<PathBuf> {
    if let Some(explicit) = override_path {
        let path = PathBuf::from(explicit);
        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        };
        return Some(path);
    }
    default_ini_candidates(ctx).into_iter().find(|path| path.is_file())
}
