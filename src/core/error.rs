use std::path::PathBuf;
use thiserror::Error;

use crate::core::launch::LaunchFailure;

/// Central error type for the bootstrap.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── VM discovery ────────────────────────────────────
    #[error("No Java virtual machine was found after searching the following locations:\n{}", .probed.join("\n"))]
    VmNotFound { probed: Vec<String> },

    #[error("The {0} executable launcher was unable to locate its companion launcher jar.")]
    StartupJarMissing(String),

    // ── Launch ──────────────────────────────────────────
    #[error("{0}")]
    Launch(LaunchFailure),

    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error("Shared library error: {0}")]
    Library(#[from] libloading::Error),

    // ── Cross-process state ─────────────────────────────
    #[error("Shared segment error: {0}")]
    SharedSegment(String),

    #[error("Timed out after {0}s waiting for the instance gate")]
    MutexTimeout(u64),

    // ── Serialization ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<LaunchFailure> for LauncherError {
    fn from(failure: LaunchFailure) -> Self {
        LauncherError::Launch(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_not_found_lists_every_probe_on_its_own_line() {
        let err = LauncherError::VmNotFound {
            probed: vec!["/opt/app/jre/bin/java".into(), "java in your current PATH".into()],
        };
        let text = err.to_string();
        assert!(text.ends_with("/opt/app/jre/bin/java\njava in your current PATH"));
    }
}
