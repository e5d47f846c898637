pub mod command;
pub mod embedded;
pub mod exec;
pub mod result;
pub mod startup;

use async_trait::async_trait;

use crate::core::java::VmKind;

pub use command::{build_command, CommandInputs, VmCommand};
pub use embedded::InProcess;
pub use exec::OutOfProcess;
pub use result::{LaunchFailure, LaunchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// The VM library is loaded into this process through JNI.
    InProcess,
    /// The VM executable runs as a child process.
    OutOfProcess,
}

impl From<VmKind> for LaunchMode {
    fn from(kind: VmKind) -> Self {
        match kind {
            VmKind::Library => LaunchMode::InProcess,
            VmKind::Executable => LaunchMode::OutOfProcess,
        }
    }
}

/// Runs one VM generation to completion. Failures are reported in the
/// result, never as an error, so the exit protocol sees every outcome.
#[async_trait]
pub trait Launcher: Send + Sync {
    fn mode(&self) -> LaunchMode;

    async fn launch(&self, command: &VmCommand) -> LaunchResult;

    /// Called once before the launcher process exits normally.
    async fn shutdown(&self, _exit_code: i32) {}
}
