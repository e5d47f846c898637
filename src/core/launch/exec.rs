// ─── Out-of-Process Launch ───
// Starts the VM executable as a child and waits for it while keeping the
// window system responsive.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::core::gui::Gui;

use super::command::{format_command_for_logs, VmCommand};
use super::{LaunchFailure, LaunchMode, LaunchResult, Launcher};

const DISPATCH_INTERVAL: Duration = Duration::from_millis(100);

pub struct OutOfProcess {
    /// Runs commands that name no executable.
    launcher_program: PathBuf,
    gui: Arc<dyn Gui>,
}

impl OutOfProcess {
    pub fn new(launcher_program: PathBuf, gui: Arc<dyn Gui>) -> Self {
        Self {
            launcher_program,
            gui,
        }
    }
}

#[async_trait]
impl Launcher for OutOfProcess {
    fn mode(&self) -> LaunchMode {
        LaunchMode::OutOfProcess
    }

    #[instrument(skip_all)]
    async fn launch(&self, command: &VmCommand) -> LaunchResult {
        let (program, args) = command.program_and_args(&self.launcher_program);
        info!("Launching VM: {:?}", program);
        debug!("Command (copy/paste): {}", format_command_for_logs(&program, &args));

        let mut child = match tokio::process::Command::new(&program).args(&args).spawn() {
            Ok(child) => child,
            Err(err) => {
                return LaunchResult::failed(LaunchFailure::ExecFailed {
                    program: program.to_string_lossy().to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let mut ticker = tokio::time::interval(DISPATCH_INTERVAL);
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = ticker.tick() => self.gui.dispatch_messages(),
            }
        };

        match status {
            Ok(status) => {
                let code = exit_code(status);
                debug!("VM process exited with {}", code);
                LaunchResult::exited(code)
            }
            Err(err) => LaunchResult::failed(LaunchFailure::Unexpected(err.to_string())),
        }
    }
}

/// Exit status as a shell would report it: signals become 128 + signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
