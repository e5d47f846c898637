// ─── Restart Controller ───
// Drives launch generations until the exit protocol reaches a terminal
// decision. Restarts happen only through exit codes 23 and 24.

use tracing::{debug, error, info, warn};

use crate::core::exit::{decide, Decision, ExitDataSource, Failure, ProtocolContext};
use crate::core::gui::{report_error, Gui};
use crate::core::launch::command::VmCommand;
use crate::core::launch::Launcher;

/// Replace this process with `argv`, with `env` added to the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    pub reason: String,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Exit(i32),
    Restart(RestartRequest),
}

/// Performs a restart. On Unix the process image is replaced and this only
/// returns on failure; elsewhere the new process runs as a child and its
/// exit code is returned.
pub fn replace_process(request: &RestartRequest) -> i32 {
    let Some((program, args)) = request.argv.split_first() else {
        error!("Restart requested with an empty argv");
        return 1;
    };
    info!("Restarting launcher ({})", request.reason);
    let mut command = std::process::Command::new(program);
    command.args(args);
    command.envs(request.env.iter().map(|(key, value)| (key.as_str(), value.as_str())));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = command.exec();
        error!("Failed to restart {:?}: {}", program, err);
        1
    }
    #[cfg(not(unix))]
    {
        match command.status() {
            Ok(status) => status.code().unwrap_or(1),
            Err(err) => {
                error!("Failed to restart {:?}: {}", program, err);
                1
            }
        }
    }
}

pub struct RestartController<'a> {
    pub launcher: &'a dyn Launcher,
    pub exit_data: &'a mut dyn ExitDataSource,
    pub gui: &'a dyn Gui,
    pub protocol: ProtocolContext<'a>,
    pub suppress_errors: bool,
}

impl RestartController<'_> {
    pub async fn run(&mut self, first: VmCommand) -> RestartOutcome {
        let mut command = first;
        let mut generation = 0_u32;

        loop {
            generation += 1;
            debug!("Launch generation {}", generation);
            if let Err(err) = self.exit_data.reset() {
                warn!("{}", err);
            }

            let result = self.launcher.launch(&command).await;
            let exit_data = match self.exit_data.read() {
                Ok(data) => data,
                Err(err) => {
                    warn!("{}; continuing without exit data", err);
                    None
                }
            };

            match decide(&self.protocol, &result, &command, exit_data) {
                Decision::Finish(code) => {
                    info!("Finished after {} generation(s)", generation);
                    return RestartOutcome::Exit(code);
                }
                Decision::Relaunch(next) => {
                    command = next;
                }
                Decision::RestartProcess(request) => return RestartOutcome::Restart(request),
                Decision::Fail(failure) => {
                    self.report(&failure);
                    return RestartOutcome::Exit(failure.exit_code);
                }
            }
        }
    }

    fn report(&self, failure: &Failure) {
        error!("{}: {}", failure.title, failure.message);
        if failure.display {
            report_error(self.gui, self.suppress_errors, &failure.title, &failure.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::error::LauncherResult;
    use crate::core::gui::HeadlessGui;
    use crate::core::launch::{LaunchMode, LaunchResult};

    struct Scripted {
        codes: Mutex<Vec<i32>>,
        seen: Mutex<Vec<VmCommand>>,
    }

    #[async_trait]
    impl Launcher for Scripted {
        fn mode(&self) -> LaunchMode {
            LaunchMode::OutOfProcess
        }

        async fn launch(&self, command: &VmCommand) -> LaunchResult {
            self.seen.lock().unwrap().push(command.clone());
            let mut codes = self.codes.lock().unwrap();
            let code = if codes.is_empty() { 0 } else { codes.remove(0) };
            LaunchResult::exited(code)
        }
    }

    #[derive(Default)]
    struct Memory {
        data: Option<String>,
        resets: usize,
    }

    impl ExitDataSource for Memory {
        fn id(&self) -> Option<&str> {
            None
        }

        fn read(&mut self) -> LauncherResult<Option<String>> {
            Ok(self.data.clone())
        }

        fn reset(&mut self) -> LauncherResult<()> {
            self.resets += 1;
            Ok(())
        }
    }

    fn command() -> VmCommand {
        VmCommand {
            executable: Some(PathBuf::from("/x/java")),
            vm_argv: vec!["-jar".into(), "/l.jar".into()],
            prog_argv: Vec::new(),
        }
    }

    async fn run(codes: Vec<i32>, data: Option<&str>) -> (RestartOutcome, Vec<VmCommand>, usize) {
        let launcher = Scripted {
            codes: Mutex::new(codes),
            seen: Mutex::new(Vec::new()),
        };
        let mut memory = Memory {
            data: data.map(str::to_string),
            resets: 0,
        };
        let gui = HeadlessGui;
        let outcome = {
            let mut controller = RestartController {
                launcher: &launcher,
                exit_data: &mut memory,
                gui: &gui,
                protocol: ProtocolContext {
                    program: Path::new("/opt/tool/tool"),
                    official_name: "Tool",
                    mode: LaunchMode::OutOfProcess,
                    debug: false,
                },
                suppress_errors: true,
            };
            controller.run(command()).await
        };
        let seen = launcher.seen.into_inner().unwrap();
        (outcome, seen, memory.resets)
    }

    #[tokio::test]
    async fn restart_same_relaunches_identical_commands() {
        let (outcome, seen, resets) = run(vec![23, 23, 0], None).await;
        assert_eq!(outcome, RestartOutcome::Exit(0));
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|c| *c == command()));
        assert_eq!(resets, 3);
    }

    #[tokio::test]
    async fn error_code_terminates_after_one_generation() {
        let (outcome, seen, _) = run(vec![99, 23], None).await;
        assert_eq!(outcome, RestartOutcome::Exit(99));
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn restart_new_switches_to_exit_data_command() {
        let (outcome, seen, _) = run(vec![24, 0], Some("/y/java\n-jar\n/y.jar\n")).await;
        assert_eq!(outcome, RestartOutcome::Exit(0));
        assert_eq!(seen[1].argv(), vec!["/y/java", "-jar", "/y.jar"]);
    }
}
