// ─── Exit Protocol ───
// Maps a finished launch to what happens next. 0 ends the run, 23 restarts
// the same command, 24 restarts with the command left in exit data, and any
// other code is an error.

use std::path::Path;

use tracing::{debug, error, info};

use crate::core::launch::command::{format_command_message, relaunch_argv, VmCommand};
use crate::core::launch::{LaunchMode, LaunchResult};
use crate::core::restart::RestartRequest;

pub const EXIT_OK: i32 = 0;
pub const RESTART_LAST_EXIT: i32 = 23;
pub const RESTART_NEW_EXIT: i32 = 24;

const TITLE_OPEN: &str = "<title>";
const TITLE_CLOSE: &str = "</title>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Normal,
    RestartLast,
    RestartNew,
    Error(i32),
}

impl ExitState {
    pub fn from_code(code: i32) -> Self {
        match code {
            EXIT_OK => ExitState::Normal,
            RESTART_LAST_EXIT => ExitState::RestartLast,
            RESTART_NEW_EXIT => ExitState::RestartNew,
            other => ExitState::Error(other),
        }
    }
}

/// A message to show before exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub title: String,
    pub message: String,
    pub exit_code: i32,
    /// False for diagnostics only worth showing with `-debug`.
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Finish(i32),
    /// Run this command next, in this process.
    Relaunch(VmCommand),
    /// Replace the whole launcher process; an embedded VM cannot be
    /// created twice.
    RestartProcess(RestartRequest),
    Fail(Failure),
}

/// Inputs that stay fixed across generations.
#[derive(Debug, Clone)]
pub struct ProtocolContext<'a> {
    pub program: &'a Path,
    pub official_name: &'a str,
    pub mode: LaunchMode,
    pub debug: bool,
}

/// Splits `<title>T</title>body` into `(T, body)`.
pub fn split_title(data: &str) -> Option<(String, String)> {
    let rest = data.strip_prefix(TITLE_OPEN)?;
    let end = rest.find(TITLE_CLOSE)?;
    let title = rest[..end].to_string();
    let body = rest[end + TITLE_CLOSE.len()..].to_string();
    Some((title, body))
}

pub fn decide(
    ctx: &ProtocolContext<'_>,
    result: &LaunchResult,
    last: &VmCommand,
    exit_data: Option<String>,
) -> Decision {
    if !result.started() {
        error!("Launch failed with code {}", result.launch_result);
        return Decision::Fail(Failure {
            title: ctx.official_name.to_string(),
            message: result
                .error_message
                .clone()
                .unwrap_or_else(|| format!("Launch failed with code {}", result.launch_result)),
            exit_code: 1,
            display: true,
        });
    }

    let code = result.run_result;
    let state = ExitState::from_code(code);
    debug!("Run ended with {} ({:?})", code, state);

    match state {
        ExitState::Normal => Decision::Finish(EXIT_OK),
        ExitState::RestartLast => match ctx.mode {
            LaunchMode::OutOfProcess => {
                info!("Restarting with the previous command");
                Decision::Relaunch(last.clone())
            }
            LaunchMode::InProcess => Decision::RestartProcess(RestartRequest {
                reason: format!("exit code {RESTART_LAST_EXIT}"),
                argv: relaunch_argv(ctx.program, &last.argv()),
                env: Vec::new(),
            }),
        },
        ExitState::RestartNew => match exit_data {
            Some(data) if !data.is_empty() => {
                let next = VmCommand::from_exit_data(&data);
                info!("Restarting with a new command of {} arguments", next.prog_argv.len());
                match ctx.mode {
                    LaunchMode::OutOfProcess => Decision::Relaunch(next),
                    LaunchMode::InProcess => Decision::RestartProcess(RestartRequest {
                        reason: format!("exit code {RESTART_NEW_EXIT}"),
                        argv: relaunch_argv(ctx.program, &next.argv()),
                        env: Vec::new(),
                    }),
                }
            }
            _ => {
                error!("Exit code {} without exit data", RESTART_NEW_EXIT);
                Decision::Fail(Failure {
                    title: ctx.official_name.to_string(),
                    message: "No exit data available.".to_string(),
                    exit_code: code,
                    display: ctx.debug,
                })
            }
        },
        ExitState::Error(code) => {
            let (title, message) = match exit_data.as_deref().and_then(split_title) {
                Some(split) => split,
                None => (
                    ctx.official_name.to_string(),
                    format!(
                        "JVM terminated. Exit code={code}\n{}",
                        format_command_message(&last.argv())
                    ),
                ),
            };
            Decision::Fail(Failure {
                title,
                message,
                exit_code: code,
                display: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn exec_ctx() -> ProtocolContext<'static> {
        ProtocolContext {
            program: Path::new("/opt/tool/tool"),
            official_name: "Tool",
            mode: LaunchMode::OutOfProcess,
            debug: false,
        }
    }

    fn last_command() -> VmCommand {
        VmCommand {
            executable: Some(PathBuf::from("/x/java")),
            vm_argv: args(&["-Xmx256m", "-jar", "/opt/tool/launcher.jar"]),
            prog_argv: args(&["-showsplash", "/opt/tool/splash.bmp", "-data", "/ws"]),
        }
    }

    #[test]
    fn exit_codes_map_to_states() {
        assert_eq!(ExitState::from_code(0), ExitState::Normal);
        assert_eq!(ExitState::from_code(23), ExitState::RestartLast);
        assert_eq!(ExitState::from_code(24), ExitState::RestartNew);
        assert_eq!(ExitState::from_code(-1), ExitState::Error(-1));
    }

    #[test]
    fn restart_last_in_exec_mode_reuses_the_command() {
        let decision = decide(&exec_ctx(), &LaunchResult::exited(23), &last_command(), None);
        assert_eq!(decision, Decision::Relaunch(last_command()));
    }

    #[test]
    fn restart_last_in_process_rebuilds_argv_without_splash_or_classpath() {
        let ctx = ProtocolContext {
            mode: LaunchMode::InProcess,
            ..exec_ctx()
        };
        let mut last = last_command();
        last.executable = None;
        last.vm_argv = args(&["-Xmx256m", "-Djava.class.path=/opt/tool/launcher.jar"]);

        match decide(&ctx, &LaunchResult::exited(23), &last, None) {
            Decision::RestartProcess(restart) => {
                assert_eq!(restart.argv, args(&["/opt/tool/tool", "-data", "/ws"]));
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn restart_new_parses_exit_data_into_the_next_command() {
        let decision = decide(
            &exec_ctx(),
            &LaunchResult::exited(24),
            &last_command(),
            Some("-vm\n/y/java\n-vmargs\n-Xmx1g\n".into()),
        );
        match decision {
            Decision::Relaunch(next) => {
                assert_eq!(next.argv(), args(&["-vm", "/y/java", "-vmargs", "-Xmx1g"]));
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn restart_new_without_exit_data_fails_quietly() {
        let decision = decide(&exec_ctx(), &LaunchResult::exited(24), &last_command(), None);
        match decision {
            Decision::Fail(failure) => {
                assert_eq!(failure.exit_code, 24);
                assert!(!failure.display);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn titled_exit_data_replaces_the_generic_message() {
        let decision = decide(
            &exec_ctx(),
            &LaunchResult::exited(99),
            &last_command(),
            Some("<title>Oops</title>Something failed".into()),
        );
        assert_eq!(
            decision,
            Decision::Fail(Failure {
                title: "Oops".into(),
                message: "Something failed".into(),
                exit_code: 99,
                display: true,
            })
        );
    }

    #[test]
    fn untitled_error_shows_the_attempted_command() {
        let decision = decide(&exec_ctx(), &LaunchResult::exited(13), &last_command(), None);
        match decision {
            Decision::Fail(failure) => {
                assert_eq!(failure.title, "Tool");
                assert!(failure.message.starts_with("JVM terminated. Exit code=13\n/x/java\n-Xmx256m\n-jar"));
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn title_split_requires_both_tags() {
        assert_eq!(split_title("<title>A</title>"), Some(("A".into(), String::new())));
        assert_eq!(split_title("<title>A"), None);
        assert_eq!(split_title("prefix<title>A</title>b"), None);
    }
}
