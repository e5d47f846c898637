use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use jvm_bootstrap_lib::core::bridge::set_exit_data;
use jvm_bootstrap_lib::core::config::merge_options;
use jvm_bootstrap_lib::core::config::options::PathProbe;
use jvm_bootstrap_lib::core::context::LauncherContext;
use jvm_bootstrap_lib::core::exit::{ExitDataSource, ProtocolContext, SharedSegment, SEGMENT_SIZE};
use jvm_bootstrap_lib::core::gui::Gui;
use jvm_bootstrap_lib::core::java::{Resolution, ResolvedVm, VmKind};
use jvm_bootstrap_lib::core::launch::{build_command, CommandInputs, LaunchMode, LaunchResult, Launcher, VmCommand};
use jvm_bootstrap_lib::core::restart::{RestartController, RestartOutcome};

/// Plays the part of the Java program: for each run it may write exit data
/// through the id it was given, then exits with the scripted code.
struct ScriptedVm {
    steps: Mutex<VecDeque<(i32, Option<&'static str>)>>,
    seen: Mutex<Vec<VmCommand>>,
}

#[async_trait]
impl Launcher for ScriptedVm {
    fn mode(&self) -> LaunchMode {
        LaunchMode::OutOfProcess
    }

    async fn launch(&self, command: &VmCommand) -> LaunchResult {
        self.seen.lock().unwrap().push(command.clone());
        let (code, data) = self.steps.lock().unwrap().pop_front().unwrap_or((0, None));
        if let Some(data) = data {
            let argv = command.argv();
            let id = argv
                .iter()
                .position(|arg| arg == "-exitdata")
                .and_then(|index| argv.get(index + 1))
                .expect("command carries -exitdata");
            set_exit_data(Some(id), data).unwrap();
        }
        LaunchResult::exited(code)
    }
}

#[derive(Default)]
struct RecordingGui {
    messages: Mutex<Vec<(String, String)>>,
}

impl Gui for RecordingGui {
    fn show_splash(&self, _bitmap: &Path) -> bool {
        false
    }

    fn take_down_splash(&self) {}

    fn dispatch_messages(&self) {}

    fn display_message(&self, title: &str, message: &str) {
        self.messages.lock().unwrap().push((title.into(), message.into()));
    }
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn first_command(segment_id: &str) -> VmCommand {
    let ctx = LauncherContext::new(
        PathBuf::from("/opt/tool/tool"),
        args(&["tool", "-vm", "/x/java", "-vmargs", "-Xmx256m"]),
    );
    let probe = PathProbe::new(Vec::new());
    let options = merge_options(
        &ctx,
        args(&["-consoleLog", "-vmargs", "-Xms40m"]),
        ctx.user_args().to_vec(),
        &probe,
        &probe,
    );
    let resolution = Resolution {
        vm: ResolvedVm {
            kind: VmKind::Executable,
            path: PathBuf::from("/x/java"),
            is_modular: true,
            needs_framework_fixup: false,
        },
        ee_vm_args: Vec::new(),
        ee_library_path: None,
    };
    build_command(&CommandInputs {
        options: &options,
        resolution: &resolution,
        mode: LaunchMode::OutOfProcess,
        startup_jar: Path::new("/opt/tool/plugins/launcher.jar"),
        library: None,
        exit_data_id: Some(segment_id),
        open_file_queue: None,
    })
}

async fn drive(
    steps: Vec<(i32, Option<&'static str>)>,
) -> (RestartOutcome, Vec<VmCommand>, Vec<(String, String)>) {
    let mut segment = SharedSegment::create(SEGMENT_SIZE).unwrap();
    let command = first_command(segment.id());
    let launcher = ScriptedVm {
        steps: Mutex::new(steps.into()),
        seen: Mutex::new(Vec::new()),
    };
    let gui = RecordingGui::default();

    let outcome = {
        let mut controller = RestartController {
            launcher: &launcher,
            exit_data: &mut segment as &mut dyn ExitDataSource,
            gui: &gui,
            protocol: ProtocolContext {
                program: Path::new("/opt/tool/tool"),
                official_name: "Tool",
                mode: LaunchMode::OutOfProcess,
                debug: false,
            },
            suppress_errors: false,
        };
        controller.run(command).await
    };
    segment.destroy().unwrap();

    (
        outcome,
        launcher.seen.into_inner().unwrap(),
        gui.messages.into_inner().unwrap(),
    )
}

#[tokio::test]
async fn command_line_vmargs_win_and_classpath_is_last() {
    let command = first_command("abc");
    assert_eq!(command.vm_argv, args(&["-Xmx256m", "-jar", "/opt/tool/plugins/launcher.jar"]));
    assert!(command.prog_argv.starts_with(&args(&["-os"])));
    assert!(command.prog_argv.contains(&"-consoleLog".to_string()));
}

#[tokio::test]
async fn exit_data_from_one_generation_drives_the_next() {
    let (outcome, seen, messages) = drive(vec![
        (23, None),
        (24, Some("/y/java\n-jar\n/y/launcher.jar\n-exitdata\nSEGMENT\n")),
        (0, None),
    ])
    .await;

    assert_eq!(outcome, RestartOutcome::Exit(0));
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[2].argv()[..3], args(&["/y/java", "-jar", "/y/launcher.jar"]));
    assert!(messages.is_empty());
}

#[tokio::test]
async fn titled_error_reaches_the_dialog() {
    let (outcome, seen, messages) = drive(vec![(99, Some("<title>Oops</title>Something failed"))]).await;

    assert_eq!(outcome, RestartOutcome::Exit(99));
    assert_eq!(seen.len(), 1);
    assert_eq!(messages, vec![("Oops".to_string(), "Something failed".to_string())]);
}

#[tokio::test]
async fn restart_new_without_exit_data_stops() {
    let (outcome, seen, messages) = drive(vec![(24, None)]).await;
    assert_eq!(outcome, RestartOutcome::Exit(24));
    assert_eq!(seen.len(), 1);
    assert!(messages.is_empty());
}
