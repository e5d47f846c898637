// ─── Bootstrap ───
// One launcher invocation: options, instance gate, VM resolution, command,
// launch loop. Resolution-time errors are fatal; errors from a started VM go
// through the exit protocol instead.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::bridge;
use crate::core::config::{load_launch_options, LaunchOptions};
use crate::core::context::LauncherContext;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::exit::{BridgeExitData, ExitDataSource, NoExitData, ProtocolContext, SharedSegment, SEGMENT_SIZE};
use crate::core::gui::{report_error, Gui};
use crate::core::instance::{clear_record, InstanceGate, InstancePaths, OpenFileOutcome};
use crate::core::java::resolver::framework_jli_path;
use crate::core::java::{resolve_vm, Resolution, ResolveOutcome};
use crate::core::launch::startup::{find_companion_library, find_startup_jar};
use crate::core::launch::{build_command, CommandInputs, InProcess, LaunchMode, Launcher, OutOfProcess};
use crate::core::restart::{RestartController, RestartOutcome};

pub async fn run(ctx: LauncherContext, gui: Arc<dyn Gui>) -> RestartOutcome {
    let options = load_launch_options(&ctx);
    bridge::install_gui(gui.clone());

    let registered = match forward_open_files(&options).await {
        Gate::Forwarded => return RestartOutcome::Exit(0),
        Gate::Registered(paths) => Some(paths),
        Gate::Skipped => None,
    };

    let outcome = match prepare_and_launch(&ctx, &options, registered.as_ref(), gui.clone()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            report_error(gui.as_ref(), options.flags.suppress_errors, &options.official_name, &err.to_string());
            RestartOutcome::Exit(1)
        }
    };

    if let Some(paths) = registered {
        clear_record(&paths);
    }
    outcome
}

enum Gate {
    Forwarded,
    Registered(InstancePaths),
    Skipped,
}

async fn forward_open_files(options: &LaunchOptions) -> Gate {
    if options.open_files.is_empty() {
        return Gate::Skipped;
    }
    let paths = InstancePaths::for_launcher(&options.official_name, &options.program_dir);
    let gate = match InstanceGate::acquire(&paths, Duration::from_secs(options.timeout_secs)).await {
        Ok(gate) => gate,
        Err(err) => {
            warn!("{}; starting a new instance", err);
            return Gate::Skipped;
        }
    };
    match gate.forward_or_register(&options.official_name, &options.program_dir, &options.open_files) {
        Ok(OpenFileOutcome::Forwarded { .. }) => Gate::Forwarded,
        Ok(OpenFileOutcome::Primary) => Gate::Registered(paths),
        Err(err) => {
            warn!("Could not hand over open-file requests: {}", err);
            Gate::Skipped
        }
    }
}

async fn prepare_and_launch(
    ctx: &LauncherContext,
    options: &LaunchOptions,
    registered: Option<&InstancePaths>,
    gui: Arc<dyn Gui>,
) -> LauncherResult<RestartOutcome> {
    let resolution = match resolve_vm(ctx, options)? {
        ResolveOutcome::Resolved(resolution) => resolution,
        ResolveOutcome::RestartRequested(request) => return Ok(RestartOutcome::Restart(request)),
    };
    let startup_jar = find_startup_jar(options)?;
    let library = find_companion_library(options);
    let launcher = launcher_for(ctx, options, &resolution, &startup_jar, gui.clone());
    let mode = launcher.mode();
    debug!("Launch mode {:?}, startup jar {:?}, library {:?}", mode, startup_jar, library);

    let mut exit_data = exit_data_source(mode);
    let command = build_command(&CommandInputs {
        options,
        resolution: &resolution,
        mode,
        startup_jar: &startup_jar,
        library: library.as_deref(),
        exit_data_id: exit_data.id(),
        open_file_queue: registered.map(|paths| paths.queue.as_path()),
    });

    let splash_shown = show_splash(options, mode, gui.as_ref());

    let outcome = {
        let mut controller = RestartController {
            launcher: launcher.as_ref(),
            exit_data: exit_data.as_mut(),
            gui: gui.as_ref(),
            protocol: ProtocolContext {
                program: &ctx.program,
                official_name: &options.official_name,
                mode,
                debug: options.flags.debug,
            },
            suppress_errors: options.flags.suppress_errors,
        };
        controller.run(command).await
    };

    if splash_shown {
        gui.take_down_splash();
    }
    // The segment goes before the VM is torn down.
    drop(exit_data);
    finish(launcher.as_ref(), &outcome, registered).await;
    Ok(outcome)
}

/// An embedded VM may end the process inside `shutdown`, so the instance
/// record goes first.
async fn finish(launcher: &dyn Launcher, outcome: &RestartOutcome, registered: Option<&InstancePaths>) {
    if let RestartOutcome::Exit(code) = outcome {
        if let Some(paths) = registered {
            clear_record(paths);
        }
        launcher.shutdown(*code).await;
    }
}

fn exit_data_source(mode: LaunchMode) -> Box<dyn ExitDataSource> {
    match mode {
        LaunchMode::InProcess => Box::new(BridgeExitData),
        LaunchMode::OutOfProcess => match SharedSegment::create(SEGMENT_SIZE) {
            Ok(segment) => Box::new(segment),
            Err(err) => {
                warn!("{}; continuing without exit data", err);
                Box::new(NoExitData)
            }
        },
    }
}

fn launcher_for(
    ctx: &LauncherContext,
    options: &LaunchOptions,
    resolution: &Resolution,
    startup_jar: &Path,
    gui: Arc<dyn Gui>,
) -> Box<dyn Launcher> {
    match LaunchMode::from(resolution.vm.kind) {
        LaunchMode::InProcess => {
            let jli = if resolution.vm.needs_framework_fixup {
                framework_jli_path(&resolution.vm.path)
            } else {
                None
            };
            Box::new(
                InProcess::new(resolution.vm.path.clone(), startup_jar.to_path_buf(), gui)
                    .with_framework_jli(jli)
                    .with_second_thread(options.flags.second_thread),
            )
        }
        LaunchMode::OutOfProcess => Box::new(OutOfProcess::new(ctx.program.clone(), gui)),
    }
}

/// A child VM draws its own splash from `-showsplash`.
fn show_splash(options: &LaunchOptions, mode: LaunchMode, gui: &dyn Gui) -> bool {
    if mode != LaunchMode::InProcess || !options.flags.show_splash || options.flags.no_splash {
        return false;
    }
    match &options.splash {
        Some(bitmap) => {
            let shown = gui.show_splash(Path::new(bitmap));
            info!("Splash {:?} shown: {}", bitmap, shown);
            shown
        }
        None => false,
    }
}

/// Fatal errors that reach `main` before options exist.
pub fn report_fatal(gui: &dyn Gui, ctx: &LauncherContext, err: &LauncherError) {
    report_error(gui, false, &ctx.default_official_name(), &err.to_string());
}
