pub mod core;

use tracing_subscriber::EnvFilter;

use crate::core::bootstrap;
use crate::core::context::LauncherContext;
use crate::core::gui::default_gui;
use crate::core::restart::{replace_process, RestartOutcome};

/// Logs go to stderr; stdout belongs to the Java program.
pub fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs the launcher and returns the process exit code.
pub fn run() -> i32 {
    let ctx = LauncherContext::from_env();
    let debug = ctx
        .user_args()
        .iter()
        .any(|arg| arg.eq_ignore_ascii_case(crate::core::config::options::DEBUG));
    init_tracing(debug);

    tracing::info!("Launcher starting from {:?}", ctx.program);

    let gui = default_gui();
    // Current-thread runtime: the thread that runs it is the initial thread,
    // where GUI events must be pumped.
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            bootstrap::report_fatal(gui.as_ref(), &ctx, &err.into());
            return 1;
        }
    };

    let outcome = runtime.block_on(bootstrap::run(ctx, gui));
    drop(runtime);

    match outcome {
        RestartOutcome::Exit(code) => code,
        RestartOutcome::Restart(request) => replace_process(&request),
    }
}
