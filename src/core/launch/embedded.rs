// ─── In-Process Launch ───
// Loads the VM library, creates a VM through `JNI_CreateJavaVM`, and calls
// `run(String[])` on the startup jar's main class. The VM stays alive until
// `shutdown`, which lets it exit normally and then destroys it.

use std::ffi::{c_char, c_void, CString};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jni::objects::{JObject, JValue};
use jni::sys::{jint, JavaVMInitArgs, JavaVMOption, JNI_OK, JNI_TRUE, JNI_VERSION_1_8};
use jni::{JNIEnv, JavaVM};
use libloading::Library;
use tracing::{debug, error, info, warn};

use crate::core::bridge;
use crate::core::gui::Gui;

use super::startup::main_class_or_default;
use super::{LaunchFailure, LaunchMode, LaunchResult, Launcher, VmCommand};

const CREATE_VM_SYMBOL: &str = "JNI_CreateJavaVM";
const NO_SHUTDOWN_PROPERTY: &str = "osgi.noShutdown";
const RUN_SIGNATURE: &str = "([Ljava/lang/String;)I";
const DISPATCH_INTERVAL: Duration = Duration::from_millis(100);

type CreateJavaVm = unsafe extern "system" fn(*mut *mut jni::sys::JavaVM, *mut *mut c_void, *mut c_void) -> jint;

struct EmbeddedVm {
    vm: JavaVM,
    /// False when the VM came up but the program never started.
    ran_main: bool,
    _libraries: Vec<Library>,
}

/// A created VM outlives a failed `run`; it is still destroyed on shutdown.
type Started = (EmbeddedVm, Result<i32, LaunchFailure>);

#[derive(Debug, Clone)]
struct StartParams {
    library: PathBuf,
    framework_jli: Option<PathBuf>,
    startup_jar: PathBuf,
    vm_argv: Vec<String>,
    prog_argv: Vec<String>,
}

pub struct InProcess {
    library: PathBuf,
    framework_jli: Option<PathBuf>,
    startup_jar: PathBuf,
    gui: Arc<dyn Gui>,
    second_thread: bool,
    vm: Mutex<Option<EmbeddedVm>>,
}

impl InProcess {
    pub fn new(library: PathBuf, startup_jar: PathBuf, gui: Arc<dyn Gui>) -> Self {
        Self {
            library,
            framework_jli: None,
            startup_jar,
            gui,
            second_thread: false,
            vm: Mutex::new(None),
        }
    }

    /// Preloads `libjli` from a framework bundle before the VM library.
    pub fn with_framework_jli(mut self, jli: Option<PathBuf>) -> Self {
        self.framework_jli = jli;
        self
    }

    /// Runs the VM on a worker thread while this thread pumps GUI events.
    pub fn with_second_thread(mut self, second_thread: bool) -> Self {
        self.second_thread = second_thread;
        self
    }

    fn params(&self, command: &VmCommand) -> StartParams {
        StartParams {
            library: self.library.clone(),
            framework_jli: self.framework_jli.clone(),
            startup_jar: self.startup_jar.clone(),
            vm_argv: command.vm_argv.clone(),
            prog_argv: command.prog_argv.clone(),
        }
    }

    /// Runs `job` on a blocking worker and pumps GUI events until it returns.
    async fn run_on_worker<T, F>(&self, job: F) -> Result<T, tokio::task::JoinError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let worker = tokio::task::spawn_blocking(job);
        tokio::pin!(worker);
        let mut ticker = tokio::time::interval(DISPATCH_INTERVAL);
        loop {
            tokio::select! {
                joined = &mut worker => return joined,
                _ = ticker.tick() => self.gui.dispatch_messages(),
            }
        }
    }
}

#[async_trait]
impl Launcher for InProcess {
    fn mode(&self) -> LaunchMode {
        LaunchMode::InProcess
    }

    async fn launch(&self, command: &VmCommand) -> LaunchResult {
        let already_created = self
            .vm
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(true);
        if already_created {
            return LaunchResult::failed(LaunchFailure::Unexpected(
                "a Java VM was already created in this process".into(),
            ));
        }

        info!("Embedding VM from {:?}", self.library);
        let params = self.params(command);
        let started = if self.second_thread {
            self.run_on_worker(move || start_vm(params))
                .await
                .unwrap_or_else(|err| Err(LaunchFailure::Unexpected(format!("VM thread failed: {err}"))))
        } else {
            start_vm(params)
        };

        let run = match started {
            Ok((embedded, run)) => {
                if let Ok(mut slot) = self.vm.lock() {
                    *slot = Some(embedded);
                }
                run
            }
            Err(failure) => Err(failure),
        };
        match run {
            Ok(run_result) => LaunchResult::exited(run_result),
            Err(failure) => {
                error!("{}", failure);
                LaunchResult::failed(failure)
            }
        }
    }

    async fn shutdown(&self, exit_code: i32) {
        let embedded = match self.vm.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(embedded) = embedded else {
            return;
        };

        if embedded.ran_main {
            exit_program(&embedded.vm, exit_code);
        } else {
            debug!("Program never started; destroying the VM");
        }

        let raw = embedded.vm.get_java_vm_pointer();
        unsafe {
            if let Some(destroy) = (**raw).DestroyJavaVM {
                destroy(raw);
            }
        }
    }
}

/// Lets the program run its exit hooks unless it asked not to.
fn exit_program(vm: &JavaVM, exit_code: i32) {
    match vm.attach_current_thread() {
        Ok(mut env) => {
            if should_shutdown(&mut env) {
                debug!("Calling System.exit({})", exit_code);
                let result = env.call_static_method(
                    "java/lang/System",
                    "exit",
                    "(I)V",
                    &[JValue::Int(exit_code)],
                );
                if result.is_err() {
                    let _ = env.exception_clear();
                }
            }
        }
        Err(err) => warn!("Cannot attach to the VM for shutdown: {}", err),
    }
}

fn start_vm(params: StartParams) -> Result<Started, LaunchFailure> {
    if params.vm_argv.is_empty() {
        return Err(LaunchFailure::InvalidVmArgs);
    }
    let library_name = params.library.to_string_lossy().to_string();

    let mut libraries = Vec::new();
    if let Some(jli) = &params.framework_jli {
        match unsafe { Library::new(jli) } {
            Ok(lib) => libraries.push(lib),
            Err(err) => debug!("Could not preload {:?}: {}", jli, err),
        }
    }

    let library = unsafe { Library::new(&params.library) }.map_err(|err| LaunchFailure::LibraryLoad {
        library: library_name.clone(),
        reason: err.to_string(),
    })?;
    let create: CreateJavaVm = unsafe {
        *library
            .get::<CreateJavaVm>(CREATE_VM_SYMBOL.as_bytes())
            .map_err(|_| LaunchFailure::EntryPointMissing {
                library: library_name.clone(),
                symbol: CREATE_VM_SYMBOL.to_string(),
            })?
    };

    let options = params
        .vm_argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| LaunchFailure::InvalidVmArgs)?;
    let mut raw_options: Vec<JavaVMOption> = options
        .iter()
        .map(|option| JavaVMOption {
            optionString: option.as_ptr() as *mut c_char,
            extraInfo: std::ptr::null_mut(),
        })
        .collect();
    let mut init_args = JavaVMInitArgs {
        version: JNI_VERSION_1_8,
        nOptions: raw_options.len() as jint,
        options: raw_options.as_mut_ptr(),
        ignoreUnrecognized: JNI_TRUE,
    };

    let mut jvm: *mut jni::sys::JavaVM = std::ptr::null_mut();
    let mut env_ptr: *mut c_void = std::ptr::null_mut();
    let rc = unsafe { create(&mut jvm, &mut env_ptr, &mut init_args as *mut JavaVMInitArgs as *mut c_void) };
    if rc != JNI_OK || jvm.is_null() || env_ptr.is_null() {
        return Err(LaunchFailure::VmCreation { code: rc });
    }
    libraries.push(library);

    let vm = unsafe { JavaVM::from_raw(jvm) }.map_err(|err| LaunchFailure::Unexpected(err.to_string()))?;
    let mut env = unsafe { JNIEnv::from_raw(env_ptr.cast()) }
        .map_err(|err| LaunchFailure::Unexpected(err.to_string()))?;
    let run = run_main(&mut env, &params);

    Ok((
        EmbeddedVm {
            vm,
            ran_main: run.is_ok(),
            _libraries: libraries,
        },
        run,
    ))
}

fn run_main(env: &mut JNIEnv<'_>, params: &StartParams) -> Result<i32, LaunchFailure> {
    bridge::register_natives(env);

    let class_name = main_class_or_default(&params.startup_jar).replace('.', "/");
    let class = env.find_class(class_name.as_str()).map_err(|_| {
        clear_exception(env);
        LaunchFailure::MainClassNotFound {
            class: params.startup_jar.to_string_lossy().to_string(),
        }
    })?;
    let instance = env.new_object(&class, "()V", &[]).map_err(|err| {
        clear_exception(env);
        LaunchFailure::Unexpected(format!("cannot instantiate {class_name}: {err}"))
    })?;

    let args = string_array(env, &params.prog_argv).map_err(|err| {
        clear_exception(env);
        LaunchFailure::Unexpected(err.to_string())
    })?;

    debug!("Calling {}.run with {} arguments", class_name, params.prog_argv.len());
    let result = env
        .call_method(&instance, "run", RUN_SIGNATURE, &[JValue::Object(&args)])
        .and_then(|value| value.i());
    match result {
        Ok(code) => Ok(code),
        Err(err) => {
            warn!("run() ended with an exception: {}", err);
            clear_exception(env);
            Ok(1)
        }
    }
}

fn string_array<'local>(
    env: &mut JNIEnv<'local>,
    values: &[String],
) -> jni::errors::Result<jni::objects::JObjectArray<'local>> {
    let array = env.new_object_array(values.len() as jint, "java/lang/String", JObject::null())?;
    for (index, value) in values.iter().enumerate() {
        let element = env.new_string(value)?;
        env.set_object_array_element(&array, index as jint, &element)?;
        env.delete_local_ref(element)?;
    }
    Ok(array)
}

fn clear_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// False when the program set `osgi.noShutdown`.
fn should_shutdown(env: &mut JNIEnv<'_>) -> bool {
    let no_shutdown = env.new_string(NO_SHUTDOWN_PROPERTY).and_then(|key| {
        env.call_static_method(
            "java/lang/Boolean",
            "getBoolean",
            "(Ljava/lang/String;)Z",
            &[JValue::Object(&key)],
        )
        .and_then(|value| value.z())
    });
    match no_shutdown {
        Ok(no_shutdown) => !no_shutdown,
        Err(_) => {
            clear_exception(env);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::core::gui::HeadlessGui;

    fn command(vm_argv: &[&str]) -> VmCommand {
        VmCommand {
            executable: None,
            vm_argv: vm_argv.iter().map(|s| s.to_string()).collect(),
            prog_argv: Vec::new(),
        }
    }

    fn launcher(library: &str) -> InProcess {
        InProcess::new(PathBuf::from(library), PathBuf::from("/nonexistent/launcher.jar"), Arc::new(HeadlessGui))
    }

    #[tokio::test]
    async fn empty_vm_args_are_rejected_before_loading() {
        let result = launcher("/nonexistent/libjvm.so").launch(&command(&[])).await;
        assert_eq!(result.launch_result, LaunchFailure::InvalidVmArgs.code());
    }

    #[tokio::test]
    async fn unloadable_library_reports_library_load() {
        let result = launcher("/nonexistent/libjvm.so")
            .launch(&command(&["-Djava.class.path=/x.jar"]))
            .await;
        assert_eq!(result.launch_result, -1);
        assert!(result.error_message.unwrap().contains("/nonexistent/libjvm.so"));
    }

    #[tokio::test]
    async fn second_thread_mode_reports_the_same_failure() {
        let result = launcher("/nonexistent/libjvm.so")
            .with_second_thread(true)
            .launch(&command(&["-Djava.class.path=/x.jar"]))
            .await;
        assert_eq!(result.launch_result, -1);
    }

    #[tokio::test]
    async fn shutdown_without_a_vm_is_a_no_op() {
        launcher("/nonexistent/libjvm.so").shutdown(0).await;
    }

    #[derive(Default)]
    struct CountingGui {
        dispatched: AtomicUsize,
    }

    impl Gui for CountingGui {
        fn show_splash(&self, _bitmap: &std::path::Path) -> bool {
            false
        }

        fn take_down_splash(&self) {}

        fn dispatch_messages(&self) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        }

        fn display_message(&self, _title: &str, _message: &str) {}
    }

    #[tokio::test]
    async fn worker_result_comes_back_while_events_are_pumped() {
        let gui = Arc::new(CountingGui::default());
        let launcher = InProcess::new(PathBuf::from("/nonexistent/libjvm.so"), PathBuf::from("/x.jar"), gui.clone())
            .with_second_thread(true);

        let result = launcher
            .run_on_worker(|| {
                std::thread::sleep(DISPATCH_INTERVAL * 3);
                42
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert!(gui.dispatched.load(Ordering::SeqCst) >= 2);
    }

    /// Needs a real VM under `JAVA_HOME`; skipped otherwise.
    #[tokio::test]
    async fn vm_is_kept_for_shutdown_when_the_main_class_is_missing() {
        let Some(library) = std::env::var_os("JAVA_HOME")
            .map(PathBuf::from)
            .map(|home| home.join("lib").join("server").join(crate::core::platform::VM_LIBRARY))
            .filter(|library| library.is_file())
        else {
            return;
        };
        let launcher = InProcess::new(library, PathBuf::from("/nonexistent/launcher.jar"), Arc::new(HeadlessGui));

        let result = launcher
            .launch(&command(&["-Djava.class.path=/nonexistent/launcher.jar"]))
            .await;
        assert_eq!(
            result.launch_result,
            LaunchFailure::MainClassNotFound { class: String::new() }.code()
        );
        assert!(launcher.vm.lock().unwrap().as_ref().is_some_and(|vm| !vm.ran_main));

        launcher.shutdown(0).await;
        assert!(launcher.vm.lock().unwrap().is_none());
    }
}
