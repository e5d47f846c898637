// ─── JNI Bridge ───
// Natives of `org.eclipse.equinox.launcher.JNIBridge`. A VM started as a
// child loads this crate's cdylib through `-library` and reaches them by
// symbol name; an embedded VM gets them registered explicitly.

use std::ffi::c_void;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use jni::objects::{JClass, JObject, JString};
use jni::sys::{jboolean, jstring};
use jni::{JNIEnv, NativeMethod};
use tracing::{debug, warn};

use crate::core::error::LauncherResult;
use crate::core::exit::SharedSegment;
use crate::core::gui::Gui;
use crate::core::instance::drain_queue;

pub const BRIDGE_CLASS: &str = "org/eclipse/equinox/launcher/JNIBridge";

static EXIT_DATA: Mutex<Option<String>> = Mutex::new(None);
static SPLASH_GUI: Mutex<Option<Arc<dyn Gui>>> = Mutex::new(None);

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exit data written in this process, cleared on read.
pub fn take_exit_data() -> Option<String> {
    lock(&EXIT_DATA).take()
}

pub fn store_exit_data(data: String) {
    *lock(&EXIT_DATA) = Some(data);
}

/// Backend used when the program asks to take the splash down.
pub fn install_gui(gui: Arc<dyn Gui>) {
    *lock(&SPLASH_GUI) = Some(gui);
}

/// Writes through the shared segment when an id is given, otherwise into the
/// in-process slot.
pub fn set_exit_data(shared_id: Option<&str>, data: &str) -> LauncherResult<()> {
    match shared_id {
        Some(id) => SharedSegment::attach(id)?.set(Some(data)),
        None => {
            store_exit_data(data.to_string());
            Ok(())
        }
    }
}

pub fn take_down_splash() {
    let gui = lock(&SPLASH_GUI).clone();
    match gui {
        Some(gui) => gui.take_down_splash(),
        None => debug!("No splash to take down"),
    }
}

fn java_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Option<String> {
    if value.is_null() {
        return None;
    }
    env.get_string(value).ok().map(String::from)
}

#[no_mangle]
pub extern "system" fn Java_org_eclipse_equinox_launcher_JNIBridge__1set_1exit_1data<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    shared_id: JString<'local>,
    data: JString<'local>,
) {
    let shared_id = java_string(&mut env, &shared_id);
    let data = java_string(&mut env, &data).unwrap_or_default();
    if let Err(err) = set_exit_data(shared_id.as_deref(), &data) {
        warn!("Could not store exit data: {}", err);
    }
}

#[no_mangle]
pub extern "system" fn Java_org_eclipse_equinox_launcher_JNIBridge__1set_1launcher_1info<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    launcher: JString<'local>,
    name: JString<'local>,
) {
    let launcher = java_string(&mut env, &launcher).unwrap_or_default();
    let name = java_string(&mut env, &name).unwrap_or_default();
    debug!("Program reports launcher {:?} named {:?}", launcher, name);
}

/// Newline-joined files forwarded since the last call, or null.
#[no_mangle]
pub extern "system" fn Java_org_eclipse_equinox_launcher_JNIBridge__1drain_1open_1files<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    queue: JString<'local>,
) -> jstring {
    let Some(queue) = java_string(&mut env, &queue) else {
        return std::ptr::null_mut();
    };
    match drain_queue(Path::new(&queue)) {
        Ok(files) if !files.is_empty() => env
            .new_string(files.join("\n"))
            .map(|files| files.into_raw())
            .unwrap_or(std::ptr::null_mut()),
        Ok(_) => std::ptr::null_mut(),
        Err(err) => {
            warn!("Could not read open-file queue {:?}: {}", queue, err);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_eclipse_equinox_launcher_JNIBridge__1takedown_1splash<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
) {
    take_down_splash();
}

#[no_mangle]
pub extern "system" fn Java_org_eclipse_equinox_launcher_JNIBridge__1update_1splash<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
) -> jboolean {
    let gui = lock(&SPLASH_GUI).clone();
    if let Some(gui) = gui {
        gui.dispatch_messages();
    }
    jni::sys::JNI_TRUE
}

/// Binds the natives on the bridge class of an embedded VM. Returns false
/// when the program does not ship the class.
pub fn register_natives(env: &mut JNIEnv<'_>) -> bool {
    let class: JClass<'_> = match env.find_class(BRIDGE_CLASS) {
        Ok(class) => class,
        Err(_) => {
            let _ = env.exception_clear();
            debug!("{} not found; natives not registered", BRIDGE_CLASS);
            return false;
        }
    };

    let methods = [
        NativeMethod {
            name: "_set_exit_data".into(),
            sig: "(Ljava/lang/String;Ljava/lang/String;)V".into(),
            fn_ptr: Java_org_eclipse_equinox_launcher_JNIBridge__1set_1exit_1data as *mut c_void,
        },
        NativeMethod {
            name: "_set_launcher_info".into(),
            sig: "(Ljava/lang/String;Ljava/lang/String;)V".into(),
            fn_ptr: Java_org_eclipse_equinox_launcher_JNIBridge__1set_1launcher_1info as *mut c_void,
        },
        NativeMethod {
            name: "_drain_open_files".into(),
            sig: "(Ljava/lang/String;)Ljava/lang/String;".into(),
            fn_ptr: Java_org_eclipse_equinox_launcher_JNIBridge__1drain_1open_1files as *mut c_void,
        },
        NativeMethod {
            name: "_takedown_splash".into(),
            sig: "()V".into(),
            fn_ptr: Java_org_eclipse_equinox_launcher_JNIBridge__1takedown_1splash as *mut c_void,
        },
        NativeMethod {
            name: "_update_splash".into(),
            sig: "()Z".into(),
            fn_ptr: Java_org_eclipse_equinox_launcher_JNIBridge__1update_1splash as *mut c_void,
        },
    ];
    match env.register_native_methods(&class, &methods) {
        Ok(()) => true,
        Err(err) => {
            let _ = env.exception_clear();
            warn!("Registering bridge natives failed: {}", err);
            false
        }
    }
}
