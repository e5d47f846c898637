// ─── GUI Collaborator ───
// The bootstrap never renders anything itself. Splash screens and dialogs
// belong to a window-system backend behind this trait.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub trait Gui: Send + Sync {
    /// Returns false when the backend cannot show a splash.
    fn show_splash(&self, bitmap: &Path) -> bool;
    fn take_down_splash(&self);
    /// Pumps pending window-system events. Called from the initial thread.
    fn dispatch_messages(&self);
    fn display_message(&self, title: &str, message: &str);
}

/// Backend for headless use: no splash, messages go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessGui;

impl Gui for HeadlessGui {
    fn show_splash(&self, bitmap: &Path) -> bool {
        debug!("No splash support, ignoring {:?}", bitmap);
        false
    }

    fn take_down_splash(&self) {}

    fn dispatch_messages(&self) {}

    fn display_message(&self, title: &str, message: &str) {
        eprint!("{}", stderr_message(title, message));
    }
}

#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageBoxGui;

#[cfg(windows)]
impl Gui for MessageBoxGui {
    fn show_splash(&self, bitmap: &Path) -> bool {
        debug!("No splash support, ignoring {:?}", bitmap);
        false
    }

    fn take_down_splash(&self) {}

    fn dispatch_messages(&self) {}

    fn display_message(&self, title: &str, message: &str) {
        use windows::core::PCWSTR;
        use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

        let to_wide = |s: &str| s.encode_utf16().chain(std::iter::once(0)).collect::<Vec<u16>>();
        let title = to_wide(title);
        let message = to_wide(message);
        unsafe {
            MessageBoxW(
                None,
                PCWSTR(message.as_ptr()),
                PCWSTR(title.as_ptr()),
                MB_OK | MB_ICONERROR,
            );
        }
    }
}

pub fn default_gui() -> Arc<dyn Gui> {
    #[cfg(windows)]
    {
        Arc::new(MessageBoxGui)
    }
    #[cfg(not(windows))]
    {
        Arc::new(HeadlessGui)
    }
}

pub fn stderr_message(title: &str, message: &str) -> String {
    format!("{title}:\n{message}\n")
}

/// Dialog through the backend, or plain stderr with `--launcher.suppressErrors`.
pub fn report_error(gui: &dyn Gui, suppress_errors: bool, title: &str, message: &str) {
    if suppress_errors {
        eprint!("{}", stderr_message(title, message));
    } else {
        gui.display_message(title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        shown: Mutex<Vec<(String, String)>>,
    }

    impl Gui for Recording {
        fn show_splash(&self, _bitmap: &Path) -> bool {
            true
        }

        fn take_down_splash(&self) {}

        fn dispatch_messages(&self) {}

        fn display_message(&self, title: &str, message: &str) {
            self.shown.lock().unwrap().push((title.into(), message.into()));
        }
    }

    #[test]
    fn suppressed_errors_bypass_the_dialog() {
        let gui = Recording::default();
        report_error(&gui, true, "Tool", "bad");
        assert!(gui.shown.lock().unwrap().is_empty());

        report_error(&gui, false, "Tool", "bad");
        assert_eq!(gui.shown.lock().unwrap().as_slice(), &[("Tool".to_string(), "bad".to_string())]);
    }

    #[test]
    fn stderr_format_puts_title_on_its_own_line() {
        assert_eq!(stderr_message("Oops", "Something failed"), "Oops:\nSomething failed\n");
    }
}
