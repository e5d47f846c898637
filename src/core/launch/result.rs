// ─── Launch Result ───
// What a launcher reports after the VM is gone. `launch_result` is non-zero
// only when the bootstrap itself failed; `run_result` is the program's code.

use std::fmt;

/// Launcher-level failure. Each variant has its own stable negative code so
/// the user sees a specific diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchFailure {
    LibraryLoad { library: String, reason: String },
    EntryPointMissing { library: String, symbol: String },
    VmCreation { code: i32 },
    InvalidVmArgs,
    MainClassNotFound { class: String },
    ExecFailed { program: String, reason: String },
    Unexpected(String),
}

impl LaunchFailure {
    pub fn code(&self) -> i32 {
        match self {
            LaunchFailure::LibraryLoad { .. } => -1,
            LaunchFailure::EntryPointMissing { .. } => -2,
            LaunchFailure::VmCreation { .. } => -3,
            LaunchFailure::InvalidVmArgs => -4,
            LaunchFailure::MainClassNotFound { .. } => -5,
            LaunchFailure::ExecFailed { .. } => -6,
            LaunchFailure::Unexpected(_) => -11,
        }
    }
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchFailure::LibraryLoad { library, reason } => {
                write!(f, "Failed to load the JNI shared library \"{library}\".\n{reason}")
            }
            LaunchFailure::EntryPointMissing { library, symbol } => write!(
                f,
                "The JVM shared library \"{library}\"\ndoes not contain the {symbol} symbol."
            ),
            LaunchFailure::VmCreation { code } => {
                write!(f, "Failed to create the Java Virtual Machine (JNI code {code}).")
            }
            LaunchFailure::InvalidVmArgs => write!(f, "Invalid or empty Java Virtual Machine arguments."),
            LaunchFailure::MainClassNotFound { class } => {
                write!(f, "Failed to find a Main Class in \"{class}\".")
            }
            LaunchFailure::ExecFailed { program, reason } => {
                write!(f, "Failed to start \"{program}\": {reason}")
            }
            LaunchFailure::Unexpected(detail) => {
                write!(f, "An error has occurred while launching the Java Virtual Machine: {detail}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
    pub launch_result: i32,
    pub run_result: i32,
    pub error_message: Option<String>,
}

impl LaunchResult {
    pub fn exited(run_result: i32) -> Self {
        Self {
            launch_result: 0,
            run_result,
            error_message: None,
        }
    }

    pub fn failed(failure: LaunchFailure) -> Self {
        Self {
            launch_result: failure.code(),
            run_result: 0,
            error_message: Some(failure.to_string()),
        }
    }

    /// The VM started and ran to completion.
    pub fn started(&self) -> bool {
        self.launch_result == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_codes_are_distinct() {
        let failures = [
            LaunchFailure::LibraryLoad {
                library: "a".into(),
                reason: "b".into(),
            },
            LaunchFailure::EntryPointMissing {
                library: "a".into(),
                symbol: "JNI_CreateJavaVM".into(),
            },
            LaunchFailure::VmCreation { code: -1 },
            LaunchFailure::InvalidVmArgs,
            LaunchFailure::MainClassNotFound { class: "x".into() },
            LaunchFailure::ExecFailed {
                program: "java".into(),
                reason: "denied".into(),
            },
            LaunchFailure::Unexpected("boom".into()),
        ];
        let mut codes: Vec<i32> = failures.iter().map(LaunchFailure::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), failures.len());
        assert!(codes.iter().all(|code| *code < 0));
    }

    #[test]
    fn failed_result_carries_the_specific_message() {
        let result = LaunchResult::failed(LaunchFailure::EntryPointMissing {
            library: "/jdk/libjvm.so".into(),
            symbol: "JNI_CreateJavaVM".into(),
        });
        assert_eq!(result.launch_result, -2);
        assert!(!result.started());
        assert!(result.error_message.unwrap().contains("JNI_CreateJavaVM"));
    }
}
