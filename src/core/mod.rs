// ─── JVM Bootstrap Core ───
// Finds a Java VM, builds its command line and runs it, restarting when the
// program asks to through its exit code.
//
// Architecture:
//   core/
//     config/      .ini + command-line merge, declarative option table
//     java/        VM hint classification, search, .ee files, resolution
//     launch/      command construction, JNI and child-process launchers
//     exit/        shared segment for exit data, exit-code protocol
//     restart      launch loop and process replacement
//     instance     open-file forwarding to a running instance
//     bridge       JNI natives for the launcher bridge class
//     gui          splash/dialog collaborator interface
//     bootstrap    one invocation, end to end

pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod exit;
pub mod gui;
pub mod instance;
pub mod java;
pub mod launch;
pub mod platform;
pub mod restart;
