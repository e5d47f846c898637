pub mod protocol;
pub mod segment;

pub use protocol::{decide, Decision, ExitState, Failure, ProtocolContext};
pub use segment::{SharedSegment, SEGMENT_SIZE};

use crate::core::error::LauncherResult;

/// Where a finished VM generation left its exit data.
pub trait ExitDataSource: Send {
    /// Id to pass as `-exitdata`, if children should write through it.
    fn id(&self) -> Option<&str>;
    fn read(&mut self) -> LauncherResult<Option<String>>;
    /// Clears state before the next generation runs.
    fn reset(&mut self) -> LauncherResult<()>;
}

impl ExitDataSource for SharedSegment {
    fn id(&self) -> Option<&str> {
        Some(SharedSegment::id(self))
    }

    fn read(&mut self) -> LauncherResult<Option<String>> {
        self.get()
    }

    fn reset(&mut self) -> LauncherResult<()> {
        SharedSegment::reset(self)
    }
}

/// Exit data written in-process through the JNI bridge.
#[derive(Debug, Default)]
pub struct BridgeExitData;

impl ExitDataSource for BridgeExitData {
    fn id(&self) -> Option<&str> {
        None
    }

    fn read(&mut self) -> LauncherResult<Option<String>> {
        Ok(crate::core::bridge::take_exit_data())
    }

    fn reset(&mut self) -> LauncherResult<()> {
        crate::core::bridge::take_exit_data();
        Ok(())
    }
}

/// No cross-process channel; every read is empty.
#[derive(Debug, Default)]
pub struct NoExitData;

impl ExitDataSource for NoExitData {
    fn id(&self) -> Option<&str> {
        None
    }

    fn read(&mut self) -> LauncherResult<Option<String>> {
        Ok(None)
    }

    fn reset(&mut self) -> LauncherResult<()> {
        Ok(())
    }
}
