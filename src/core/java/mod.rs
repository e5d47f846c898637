pub mod classify;
pub mod ee;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod search;

pub use classify::{classify, VmHint};
pub use resolver::{resolve_vm, Resolution, ResolveOutcome, ResolvedVm, VmKind, VmResolver};
