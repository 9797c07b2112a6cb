//! The embedded-script module registry, per-alias virtual machines, and
//! host-native built-in module groups backing a policy's `use` bindings.

pub mod builtins;
pub mod cancellation;
pub mod error;
pub mod registry;
pub mod vm;

pub use cancellation::CancellationToken;
pub use error::{ModuleResolveError, RuntimeError};
pub use registry::{ModuleKey, ModuleRef, ModuleSpec, Registry};
pub use vm::{ExportsHandle, Vm};
