//! Script execution engine.
//!
//! - [`Supervisor`]: loads a script, detects its capability profile, builds
//!   a fresh [`ExecutionContext`], runs it in a [`Sandbox`] under a deadline,
//!   and accounts for the run.
//! - [`HttpBridge`] / [`HttpTransport`]: profile-aware translation of script
//!   HTTP calls onto one generic transport.
//! - [`RhaiSandbox`]: the default backend.

pub mod bridge;
pub mod capability;
pub mod config;
pub mod context;
pub mod library;
pub mod sandbox;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use bridge::HttpBridge;
pub use config::HostConfig;
pub use context::{ContextBuilder, ExecutionContext};
pub use library::ScriptLibrary;
pub use sandbox::{RhaiSandbox, Sandbox, SandboxError};
pub use supervisor::{RunReport, RunStatus, Supervisor};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
