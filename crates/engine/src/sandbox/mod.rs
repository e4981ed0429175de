//! Script execution backends.
//!
//! A [`Sandbox`] compiles and runs one script against one
//! [`ExecutionContext`]. It runs on a blocking thread and must give up once
//! `deadline` has passed; the supervisor additionally bounds the whole call
//! with its own timer.

mod rhai_sandbox;

use std::time::Instant;

pub use rhai_sandbox::RhaiSandbox;

use crate::context::ExecutionContext;

/// Why a script did not run to completion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SandboxError {
    #[error("compile error: {0}")]
    Compile(String),

    #[error("script error: {0}")]
    Runtime(String),

    #[error("script timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

pub trait Sandbox: Send + Sync {
    /// Run `source` with only `context` in scope.
    fn execute(
        &self,
        source: &str,
        context: ExecutionContext,
        deadline: Instant,
    ) -> Result<(), SandboxError>;
}
