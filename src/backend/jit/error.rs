//! Native backend error types.
//!
//! Neither variant is ever surfaced to callers of the engine: both mean the
//! pattern runs on the bytecode tier instead.

use std::fmt;

/// Error types for native compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JitError {
    /// Pattern uses a construct the native backend does not translate
    NotCompilable(String),

    /// Cranelift compilation error
    CompilationError(String),
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitError::NotCompilable(msg) => write!(f, "Not compilable: {}", msg),
            JitError::CompilationError(msg) => write!(f, "Compilation error: {}", msg),
        }
    }
}

impl std::error::Error for JitError {}

/// Result type for native compilation
pub type JitResult<T> = Result<T, JitError>;
