//! Cranelift Native Compilation Module
//!
//! Compiles parsed patterns straight to machine code. The native tier is an
//! optimization only: anything it cannot do is reported either at compile
//! time ([`JitError::NotCompilable`]) or per call ([`NativeOutcome::Fallback`]),
//! and the bytecode tier takes over.
//!
//! ```text
//! ParsedPattern ──► NativeCompiler ──► fn(*mut NativeContext) -> i64
//!                                            │
//!                         ┌──────────────────┼──────────────────┐
//!                         ▼                  ▼                  ▼
//!                   NATIVE_MATCH      NATIVE_NO_MATCH     NATIVE_FALLBACK
//! ```
//!
//! # Modules
//!
//! - [`context`]: `#[repr(C)]` context and per-attempt state
//! - [`runtime`]: `extern "C"` helpers called from generated code
//! - `compiler`: AST-to-Cranelift translation (`jit` feature only)
//! - [`matcher`]: Compiled matcher and its start-position driver
//! - [`error`]: Native backend errors

pub mod context;
pub mod error;
pub mod matcher;
pub mod runtime;

#[cfg(feature = "jit")]
mod compiler;


use serde::{Deserialize, Serialize};

use crate::syntax::ParsedPattern;

pub use context::{NativeContext, NativeFrame, NativeState, NativeTables};
pub use error::{JitError, JitResult};
pub use matcher::NativeMatcher;

/// Whether this build can generate native code at all
pub const JIT_ENABLED: bool = cfg!(feature = "jit");

/// A match was found; capture slots are filled
pub const NATIVE_MATCH: i64 = 1;
/// No match at this start position
pub const NATIVE_NO_MATCH: i64 = 0;
/// The native code cannot finish this attempt
pub const NATIVE_FALLBACK: i64 = -1;

/// Largest lowered pattern size compiled natively
pub const MAX_NATIVE_SIZE: usize = 20_000;

/// Default backtrack stack capacity of one native attempt
pub const DEFAULT_BACKTRACK_CAPACITY: usize = 10_000;

/// How the native tier treats backreferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackrefPolicy {
    /// Do not compile patterns with backreferences
    #[default]
    Skip,
    /// Compile them; reaching a backreference requests a fallback
    Defer,
}

/// Why a native run handed control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Reached a construct compiled as a deferral (a backreference)
    DeferredConstruct,
    /// The backtrack stack reached its capacity
    BacktrackOverflow,
}

/// Result of one native search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOutcome {
    Matched,
    NoMatch,
    /// Every start before `position` was a definite no match
    Fallback { reason: FallbackReason, position: usize },
}

/// Reject patterns the native tier cannot compile
pub fn check_supported(pattern: &ParsedPattern, policy: BackrefPolicy) -> JitResult<()> {
    if pattern.has_lookaround() {
        return Err(JitError::NotCompilable(
            "lookahead is not supported natively".to_string(),
        ));
    }
    if policy == BackrefPolicy::Skip && pattern.has_backreferences() {
        return Err(JitError::NotCompilable(
            "pattern contains backreferences".to_string(),
        ));
    }
    let size = pattern.root.lowered_size();
    if size > MAX_NATIVE_SIZE {
        return Err(JitError::NotCompilable(format!(
            "pattern too large for native code ({} > {})",
            size, MAX_NATIVE_SIZE
        )));
    }
    Ok(())
}
