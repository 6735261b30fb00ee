// Execution backends for compiled patterns
//
// - `bytecode`: Program compiler and the authoritative backtracking VM
// - `jit`: Cranelift-compiled native matchers (best effort)
// - `hybrid`: Dual-tier executor that prefers native code and falls back to bytecode

pub mod bytecode;
pub mod hybrid;
pub mod jit;

pub use bytecode::{BacktrackVM, Program};
pub use hybrid::{HybridConfig, HybridMatcher, MatchStats, Tier};
pub use jit::{BackrefPolicy, JitError, NativeMatcher, NativeOutcome};

/// Start positions tried for a match beginning at `start` in a subject of
/// `len` characters, in leftmost-first order.
///
/// Sticky patterns only try `start`. A start beyond the end of the subject
/// yields nothing. Both tiers drive their per-position attempts from this
/// iterator so they agree on which match is reported.
#[inline]
pub fn scan_positions(len: usize, start: usize, sticky: bool) -> std::ops::Range<usize> {
    if start > len {
        start..start
    } else if sticky {
        start..start + 1
    } else {
        start..len + 1
    }
}
