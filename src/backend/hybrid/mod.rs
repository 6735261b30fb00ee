//! Hybrid Native/Bytecode Matcher
//!
//! Runs a pattern on its Cranelift-compiled matcher when one exists and
//! falls back to the bytecode VM whenever the native code cannot answer.
//!
//! # Execution Strategy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     HybridMatcher.exec()                            │
//! │                                                                     │
//! │  1. Native matcher present?                                         │
//! │     └─ Matched / NoMatch → final answer                             │
//! │     └─ Fallback (deferred backref, stack overflow) → step 2         │
//! │                                                                     │
//! │  2. Bytecode:                                                       │
//! │     └─ Build the program on first use (once per matcher)            │
//! │     └─ Resume BacktrackVM where native stopped; its answer is final │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use rexvm::backend::hybrid::{HybridConfig, HybridMatcher, Tier};
//! use rexvm::syntax::{parse, SyntaxFlags};
//!
//! let parsed = parse("(\\d+)-(\\d+)", SyntaxFlags::empty()).unwrap();
//! let matcher = HybridMatcher::with_config("range", parsed, HybridConfig::bytecode_only());
//! assert_eq!(matcher.tier(), Tier::Bytecode);
//!
//! let input: Vec<char> = "pages 10-12".chars().collect();
//! let mut slots = vec![None; matcher.slot_count()];
//! assert!(matcher.exec(&input, 0, &mut slots));
//! assert_eq!(slots[0..2], [Some(6), Some(11)]);
//! ```

mod config;
mod matcher;

#[cfg(test)]
mod tests;

pub use config::{HybridConfig, MatchStats, Tier};
pub use matcher::HybridMatcher;
