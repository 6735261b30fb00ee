/// rexvm - Regular Expression Engine
///
/// This library compiles ECMAScript-style regular expressions once and runs
/// them on one of two tiers: Cranelift-generated native code when the pattern
/// allows it, and an always-correct bytecode backtracking interpreter
/// otherwise. Both tiers produce identical results; which one ran is visible
/// only through statistics.
///
/// # Architecture
///
/// A handle is built in three steps:
///
/// 1. **Parsing** (`syntax` module)
///    - Pattern text plus [`FlagSet`] into a [`syntax::ParsedPattern`]
///    - Capture groups numbered once, shared by both tiers
///
/// 2. **Native compilation** (`backend::jit`, best effort)
///    - AST lowered straight to Cranelift IR
///    - Lookahead, and backreferences by default, stay on the bytecode tier
///
/// 3. **Bytecode compilation** (`backend::bytecode`, lazy)
///    - Built on first need, at most once per handle
///
/// Handles live in the pattern cache of an [`Engine`], keyed by
/// `(pattern, flags)`.
///
/// # Example
///
/// ```rust
/// use rexvm::{Engine, FlagSet};
///
/// let engine = Engine::new();
/// let date = engine.get_or_create("(\\d{4})-(\\d{2})", FlagSet::GLOBAL);
///
/// let m = date.find("due 2024-05").unwrap();
/// assert_eq!(m.group(1), Some("2024"));
/// assert_eq!(date.replace("2024-05, 2025-01", "$2/$1"), "05/2024, 01/2025");
/// ```
///
/// # Invalid patterns
///
/// [`Engine::get_or_create`] never fails: a pattern that does not parse yields
/// a handle that never matches. Use [`Engine::try_get_or_create`] to get the
/// [`ParseError`] instead.
pub mod backend;
pub mod engine;
pub mod flags;
pub mod substitution;
pub mod syntax;

pub use backend::{BackrefPolicy, HybridConfig, MatchStats, Tier};
pub use engine::{
    CachePolicy, CacheStats, CaptureBuffer, ConfigError, Engine, EngineConfig, FindIter, Match,
    RegexHandle,
};
pub use flags::{FlagError, FlagSet};
pub use substitution::substitute;
pub use syntax::{ParseError, ParseResult};
