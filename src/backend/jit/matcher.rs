//! Compiled native matcher

use tracing::debug;

use super::context::{NativeContext, NativeState, NativeTables};
use super::error::JitResult;
use super::{BackrefPolicy, FallbackReason, NativeOutcome, NATIVE_MATCH, NATIVE_NO_MATCH};
use crate::backend::scan_positions;
use crate::syntax::ParsedPattern;

#[cfg(feature = "jit")]
use cranelift_jit::JITModule;

/// Signature of generated matchers
pub type NativeFn = unsafe extern "C" fn(*mut NativeContext) -> i64;

/// A pattern compiled to machine code
///
/// Holds the generated function, the tables its helpers read and, with the
/// `jit` feature, the module owning the code memory.
pub struct NativeMatcher {
    #[cfg(feature = "jit")]
    module: Option<JITModule>,
    func: NativeFn,
    tables: Box<NativeTables>,
    capacity: usize,
    sticky: bool,
}

// SAFETY: the generated code and the tables are immutable after
// construction; all per-call state lives in a `NativeState` owned by `exec`.
unsafe impl Send for NativeMatcher {}
unsafe impl Sync for NativeMatcher {}

impl NativeMatcher {
    /// Compile `pattern` to native code
    ///
    /// `capacity` bounds the backtrack stack of each attempt; exceeding it
    /// yields [`NativeOutcome::Fallback`].
    #[cfg(feature = "jit")]
    pub fn compile(
        name: &str,
        pattern: &ParsedPattern,
        policy: BackrefPolicy,
        capacity: usize,
    ) -> JitResult<Self> {
        let compiled = super::compiler::NativeCompiler::new()?.compile(name, pattern, policy)?;
        debug!(
            target: "rexvm::jit",
            name,
            classes = compiled.tables.classes.len(),
            registers = compiled.tables.register_count,
            "Compiled native matcher"
        );
        Ok(Self {
            module: Some(compiled.module),
            func: compiled.func,
            tables: Box::new(compiled.tables),
            capacity,
            sticky: pattern.sticky(),
        })
    }

    #[cfg(not(feature = "jit"))]
    pub fn compile(
        name: &str,
        _pattern: &ParsedPattern,
        _policy: BackrefPolicy,
        _capacity: usize,
    ) -> JitResult<Self> {
        debug!(target: "rexvm::jit", name, "Native compilation disabled at build time");
        Err(super::error::JitError::NotCompilable(
            "JIT feature not enabled".to_string(),
        ))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run a leftmost-first search from `start`
    ///
    /// On [`NativeOutcome::Matched`] `slots` holds the capture offsets. Any
    /// other outcome leaves every slot unset. A fallback reports the start
    /// position it stopped at so the caller can resume there.
    pub fn exec(&self, input: &[char], start: usize, slots: &mut [Option<usize>]) -> NativeOutcome {
        assert_eq!(
            slots.len(),
            self.tables.slot_count,
            "capture buffer does not match the pattern's slot count"
        );
        let mut state = NativeState::new(&self.tables, self.capacity);

        for pos in scan_positions(input.len(), start, self.sticky) {
            state.reset();
            let mut ctx = NativeContext::new(input, &mut state, &self.tables);
            ctx.pos = pos;
            // SAFETY: `ctx` points at live input, state and tables for the
            // duration of the call, and `func` was generated for this layout.
            let code = unsafe { (self.func)(&mut ctx) };
            match code {
                NATIVE_MATCH => {
                    slots.copy_from_slice(&state.slots);
                    return NativeOutcome::Matched;
                }
                NATIVE_NO_MATCH => continue,
                _ => {
                    slots.fill(None);
                    let reason = if state.overflowed {
                        FallbackReason::BacktrackOverflow
                    } else {
                        FallbackReason::DeferredConstruct
                    };
                    return NativeOutcome::Fallback { reason, position: pos };
                }
            }
        }

        slots.fill(None);
        NativeOutcome::NoMatch
    }
}

impl Drop for NativeMatcher {
    fn drop(&mut self) {
        #[cfg(feature = "jit")]
        if let Some(module) = self.module.take() {
            // SAFETY: `func` is never called again once the matcher is dropped
            unsafe { module.free_memory() };
        }
    }
}

impl std::fmt::Debug for NativeMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMatcher")
            .field("slots", &self.tables.slot_count)
            .field("classes", &self.tables.classes.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
