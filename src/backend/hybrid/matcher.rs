//! Dual-tier matcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tracing::{debug, trace, warn};

use super::config::{HybridConfig, MatchStats, Tier};
use crate::backend::bytecode::{compile, BacktrackVM, CompileResult, Program};
use crate::backend::jit::{FallbackReason, JitError, NativeMatcher, NativeOutcome};
use crate::syntax::ParsedPattern;

#[derive(Debug, Default)]
struct Counters {
    total_runs: AtomicU64,
    native_runs: AtomicU64,
    bytecode_runs: AtomicU64,
    fallbacks: AtomicU64,
    overflow_fallbacks: AtomicU64,
    bytecode_builds: AtomicU64,
    native_compilations: AtomicU64,
    native_compile_failures: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Executes one parsed pattern on the native tier when possible and on the
/// bytecode VM otherwise
///
/// Native compilation happens once in [`HybridMatcher::new`]. The bytecode
/// program is built the first time it is needed and reused afterwards.
#[derive(Debug)]
pub struct HybridMatcher {
    name: String,
    parsed: ParsedPattern,
    native: Option<NativeMatcher>,
    program: OnceLock<CompileResult<Program>>,
    config: HybridConfig,
    counters: Counters,
}

impl HybridMatcher {
    pub fn new(name: impl Into<String>, parsed: ParsedPattern) -> Self {
        Self::with_config(name, parsed, HybridConfig::default())
    }

    pub fn with_config(name: impl Into<String>, parsed: ParsedPattern, config: HybridConfig) -> Self {
        let name = name.into();
        let counters = Counters::default();

        let native = if config.jit_enabled {
            match NativeMatcher::compile(
                &name,
                &parsed,
                config.backref_policy,
                config.native_backtrack_capacity,
            ) {
                Ok(native) => {
                    bump(&counters.native_compilations);
                    Some(native)
                }
                Err(JitError::NotCompilable(reason)) => {
                    debug!(target: "rexvm::hybrid", pattern = %name, %reason, "Skipping native compilation");
                    None
                }
                Err(err) => {
                    bump(&counters.native_compile_failures);
                    warn!(target: "rexvm::hybrid", pattern = %name, error = %err, "Native compilation failed");
                    None
                }
            }
        } else {
            None
        };

        Self {
            name,
            parsed,
            native,
            program: OnceLock::new(),
            config,
            counters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parsed(&self) -> &ParsedPattern {
        &self.parsed
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn capture_count(&self) -> u32 {
        self.parsed.capture_count
    }

    pub fn slot_count(&self) -> usize {
        self.parsed.slot_count()
    }

    /// Tier tried first by [`HybridMatcher::exec`]
    pub fn tier(&self) -> Tier {
        if self.native.is_some() {
            Tier::Native
        } else {
            Tier::Bytecode
        }
    }

    /// Bytecode program, if it has been built already
    pub fn program_if_built(&self) -> Option<&Program> {
        self.program.get().and_then(|result| result.as_ref().ok())
    }

    /// Bytecode program, built on first use
    pub fn program(&self) -> Option<&Program> {
        self.program
            .get_or_init(|| {
                bump(&self.counters.bytecode_builds);
                let result = compile(self.name.clone(), &self.parsed);
                match &result {
                    Ok(program) => debug!(
                        target: "rexvm::hybrid",
                        pattern = %self.name,
                        bytes = program.len(),
                        "Built bytecode program"
                    ),
                    Err(err) => warn!(
                        target: "rexvm::hybrid",
                        pattern = %self.name,
                        error = %err,
                        "Bytecode compilation failed"
                    ),
                }
                result
            })
            .as_ref()
            .ok()
    }

    /// Run a leftmost-first search from `start`
    ///
    /// `slots` must have [`HybridMatcher::slot_count`] entries. On success they
    /// hold the capture offsets; on failure every slot is unset.
    pub fn exec(&self, input: &[char], start: usize, slots: &mut [Option<usize>]) -> bool {
        bump(&self.counters.total_runs);
        let mut resume = start;

        if let Some(native) = &self.native {
            bump(&self.counters.native_runs);
            match native.exec(input, start, slots) {
                NativeOutcome::Matched => {
                    if self.config.trace {
                        trace!(target: "rexvm::hybrid", pattern = %self.name, start, "native: match");
                    }
                    return true;
                }
                NativeOutcome::NoMatch => {
                    if self.config.trace {
                        trace!(target: "rexvm::hybrid", pattern = %self.name, start, "native: no match");
                    }
                    return false;
                }
                NativeOutcome::Fallback { reason, position } => {
                    bump(&self.counters.fallbacks);
                    if reason == FallbackReason::BacktrackOverflow {
                        bump(&self.counters.overflow_fallbacks);
                    }
                    debug!(
                        target: "rexvm::hybrid",
                        pattern = %self.name,
                        ?reason,
                        start,
                        position,
                        "Native matcher fell back to bytecode"
                    );
                    resume = position;
                }
            }
        }

        self.exec_bytecode(input, resume, slots)
    }

    /// Run on the bytecode VM only
    pub fn exec_bytecode(&self, input: &[char], start: usize, slots: &mut [Option<usize>]) -> bool {
        bump(&self.counters.bytecode_runs);
        let Some(program) = self.program() else {
            slots.fill(None);
            return false;
        };
        let matched =
            BacktrackVM::with_config(program, self.config.vm_config.clone()).exec(input, start, slots);
        if self.config.trace {
            trace!(target: "rexvm::hybrid", pattern = %self.name, start, matched, "bytecode");
        }
        matched
    }

    pub fn stats(&self) -> MatchStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MatchStats {
            total_runs: load(&self.counters.total_runs),
            native_runs: load(&self.counters.native_runs),
            bytecode_runs: load(&self.counters.bytecode_runs),
            fallbacks: load(&self.counters.fallbacks),
            overflow_fallbacks: load(&self.counters.overflow_fallbacks),
            bytecode_builds: load(&self.counters.bytecode_builds),
            native_compilations: load(&self.counters.native_compilations),
            native_compile_failures: load(&self.counters.native_compile_failures),
        }
    }
}
