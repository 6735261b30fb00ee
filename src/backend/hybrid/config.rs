//! Configuration and statistics types for the dual-tier matcher.

use crate::backend::bytecode::VmConfig;
use crate::backend::jit::{BackrefPolicy, DEFAULT_BACKTRACK_CAPACITY, JIT_ENABLED};

/// Configuration for a [`super::HybridMatcher`]
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Bytecode VM configuration
    pub vm_config: VmConfig,
    /// Whether to attempt native compilation
    pub jit_enabled: bool,
    /// Native handling of backreferences
    pub backref_policy: BackrefPolicy,
    /// Backtrack stack capacity of one native attempt
    pub native_backtrack_capacity: usize,
    /// Whether to trace tier decisions per call
    pub trace: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            vm_config: VmConfig::default(),
            jit_enabled: JIT_ENABLED,
            backref_policy: BackrefPolicy::default(),
            native_backtrack_capacity: DEFAULT_BACKTRACK_CAPACITY,
            trace: false,
        }
    }
}

impl HybridConfig {
    /// Create a configuration with tracing enabled
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self.vm_config.trace = true;
        self
    }

    /// Create a configuration that never compiles natively
    pub fn bytecode_only() -> Self {
        Self {
            jit_enabled: false,
            ..Self::default()
        }
    }
}

/// Which tier a matcher runs on first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Cranelift-compiled code, with bytecode fallback
    Native,
    /// Bytecode interpreter only
    Bytecode,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Native => write!(f, "native"),
            Tier::Bytecode => write!(f, "bytecode"),
        }
    }
}

/// Snapshot of a matcher's execution counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Total number of exec() calls
    pub total_runs: u64,
    /// Calls that ran the native matcher
    pub native_runs: u64,
    /// Calls answered by the bytecode VM
    pub bytecode_runs: u64,
    /// Native runs that handed over to bytecode
    pub fallbacks: u64,
    /// Of those, fallbacks caused by backtrack stack overflow
    pub overflow_fallbacks: u64,
    /// Lazy bytecode program builds (0 or 1)
    pub bytecode_builds: u64,
    /// Successful native compilations (0 or 1)
    pub native_compilations: u64,
    /// Failed native compilations (0 or 1)
    pub native_compile_failures: u64,
}

impl MatchStats {
    /// Share of calls answered by native code, as a percentage
    pub fn native_hit_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            (self.native_runs.saturating_sub(self.fallbacks) as f64 / self.total_runs as f64) * 100.0
        }
    }

    /// Fallbacks as a percentage of native runs
    pub fn fallback_rate(&self) -> f64 {
        if self.native_runs == 0 {
            0.0
        } else {
            (self.fallbacks as f64 / self.native_runs as f64) * 100.0
        }
    }
}
