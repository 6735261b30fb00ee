//! Type definitions for the backtracking VM.

/// Entries of the backtrack stack
///
/// `Resume` is a choice point; the other variants undo a state change when
/// backtracking pops past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Continue at `pc` with the input position reset to `pos`
    Resume { pc: usize, pos: usize },
    /// Restore a capture slot to its previous value
    RestoreSlot { slot: usize, value: Option<usize> },
    /// Restore a loop register to its previous value
    RestoreRegister { register: usize, value: usize },
}

/// Configuration for the VM
#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    /// Emit a trace event for every executed instruction
    pub trace: bool,
}

impl VmConfig {
    pub fn with_trace() -> Self {
        Self { trace: true }
    }
}
