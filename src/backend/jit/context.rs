//! Native runtime context.
//!
//! [`NativeContext`] is the only argument of a compiled matcher. Generated
//! code never dereferences it; it is handed back to the runtime helpers,
//! which own all reads and writes of matcher state.

use crate::syntax::CharClass;

/// Backtrack stack entries of the native tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFrame {
    /// Resume at the block registered under `id`, with the position reset to `pos`
    Resume { id: u32, pos: usize },
    /// Restore a capture slot
    RestoreSlot { slot: usize, value: Option<usize> },
    /// Restore a loop register
    RestoreRegister { register: usize, value: usize },
}

/// Immutable per-pattern data the helpers consult
#[derive(Debug, Default)]
pub struct NativeTables {
    pub classes: Vec<CharClass>,
    pub slot_count: usize,
    pub register_count: usize,
    pub ignore_case: bool,
    pub multiline: bool,
}

/// Mutable state of one match attempt
#[derive(Debug)]
pub struct NativeState {
    pub slots: Vec<Option<usize>>,
    pub registers: Vec<usize>,
    pub stack: Vec<NativeFrame>,
    /// Maximum backtrack stack depth before the attempt is abandoned
    pub capacity: usize,
    /// Set when a push hit `capacity`
    pub overflowed: bool,
}

impl NativeState {
    pub fn new(tables: &NativeTables, capacity: usize) -> Self {
        Self {
            slots: vec![None; tables.slot_count],
            registers: vec![0; tables.register_count],
            stack: Vec::with_capacity(capacity.min(256)),
            capacity,
            overflowed: false,
        }
    }

    /// Clear everything for a fresh start position
    pub fn reset(&mut self) {
        self.slots.fill(None);
        self.registers.fill(0);
        self.stack.clear();
        self.overflowed = false;
    }

    /// Push a frame, or report overflow
    #[inline]
    pub fn push(&mut self, frame: NativeFrame) -> bool {
        if self.stack.len() >= self.capacity {
            self.overflowed = true;
            return false;
        }
        self.stack.push(frame);
        true
    }
}

/// Runtime context passed to compiled matchers.
///
/// This struct is `#[repr(C)]` so its layout is stable across the boundary
/// with generated code.
#[repr(C)]
pub struct NativeContext {
    /// Subject characters
    pub input: *const char,

    /// Number of subject characters
    pub input_len: usize,

    /// Current position (character index)
    pub pos: usize,

    /// Mutable attempt state
    pub state: *mut NativeState,

    /// Per-pattern tables
    pub tables: *const NativeTables,
}

impl NativeContext {
    pub fn new(input: &[char], state: &mut NativeState, tables: &NativeTables) -> Self {
        Self {
            input: input.as_ptr(),
            input_len: input.len(),
            pos: 0,
            state: state as *mut NativeState,
            tables: tables as *const NativeTables,
        }
    }

    /// # Safety
    /// `input` / `input_len` must describe a live slice.
    #[inline]
    pub unsafe fn input(&self) -> &[char] {
        std::slice::from_raw_parts(self.input, self.input_len)
    }

    #[inline]
    pub fn current(&self) -> Option<char> {
        // SAFETY: the context is only built from a live slice by `new`
        unsafe { self.input() }.get(self.pos).copied()
    }
}
