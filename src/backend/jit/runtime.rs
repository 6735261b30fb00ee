//! Native runtime support functions
//!
//! Helpers called from compiled matchers. They use the C ABI, take the
//! context pointer plus `u64` immediates, and return an `i64` status:
//!
//! - matching helpers return `1` when the test passed (advancing the position
//!   where appropriate) and `0` when it failed;
//! - stack helpers return `1` on success and `0` when the backtrack stack is
//!   full, which the caller turns into a fallback to the bytecode tier;
//! - [`rexvm_rt_backtrack`] returns the resume id of the next choice point,
//!   or `-1` once the stack is exhausted.
//!
//! Character semantics come from [`crate::syntax::class`], shared with the
//! bytecode VM so the two tiers cannot disagree.

use super::context::{NativeContext, NativeFrame, NativeState, NativeTables};
use crate::backend::bytecode::vm::at_word_boundary;
use crate::syntax::{canonicalize, is_line_terminator};

/// `^`
pub const ASSERT_START: u64 = 0;
/// `$`
pub const ASSERT_END: u64 = 1;
/// `\b`
pub const ASSERT_WORD_BOUNDARY: u64 = 2;
/// `\B`
pub const ASSERT_NOT_WORD_BOUNDARY: u64 = 3;

const OK: i64 = 1;
const FAIL: i64 = 0;

/// Borrow the context, its attempt state and its tables.
///
/// # Safety
/// `ctx` must come from [`NativeContext::new`] and outlive the call.
#[inline]
unsafe fn parts<'a>(
    ctx: *mut NativeContext,
) -> Option<(&'a mut NativeContext, &'a mut NativeState, &'a NativeTables)> {
    let ctx = ctx.as_mut()?;
    let state = ctx.state.as_mut()?;
    let tables = ctx.tables.as_ref()?;
    Some((ctx, state, tables))
}

#[inline]
fn advance_if(ctx: &mut NativeContext, ok: bool) -> i64 {
    if ok {
        ctx.pos += 1;
        OK
    } else {
        FAIL
    }
}

// =============================================================================
// Character Matching
// =============================================================================

/// Match one exact character
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_char(ctx: *mut NativeContext, expected: u64) -> i64 {
    let Some((ctx, _, _)) = parts(ctx) else {
        return FAIL;
    };
    let ok = ctx.current().is_some_and(|c| c as u64 == expected);
    advance_if(ctx, ok)
}

/// Match one character after case folding; `expected` is already folded
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_char_fold(ctx: *mut NativeContext, expected: u64) -> i64 {
    let Some((ctx, _, _)) = parts(ctx) else {
        return FAIL;
    };
    let ok = ctx
        .current()
        .is_some_and(|c| canonicalize(c) as u64 == expected);
    advance_if(ctx, ok)
}

/// Match any character except a line terminator
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_any(ctx: *mut NativeContext) -> i64 {
    let Some((ctx, _, _)) = parts(ctx) else {
        return FAIL;
    };
    let ok = ctx.current().is_some_and(|c| !is_line_terminator(c));
    advance_if(ctx, ok)
}

/// Match one character against a pooled class
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_class(ctx: *mut NativeContext, index: u64) -> i64 {
    let Some((ctx, _, tables)) = parts(ctx) else {
        return FAIL;
    };
    let Some(class) = tables.classes.get(index as usize) else {
        return FAIL;
    };
    let ok = ctx
        .current()
        .is_some_and(|c| class.matches(c, tables.ignore_case));
    advance_if(ctx, ok)
}

/// Zero-width assertion, `kind` is one of the `ASSERT_*` constants
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_assert(ctx: *mut NativeContext, kind: u64) -> i64 {
    let Some((ctx, _, tables)) = parts(ctx) else {
        return FAIL;
    };
    let input = ctx.input();
    let pos = ctx.pos;
    let ok = match kind {
        ASSERT_START => {
            pos == 0 || (tables.multiline && is_line_terminator(input[pos - 1]))
        }
        ASSERT_END => {
            pos == input.len()
                || (tables.multiline && input.get(pos).copied().is_some_and(is_line_terminator))
        }
        ASSERT_WORD_BOUNDARY => at_word_boundary(input, pos),
        ASSERT_NOT_WORD_BOUNDARY => !at_word_boundary(input, pos),
        _ => false,
    };
    if ok {
        OK
    } else {
        FAIL
    }
}

// =============================================================================
// Captures and Loop Registers
// =============================================================================

/// Store the current position in a capture slot
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_save(ctx: *mut NativeContext, slot: u64) -> i64 {
    let Some((ctx, state, _)) = parts(ctx) else {
        return FAIL;
    };
    let slot = slot as usize;
    let Some(&value) = state.slots.get(slot) else {
        return FAIL;
    };
    if !state.push(NativeFrame::RestoreSlot { slot, value }) {
        return FAIL;
    }
    state.slots[slot] = Some(ctx.pos);
    OK
}

/// Unset capture slots `[from, to)`
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_reset(ctx: *mut NativeContext, from: u64, to: u64) -> i64 {
    let Some((_, state, _)) = parts(ctx) else {
        return FAIL;
    };
    let to = (to as usize).min(state.slots.len());
    for slot in (from as usize)..to {
        if let Some(value) = state.slots[slot] {
            if !state.push(NativeFrame::RestoreSlot {
                slot,
                value: Some(value),
            }) {
                return FAIL;
            }
            state.slots[slot] = None;
        }
    }
    OK
}

/// Record the current position in a loop register
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_mark(ctx: *mut NativeContext, register: u64) -> i64 {
    let Some((ctx, state, _)) = parts(ctx) else {
        return FAIL;
    };
    let register = register as usize;
    let Some(&value) = state.registers.get(register) else {
        return FAIL;
    };
    if !state.push(NativeFrame::RestoreRegister { register, value }) {
        return FAIL;
    }
    state.registers[register] = ctx.pos;
    OK
}

/// Fail when the loop body consumed nothing since `mark`
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_check_progress(ctx: *mut NativeContext, register: u64) -> i64 {
    let Some((ctx, state, _)) = parts(ctx) else {
        return FAIL;
    };
    match state.registers.get(register as usize) {
        Some(&marked) if marked != ctx.pos => OK,
        _ => FAIL,
    }
}

// =============================================================================
// Backtracking
// =============================================================================

/// Register a choice point that resumes at block `id` with the current position
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_push_resume(ctx: *mut NativeContext, id: u64) -> i64 {
    let Some((ctx, state, _)) = parts(ctx) else {
        return FAIL;
    };
    if state.push(NativeFrame::Resume {
        id: id as u32,
        pos: ctx.pos,
    }) {
        OK
    } else {
        FAIL
    }
}

/// Unwind to the most recent choice point
///
/// Undo frames above it are applied on the way. Returns the resume id and
/// restores the position, or returns `-1` when no choice point is left.
///
/// # Safety
/// The context pointer must be valid.
#[no_mangle]
pub unsafe extern "C" fn rexvm_rt_backtrack(ctx: *mut NativeContext) -> i64 {
    let Some((ctx, state, _)) = parts(ctx) else {
        return -1;
    };
    while let Some(frame) = state.stack.pop() {
        match frame {
            NativeFrame::Resume { id, pos } => {
                ctx.pos = pos;
                return id as i64;
            }
            NativeFrame::RestoreSlot { slot, value } => state.slots[slot] = value,
            NativeFrame::RestoreRegister { register, value } => state.registers[register] = value,
        }
    }
    -1
}

/// Helper symbols and their parameter counts (context pointer included)
pub fn runtime_symbols() -> [(&'static str, *const u8, usize); 11] {
    [
        ("rexvm_rt_char", rexvm_rt_char as *const u8, 2),
        ("rexvm_rt_char_fold", rexvm_rt_char_fold as *const u8, 2),
        ("rexvm_rt_any", rexvm_rt_any as *const u8, 1),
        ("rexvm_rt_class", rexvm_rt_class as *const u8, 2),
        ("rexvm_rt_assert", rexvm_rt_assert as *const u8, 2),
        ("rexvm_rt_save", rexvm_rt_save as *const u8, 2),
        ("rexvm_rt_reset", rexvm_rt_reset as *const u8, 3),
        ("rexvm_rt_mark", rexvm_rt_mark as *const u8, 2),
        ("rexvm_rt_check_progress", rexvm_rt_check_progress as *const u8, 2),
        ("rexvm_rt_push_resume", rexvm_rt_push_resume as *const u8, 2),
        ("rexvm_rt_backtrack", rexvm_rt_backtrack as *const u8, 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_context<R>(input: &str, f: impl FnOnce(*mut NativeContext) -> R) -> R {
        let chars: Vec<char> = input.chars().collect();
        let tables = NativeTables {
            classes: vec![crate::syntax::CharClass::digit()],
            slot_count: 4,
            register_count: 1,
            ignore_case: false,
            multiline: false,
        };
        let mut state = NativeState::new(&tables, 4);
        let mut ctx = NativeContext::new(&chars, &mut state, &tables);
        f(&mut ctx as *mut NativeContext)
    }

    #[test]
    fn test_char_helpers_advance() {
        with_context("a1", |ptr| unsafe {
            assert_eq!(rexvm_rt_char(ptr, 'b' as u64), 0);
            assert_eq!(rexvm_rt_char(ptr, 'a' as u64), 1);
            assert_eq!(rexvm_rt_class(ptr, 0), 1);
            assert_eq!(rexvm_rt_any(ptr), 0);
            assert_eq!((*ptr).pos, 2);
        });
    }

    #[test]
    fn test_backtrack_restores_state() {
        with_context("ab", |ptr| unsafe {
            assert_eq!(rexvm_rt_push_resume(ptr, 7), 1);
            assert_eq!(rexvm_rt_save(ptr, 2), 1);
            assert_eq!(rexvm_rt_char(ptr, 'a' as u64), 1);
            assert_eq!(rexvm_rt_mark(ptr, 0), 1);
            assert_eq!(rexvm_rt_check_progress(ptr, 0), 0);
            assert_eq!(rexvm_rt_backtrack(ptr), 7);
            assert_eq!((*ptr).pos, 0);
            assert_eq!((&(*(*ptr).state).slots)[2], None);
            assert_eq!(rexvm_rt_backtrack(ptr), -1);
        });
    }

    #[test]
    fn test_stack_overflow_reported() {
        with_context("", |ptr| unsafe {
            for id in 0..4 {
                assert_eq!(rexvm_rt_push_resume(ptr, id), 1);
            }
            assert_eq!(rexvm_rt_push_resume(ptr, 9), 0);
            assert_eq!(rexvm_rt_save(ptr, 0), 0);
            assert!((*(*ptr).state).overflowed);
        });
    }

    #[test]
    fn test_null_context_is_failure() {
        unsafe {
            assert_eq!(rexvm_rt_char(std::ptr::null_mut(), 'a' as u64), 0);
            assert_eq!(rexvm_rt_backtrack(std::ptr::null_mut()), -1);
        }
    }
}
