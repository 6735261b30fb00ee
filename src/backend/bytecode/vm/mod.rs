//! Backtracking VM for bytecode programs
//!
//! The VM is the authoritative matcher: every pattern that parses runs here,
//! and its answer is final. Backtracking uses an explicit stack of
//! [`Frame`]s; the only Rust recursion is one level per nested lookahead.
//!
//! A malformed program (unknown opcode, truncated immediate, slot or class
//! index out of range) is a compiler bug and panics.

mod types;

#[cfg(test)]
mod tests;

use tracing::trace;

use super::opcodes::Opcode;
use super::program::Program;
use crate::backend::scan_positions;
use crate::syntax::{canonicalize, is_line_terminator, is_word_char};

pub use types::{Frame, VmConfig};

/// Outcome of executing a single instruction
enum Step {
    Continue,
    Fail,
    Done(usize),
}

/// Backtracking virtual machine
pub struct BacktrackVM<'p> {
    program: &'p Program,
    config: VmConfig,
    stack: Vec<Frame>,
    registers: Vec<usize>,
}

impl<'p> BacktrackVM<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: &'p Program, config: VmConfig) -> Self {
        Self {
            program,
            config,
            stack: Vec::with_capacity(64),
            registers: vec![0; program.register_count() as usize],
        }
    }

    /// Find the leftmost match at or after `start`.
    ///
    /// `slots` must hold `program.slot_count()` entries; on success it holds
    /// the capture offsets, on failure every entry is `None`.
    pub fn exec(&mut self, input: &[char], start: usize, slots: &mut [Option<usize>]) -> bool {
        assert_eq!(
            slots.len(),
            self.program.slot_count(),
            "capture buffer does not fit program '{}'",
            self.program.name()
        );
        for position in scan_positions(input.len(), start, self.program.sticky()) {
            if self.exec_at(input, position, slots) {
                return true;
            }
        }
        slots.fill(None);
        false
    }

    /// Try a match anchored at exactly `position`.
    pub fn exec_at(&mut self, input: &[char], position: usize, slots: &mut [Option<usize>]) -> bool {
        slots.fill(None);
        self.registers.fill(0);
        self.stack.clear();
        self.run(input, 0, position, slots, 0).is_some()
    }

    /// Run from `pc` until `Match` / `LookEnd`, or until backtracking
    /// exhausts every frame above `base`.
    fn run(
        &mut self,
        input: &[char],
        mut pc: usize,
        mut pos: usize,
        slots: &mut [Option<usize>],
        base: usize,
    ) -> Option<usize> {
        loop {
            match self.step(input, &mut pc, &mut pos, slots) {
                Step::Continue => {}
                Step::Done(end) => return Some(end),
                Step::Fail => {
                    if !self.backtrack(&mut pc, &mut pos, slots, base) {
                        return None;
                    }
                }
            }
        }
    }

    /// Pop frames down to the next choice point above `base`.
    fn backtrack(
        &mut self,
        pc: &mut usize,
        pos: &mut usize,
        slots: &mut [Option<usize>],
        base: usize,
    ) -> bool {
        while self.stack.len() > base {
            match self.stack.pop() {
                Some(Frame::Resume { pc: resume, pos: at }) => {
                    *pc = resume;
                    *pos = at;
                    return true;
                }
                Some(Frame::RestoreSlot { slot, value }) => slots[slot] = value,
                Some(Frame::RestoreRegister { register, value }) => {
                    self.registers[register] = value
                }
                None => break,
            }
        }
        false
    }

    fn operand(&self, offset: usize) -> usize {
        match self.program.read_u32(offset) {
            Some(value) => value as usize,
            None => malformed(self.program, offset, "truncated immediate"),
        }
    }

    fn step(
        &mut self,
        input: &[char],
        pc: &mut usize,
        pos: &mut usize,
        slots: &mut [Option<usize>],
    ) -> Step {
        let at = *pc;
        let Some(opcode) = self.program.read_opcode(at) else {
            malformed(self.program, at, "invalid opcode")
        };

        if self.config.trace {
            let (disasm, _) = self.program.disassemble_instruction(at);
            trace!(target: "rexvm::vm::step", pc = at, pos = *pos, mnemonic = %disasm, stack_depth = self.stack.len());
        }

        *pc = at + 1 + opcode.immediate_size();
        let current = input.get(*pos).copied();

        match opcode {
            Opcode::Char => {
                let expected = self.operand(at + 1) as u32;
                match current {
                    Some(c) if c as u32 == expected => *pos += 1,
                    _ => return Step::Fail,
                }
            }
            Opcode::CharFold => {
                let expected = self.operand(at + 1) as u32;
                match current {
                    Some(c) if canonicalize(c) as u32 == expected => *pos += 1,
                    _ => return Step::Fail,
                }
            }
            Opcode::Any => match current {
                Some(c) if !is_line_terminator(c) => *pos += 1,
                _ => return Step::Fail,
            },
            Opcode::Class => {
                let index = self.operand(at + 1);
                let Some(class) = self.program.class(index as u32) else {
                    malformed(self.program, at, "class index out of range")
                };
                match current {
                    Some(c) if class.matches(c, self.program.ignore_case()) => *pos += 1,
                    _ => return Step::Fail,
                }
            }
            Opcode::Backref => {
                let group = self.operand(at + 1);
                match self.match_backref(input, *pos, group, slots) {
                    Some(len) => *pos += len,
                    None => return Step::Fail,
                }
            }
            Opcode::AssertStart => {
                let ok = *pos == 0
                    || (self.program.multiline() && is_line_terminator(input[*pos - 1]));
                if !ok {
                    return Step::Fail;
                }
            }
            Opcode::AssertEnd => {
                let ok = *pos == input.len()
                    || (self.program.multiline() && current.is_some_and(is_line_terminator));
                if !ok {
                    return Step::Fail;
                }
            }
            Opcode::WordBoundary | Opcode::NotWordBoundary => {
                let boundary = at_word_boundary(input, *pos);
                if boundary != (opcode == Opcode::WordBoundary) {
                    return Step::Fail;
                }
            }
            Opcode::LookAhead | Opcode::NegLookAhead => {
                let end = self.operand(at + 1);
                let matched = self.run_lookahead(input, *pc, *pos, slots, opcode == Opcode::NegLookAhead);
                if !matched {
                    return Step::Fail;
                }
                *pc = end;
            }
            Opcode::LookEnd | Opcode::Match => return Step::Done(*pos),
            Opcode::Jump => *pc = self.operand(at + 1),
            Opcode::Split => {
                let primary = self.operand(at + 1);
                let alternative = self.operand(at + 5);
                self.stack.push(Frame::Resume {
                    pc: alternative,
                    pos: *pos,
                });
                *pc = primary;
            }
            Opcode::Save => {
                let slot = self.operand(at + 1);
                if slot >= slots.len() {
                    malformed(self.program, at, "capture slot out of range");
                }
                self.stack.push(Frame::RestoreSlot {
                    slot,
                    value: slots[slot],
                });
                slots[slot] = Some(*pos);
            }
            Opcode::ResetCaptures => {
                let from = self.operand(at + 1);
                let to = self.operand(at + 5);
                if to > slots.len() || from > to {
                    malformed(self.program, at, "capture range out of bounds");
                }
                for slot in from..to {
                    if let Some(value) = slots[slot].take() {
                        self.stack.push(Frame::RestoreSlot {
                            slot,
                            value: Some(value),
                        });
                    }
                }
            }
            Opcode::Mark => {
                let register = self.register_index(at);
                self.stack.push(Frame::RestoreRegister {
                    register,
                    value: self.registers[register],
                });
                self.registers[register] = *pos;
            }
            Opcode::CheckProgress => {
                let register = self.register_index(at);
                if self.registers[register] == *pos {
                    return Step::Fail;
                }
            }
        }
        Step::Continue
    }

    fn register_index(&self, at: usize) -> usize {
        let register = self.operand(at + 1);
        if register >= self.registers.len() {
            malformed(self.program, at, "register out of range");
        }
        register
    }

    /// Run a lookahead body starting at `body`. Returns whether the
    /// assertion holds. A successful positive lookahead keeps the captures
    /// it set, with undo entries so outer backtracking still restores them.
    fn run_lookahead(
        &mut self,
        input: &[char],
        body: usize,
        pos: usize,
        slots: &mut [Option<usize>],
        negate: bool,
    ) -> bool {
        let snapshot: Vec<Option<usize>> = slots.to_vec();
        let base = self.stack.len();
        let matched = self.run(input, body, pos, slots, base).is_some();
        self.stack.truncate(base);

        if negate {
            slots.copy_from_slice(&snapshot);
            return !matched;
        }
        if matched {
            for (slot, previous) in snapshot.into_iter().enumerate() {
                if slots[slot] != previous {
                    self.stack.push(Frame::RestoreSlot {
                        slot,
                        value: previous,
                    });
                }
            }
        }
        matched
    }

    /// Length consumed by a backreference at `pos`, or `None` on mismatch.
    /// A group that did not participate matches the empty string.
    fn match_backref(
        &self,
        input: &[char],
        pos: usize,
        group: usize,
        slots: &[Option<usize>],
    ) -> Option<usize> {
        let (start, end) = match (slots.get(group * 2), slots.get(group * 2 + 1)) {
            (Some(Some(start)), Some(Some(end))) => (*start, *end),
            (Some(_), Some(_)) => return Some(0),
            _ => malformed(self.program, pos, "backreference group out of range"),
        };
        let len = end.saturating_sub(start);
        let captured = input.get(start..end)?;
        let candidate = input.get(pos..pos + len)?;
        let equal = if self.program.ignore_case() {
            captured
                .iter()
                .zip(candidate)
                .all(|(a, b)| canonicalize(*a) == canonicalize(*b))
        } else {
            captured == candidate
        };
        equal.then_some(len)
    }
}

/// `\b` test at `pos`
#[inline]
pub fn at_word_boundary(input: &[char], pos: usize) -> bool {
    let before = pos > 0 && input.get(pos - 1).copied().is_some_and(is_word_char);
    let after = input.get(pos).copied().is_some_and(is_word_char);
    before != after
}

#[cold]
fn malformed(program: &Program, offset: usize, what: &str) -> ! {
    panic!(
        "malformed bytecode program '{}' at {:04x}: {}",
        program.name(),
        offset,
        what
    )
}
