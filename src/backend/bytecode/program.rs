//! Bytecode program representation
//!
//! A [`Program`] holds the instruction stream for one pattern together with
//! its class pool and the sizes of the slot and register files the VM
//! allocates before running it. Programs are immutable once built and can be
//! shared across threads.

use std::collections::HashMap;

use super::compiler::{CompileError, CompileResult};
use super::opcodes::Opcode;
use crate::syntax::{CharClass, SyntaxFlags};

/// Largest encoded program accepted by [`ProgramBuilder::build`]
pub const MAX_CODE_BYTES: usize = 4 * 1024 * 1024;

/// A compiled bytecode program
#[derive(Debug, Clone)]
pub struct Program {
    /// The bytecode instructions
    code: Vec<u8>,

    /// Class pool referenced by `Class` instructions
    classes: Vec<CharClass>,

    /// Name of this program (for debugging)
    name: String,

    /// Number of capture groups, not counting group 0
    capture_count: u32,

    /// Number of loop registers used by `Mark` / `CheckProgress`
    register_count: u32,

    flags: SyntaxFlags,
}

impl Program {
    /// Create a builder for constructing a program
    pub fn builder(name: impl Into<String>) -> ProgramBuilder {
        ProgramBuilder::new(name)
    }

    /// Get the bytecode instructions
    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Get the length of the bytecode
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the program is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Get an opcode at the given offset
    #[inline]
    pub fn read_opcode(&self, offset: usize) -> Option<Opcode> {
        self.code.get(offset).copied().and_then(Opcode::from_byte)
    }

    /// Read a big-endian u32 immediate at the given offset
    #[inline]
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    #[inline]
    pub fn class(&self, index: u32) -> Option<&CharClass> {
        self.classes.get(index as usize)
    }

    pub fn classes(&self) -> &[CharClass] {
        &self.classes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capture_count(&self) -> u32 {
        self.capture_count
    }

    /// Capture slots: two per group including group 0
    pub fn slot_count(&self) -> usize {
        2 * (self.capture_count as usize + 1)
    }

    pub fn register_count(&self) -> u32 {
        self.register_count
    }

    pub fn flags(&self) -> SyntaxFlags {
        self.flags
    }

    #[inline]
    pub fn ignore_case(&self) -> bool {
        self.flags.contains(SyntaxFlags::IGNORE_CASE)
    }

    #[inline]
    pub fn multiline(&self) -> bool {
        self.flags.contains(SyntaxFlags::MULTILINE)
    }

    #[inline]
    pub fn sticky(&self) -> bool {
        self.flags.contains(SyntaxFlags::STICKY)
    }

    /// Disassemble the program to a string
    pub fn disassemble(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("=== {} ===\n", self.name));
        output.push_str(&format!(
            "groups: {}, slots: {}, registers: {}, classes: {}\n",
            self.capture_count,
            self.slot_count(),
            self.register_count,
            self.classes.len()
        ));

        let mut offset = 0;
        while offset < self.code.len() {
            let (disasm, next_offset) = self.disassemble_instruction(offset);
            output.push_str(&format!("{:04x} {}\n", offset, disasm));
            offset = next_offset;
        }

        output
    }

    /// Disassemble a single instruction, returns (string, next_offset)
    pub fn disassemble_instruction(&self, offset: usize) -> (String, usize) {
        let Some(opcode) = self.read_opcode(offset) else {
            return (
                format!("??? (0x{:02x})", self.code.get(offset).unwrap_or(&0)),
                offset + 1,
            );
        };

        let mnemonic = opcode.mnemonic();
        let next_offset = offset + 1 + opcode.immediate_size();
        let first = self.read_u32(offset + 1).unwrap_or(0);
        let second = self.read_u32(offset + 5).unwrap_or(0);

        let operand_str = match opcode {
            Opcode::Char | Opcode::CharFold => match char::from_u32(first) {
                Some(c) => format!(" {:?}", c),
                None => format!(" U+{:04X}", first),
            },
            Opcode::Class => {
                let class_str = self
                    .classes
                    .get(first as usize)
                    .map(describe_class)
                    .unwrap_or_else(|| "???".to_string());
                format!(" #{} {}", first, class_str)
            }
            Opcode::Jump | Opcode::LookAhead | Opcode::NegLookAhead => {
                format!(" -> {:04x}", first)
            }
            Opcode::Split => format!(" -> {:04x}, {:04x}", first, second),
            Opcode::ResetCaptures => format!(" {}..{}", first, second),
            Opcode::Backref | Opcode::Save | Opcode::Mark | Opcode::CheckProgress => {
                format!(" {}", first)
            }
            _ => String::new(),
        };

        (format!("{}{}", mnemonic, operand_str), next_offset)
    }
}

fn describe_class(class: &CharClass) -> String {
    let mut out = String::from("[");
    if class.is_negated() {
        out.push('^');
    }
    for &(start, end) in class.ranges().iter().take(8) {
        if start == end {
            out.push_str(&format!("{:x}", start));
        } else {
            out.push_str(&format!("{:x}-{:x}", start, end));
        }
        out.push(' ');
    }
    if class.ranges().len() > 8 {
        out.push_str("...");
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out.push(']');
    out
}

/// Builder for constructing programs
#[derive(Debug)]
pub struct ProgramBuilder {
    code: Vec<u8>,
    classes: Vec<CharClass>,
    class_index: HashMap<CharClass, u32>,
    name: String,
    capture_count: u32,
    register_count: u32,
    flags: SyntaxFlags,
}

/// Label for a forward jump to be patched later
#[derive(Debug, Clone, Copy)]
pub struct JumpLabel {
    offset: usize,
}

/// Label for a split whose targets are patched later
#[derive(Debug, Clone, Copy)]
pub struct SplitLabel {
    offset: usize,
}

impl ProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            code: Vec::with_capacity(64),
            classes: Vec::new(),
            class_index: HashMap::new(),
            name: name.into(),
            capture_count: 0,
            register_count: 0,
            flags: SyntaxFlags::empty(),
        }
    }

    pub fn set_capture_count(&mut self, count: u32) {
        self.capture_count = count;
    }

    pub fn set_flags(&mut self, flags: SyntaxFlags) {
        self.flags = flags;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current write position
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    fn push_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, at: usize, value: u32) {
        self.code[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Emit an opcode without immediates
    pub fn emit(&mut self, opcode: Opcode) {
        debug_assert_eq!(opcode.immediate_size(), 0);
        self.code.push(opcode.to_byte());
    }

    /// Emit an opcode with one u32 immediate
    pub fn emit_u32(&mut self, opcode: Opcode, operand: u32) {
        debug_assert_eq!(opcode.immediate_size(), 4);
        self.code.push(opcode.to_byte());
        self.push_u32(operand);
    }

    /// Emit an opcode with two u32 immediates
    pub fn emit_u32_pair(&mut self, opcode: Opcode, first: u32, second: u32) {
        debug_assert_eq!(opcode.immediate_size(), 8);
        self.code.push(opcode.to_byte());
        self.push_u32(first);
        self.push_u32(second);
    }

    /// Create a forward jump-like instruction (Jump, LookAhead, NegLookAhead)
    /// whose target is patched later
    pub fn emit_jump(&mut self, opcode: Opcode) -> JumpLabel {
        debug_assert!(opcode.is_jump() && opcode != Opcode::Split);
        let offset = self.code.len();
        self.code.push(opcode.to_byte());
        self.push_u32(u32::MAX);
        JumpLabel { offset: offset + 1 }
    }

    /// Emit a backward jump to a known target
    pub fn emit_jump_to(&mut self, target: usize) {
        self.emit_u32(Opcode::Jump, target as u32);
    }

    /// Emit a split with both targets unpatched
    pub fn emit_split(&mut self) -> SplitLabel {
        let offset = self.code.len();
        self.code.push(Opcode::Split.to_byte());
        self.push_u32(u32::MAX);
        self.push_u32(u32::MAX);
        SplitLabel { offset: offset + 1 }
    }

    /// Patch a jump label to jump to the current position
    pub fn patch_jump(&mut self, label: JumpLabel) {
        let target = self.code.len() as u32;
        self.write_u32(label.offset, target);
    }

    /// Set the target tried first
    pub fn patch_split_primary(&mut self, label: SplitLabel, target: usize) {
        self.write_u32(label.offset, target as u32);
    }

    /// Set the target tried on backtrack
    pub fn patch_split_alternative(&mut self, label: SplitLabel, target: usize) {
        self.write_u32(label.offset + 4, target as u32);
    }

    /// Add a class to the pool, reusing an identical entry
    pub fn add_class(&mut self, class: CharClass) -> CompileResult<u32> {
        if let Some(&index) = self.class_index.get(&class) {
            return Ok(index);
        }
        let index = u32::try_from(self.classes.len()).map_err(|_| CompileError::TooManyClasses)?;
        self.class_index.insert(class.clone(), index);
        self.classes.push(class);
        Ok(index)
    }

    /// Allocate a fresh loop register
    pub fn alloc_register(&mut self) -> CompileResult<u32> {
        let register = self.register_count;
        self.register_count = register
            .checked_add(1)
            .ok_or(CompileError::TooManyRegisters)?;
        Ok(register)
    }

    pub fn build(self) -> CompileResult<Program> {
        if self.code.len() > MAX_CODE_BYTES {
            return Err(CompileError::ProgramTooLarge {
                size: self.code.len(),
            });
        }
        Ok(Program {
            code: self.code,
            classes: self.classes,
            name: self.name,
            capture_count: self.capture_count,
            register_count: self.register_count,
            flags: self.flags,
        })
    }
}
