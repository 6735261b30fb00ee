//! Bytecode compiler for parsed patterns
//!
//! Lowers a [`ParsedPattern`] to a [`Program`]:
//!
//! ```text
//! save 0
//! <body>
//! save 1
//! match
//! ```
//!
//! Alternation becomes a chain of `split`s whose primary arm is tried first.
//! Quantifiers emit `min` required copies followed by either `max - min`
//! optional copies or a loop. Every optional iteration resets the captures
//! defined inside it and is guarded by a `mark` / `check_progress` pair so an
//! iteration that consumes nothing fails instead of looping.

mod error;


use tracing::trace;

use super::opcodes::Opcode;
use super::program::{JumpLabel, Program, ProgramBuilder};
use crate::syntax::{canonicalize, Assertion, Node, ParsedPattern};

pub use error::{CompileError, CompileResult};

/// Bytecode compiler
pub struct Compiler<'p> {
    builder: ProgramBuilder,
    pattern: &'p ParsedPattern,
}

impl<'p> Compiler<'p> {
    pub fn new(name: impl Into<String>, pattern: &'p ParsedPattern) -> Self {
        let mut builder = ProgramBuilder::new(name);
        builder.set_capture_count(pattern.capture_count);
        builder.set_flags(pattern.flags);
        Self { builder, pattern }
    }

    /// Compile the whole pattern
    pub fn compile(mut self) -> CompileResult<Program> {
        let pattern = self.pattern;
        self.builder.emit_u32(Opcode::Save, 0);
        self.compile_node(&pattern.root)?;
        self.builder.emit_u32(Opcode::Save, 1);
        self.builder.emit(Opcode::Match);
        let program = self.builder.build()?;
        trace!(
            target: "rexvm::bytecode::compiler",
            name = program.name(),
            bytes = program.len(),
            classes = program.classes().len(),
            "Compiled program"
        );
        Ok(program)
    }

    fn compile_node(&mut self, node: &Node) -> CompileResult<()> {
        match node {
            Node::Empty => {}
            Node::Literal(c) => {
                if self.pattern.ignore_case() {
                    self.builder
                        .emit_u32(Opcode::CharFold, canonicalize(*c) as u32);
                } else {
                    self.builder.emit_u32(Opcode::Char, *c as u32);
                }
            }
            Node::Any => self.builder.emit(Opcode::Any),
            Node::Class(class) => {
                let index = self.builder.add_class(class.clone())?;
                self.builder.emit_u32(Opcode::Class, index);
            }
            Node::Assert(assertion) => self.builder.emit(match assertion {
                Assertion::Start => Opcode::AssertStart,
                Assertion::End => Opcode::AssertEnd,
                Assertion::WordBoundary => Opcode::WordBoundary,
                Assertion::NotWordBoundary => Opcode::NotWordBoundary,
            }),
            Node::Capture { index, node } => {
                self.builder.emit_u32(Opcode::Save, index * 2);
                self.compile_node(node)?;
                self.builder.emit_u32(Opcode::Save, index * 2 + 1);
            }
            Node::Concat(nodes) => {
                for node in nodes {
                    self.compile_node(node)?;
                }
            }
            Node::Alternate(alternatives) => self.compile_alternation(alternatives)?,
            Node::Repeat {
                node,
                min,
                max,
                greedy,
            } => self.compile_repeat(node, *min, *max, *greedy)?,
            Node::Backref(group) => self.builder.emit_u32(Opcode::Backref, *group),
            Node::Look { negate, node } => {
                let opcode = if *negate {
                    Opcode::NegLookAhead
                } else {
                    Opcode::LookAhead
                };
                let end = self.builder.emit_jump(opcode);
                self.compile_node(node)?;
                self.builder.emit(Opcode::LookEnd);
                self.builder.patch_jump(end);
            }
        }
        Ok(())
    }

    fn compile_alternation(&mut self, alternatives: &[Node]) -> CompileResult<()> {
        let Some((last, rest)) = alternatives.split_last() else {
            return Ok(());
        };
        let mut exits: Vec<JumpLabel> = Vec::with_capacity(rest.len());
        for alternative in rest {
            let split = self.builder.emit_split();
            self.builder
                .patch_split_primary(split, self.builder.current_offset());
            self.compile_node(alternative)?;
            exits.push(self.builder.emit_jump(Opcode::Jump));
            self.builder
                .patch_split_alternative(split, self.builder.current_offset());
        }
        self.compile_node(last)?;
        for exit in exits {
            self.builder.patch_jump(exit);
        }
        Ok(())
    }

    /// Captures defined inside `node`, as a slot range
    fn emit_reset(&mut self, node: &Node) {
        if let Some((lo, hi)) = node.capture_range() {
            self.builder
                .emit_u32_pair(Opcode::ResetCaptures, lo * 2, hi * 2);
        }
    }

    /// One iteration that may be skipped: `mark r; reset; body; check_progress r`
    fn compile_optional_body(&mut self, node: &Node, register: u32) -> CompileResult<()> {
        self.builder.emit_u32(Opcode::Mark, register);
        self.emit_reset(node);
        self.compile_node(node)?;
        self.builder.emit_u32(Opcode::CheckProgress, register);
        Ok(())
    }

    fn compile_repeat(
        &mut self,
        node: &Node,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> CompileResult<()> {
        for _ in 0..min {
            self.emit_reset(node);
            self.compile_node(node)?;
        }

        match max {
            Some(max) if max <= min => {}
            Some(max) => {
                let register = self.builder.alloc_register()?;
                let mut skips = Vec::with_capacity((max - min) as usize);
                for _ in min..max {
                    let split = self.builder.emit_split();
                    let body = self.builder.current_offset();
                    if greedy {
                        self.builder.patch_split_primary(split, body);
                    } else {
                        self.builder.patch_split_alternative(split, body);
                    }
                    skips.push(split);
                    self.compile_optional_body(node, register)?;
                }
                let end = self.builder.current_offset();
                for split in skips {
                    if greedy {
                        self.builder.patch_split_alternative(split, end);
                    } else {
                        self.builder.patch_split_primary(split, end);
                    }
                }
            }
            None => {
                let register = self.builder.alloc_register()?;
                let head = self.builder.current_offset();
                let split = self.builder.emit_split();
                let body = self.builder.current_offset();
                self.compile_optional_body(node, register)?;
                self.builder.emit_jump_to(head);
                let exit = self.builder.current_offset();
                if greedy {
                    self.builder.patch_split_primary(split, body);
                    self.builder.patch_split_alternative(split, exit);
                } else {
                    self.builder.patch_split_primary(split, exit);
                    self.builder.patch_split_alternative(split, body);
                }
            }
        }
        Ok(())
    }
}

/// Compile a parsed pattern to a program
pub fn compile(name: impl Into<String>, pattern: &ParsedPattern) -> CompileResult<Program> {
    Compiler::new(name, pattern).compile()
}
