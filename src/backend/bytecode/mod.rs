//! Bytecode backend
//!
//! Compiles a parsed pattern to a portable instruction stream and runs it on
//! an explicit-stack backtracking VM. This tier accepts every pattern the
//! parser accepts and is the fallback for everything the native tier cannot
//! do.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            ParsedPattern             │
//! └──────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────┐
//! │          Bytecode Compiler           │
//! │     Node → Program (+ class pool)    │
//! └──────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────┐
//! │            BacktrackVM               │
//! │  ┌────────────┐  ┌────────────────┐  │
//! │  │ Backtrack  │  │ Capture slots  │  │
//! │  │ stack      │  │ Loop registers │  │
//! │  └────────────┘  └────────────────┘  │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`opcodes`]: Instruction definitions
//! - [`program`]: Program structure, builder and disassembler
//! - [`compiler`]: AST lowering
//! - [`vm`]: Backtracking interpreter
//!
//! # Example
//!
//! ```
//! use rexvm::backend::bytecode::{compile, BacktrackVM};
//! use rexvm::syntax::{parse, SyntaxFlags};
//!
//! let parsed = parse("b(c+)", SyntaxFlags::empty()).unwrap();
//! let program = compile("example", &parsed).unwrap();
//! let input: Vec<char> = "abccd".chars().collect();
//! let mut slots = vec![None; program.slot_count()];
//!
//! assert!(BacktrackVM::new(&program).exec(&input, 0, &mut slots));
//! assert_eq!(slots, vec![Some(1), Some(4), Some(2), Some(4)]);
//! ```

pub mod compiler;
pub mod opcodes;
pub mod program;
pub mod vm;

pub use compiler::{compile, CompileError, CompileResult, Compiler};
pub use opcodes::Opcode;
pub use program::{JumpLabel, Program, ProgramBuilder, SplitLabel};
pub use vm::{BacktrackVM, Frame, VmConfig};
