//! Pattern syntax
//!
//! Parses pattern text into a [`ParsedPattern`]: an AST plus the number of
//! capture groups. Both execution tiers compile from the same AST, so group
//! numbering is fixed here and shared by everything downstream.
//!
//! # Modules
//!
//! - [`ast`]: Pattern AST nodes and structural queries
//! - [`class`]: Character classes and character predicates
//! - [`parser`]: Recursive-descent parser
//! - [`error`]: Parse errors

pub mod ast;
pub mod class;
pub mod error;
pub mod parser;

use bitflags::bitflags;

pub use ast::{Assertion, Node, ParsedPattern};
pub use class::{canonicalize, is_line_terminator, is_word_char, CharClass};
pub use error::{ParseError, ParseResult};
pub use parser::{parse, MAX_CAPTURES, MAX_NESTING, MAX_PROGRAM_SIZE, MAX_REPEAT};

bitflags! {
    /// Flags as understood by the parser and both compiler backends.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SyntaxFlags: u16 {
        const IGNORE_CASE = 1 << 0;
        const MULTILINE = 1 << 1;
        const UNICODE = 1 << 2;
        const STICKY = 1 << 3;
        const GLOBAL = 1 << 4;
    }
}
