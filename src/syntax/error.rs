//! Parse error types for the pattern parser.

use std::fmt;

/// Pattern syntax errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Pattern ended where more input was required
    UnexpectedEnd { expected: &'static str },
    /// `)` without a matching `(`
    UnmatchedParen { position: usize },
    /// Quantifier with no atom before it
    NothingToRepeat { position: usize },
    /// Quantifier bounds out of order, e.g. `{3,1}`
    InvalidQuantifier { position: usize },
    /// Character class range with start after end, e.g. `[z-a]`
    InvalidRange { start: char, end: char },
    /// Escape sequence not allowed here
    InvalidEscape { position: usize, escape: char },
    /// Unknown group prefix after `(?`
    InvalidGroup { position: usize },
    /// Backreference to a group that does not exist
    BackrefOutOfRange { group: u32, count: u32 },
    /// More capture groups than the engine supports
    TooManyCaptures,
    /// Groups or lookaheads nested deeper than the parser allows
    NestingTooDeep { position: usize },
    /// Pattern would lower to an oversized program
    PatternTooLarge,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd { expected } => {
                write!(f, "Unexpected end of pattern: expected {}", expected)
            }
            Self::UnmatchedParen { position } => {
                write!(f, "Unmatched ')' at position {}", position)
            }
            Self::NothingToRepeat { position } => {
                write!(f, "Nothing to repeat at position {}", position)
            }
            Self::InvalidQuantifier { position } => {
                write!(f, "Numbers out of order in quantifier at position {}", position)
            }
            Self::InvalidRange { start, end } => {
                write!(f, "Range out of order in character class: {:?}-{:?}", start, end)
            }
            Self::InvalidEscape { position, escape } => {
                write!(f, "Invalid escape '\\{}' at position {}", escape, position)
            }
            Self::InvalidGroup { position } => {
                write!(f, "Invalid group at position {}", position)
            }
            Self::BackrefOutOfRange { group, count } => {
                write!(
                    f,
                    "Backreference \\{} refers to a missing group ({} groups)",
                    group, count
                )
            }
            Self::TooManyCaptures => write!(f, "Too many capture groups"),
            Self::NestingTooDeep { position } => {
                write!(f, "Groups nested too deeply at position {}", position)
            }
            Self::PatternTooLarge => write!(f, "Pattern too large"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing
pub type ParseResult<T> = Result<T, ParseError>;
