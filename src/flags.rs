//! Regex flag set
//!
//! A [`FlagSet`] is the bit-encoded set of modifiers a pattern is compiled
//! with. It converts to and from the canonical short string form (`"gimuy"`)
//! and maps one-to-one onto the parser's [`SyntaxFlags`].

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::syntax::SyntaxFlags;

bitflags! {
    /// Modifiers a regex handle is built with. Immutable once the handle exists.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlagSet: u8 {
        const GLOBAL = 0b0000_0001;
        const IGNORE_CASE = 0b0000_0010;
        const MULTILINE = 0b0000_0100;
        const UNICODE = 0b0000_1000;
        const STICKY = 0b0001_0000;
    }
}

/// Flag letters in canonical serialization order.
const CANONICAL_ORDER: [(FlagSet, char); 5] = [
    (FlagSet::GLOBAL, 'g'),
    (FlagSet::IGNORE_CASE, 'i'),
    (FlagSet::MULTILINE, 'm'),
    (FlagSet::UNICODE, 'u'),
    (FlagSet::STICKY, 'y'),
];

/// Errors reported by the strict flag parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// Character is not one of `g i m u y`
    Unknown(char),
    /// Flag letter appears more than once
    Duplicate(char),
}

impl fmt::Display for FlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(c) => write!(f, "Unknown regex flag: '{}'", c),
            Self::Duplicate(c) => write!(f, "Duplicate regex flag: '{}'", c),
        }
    }
}

impl std::error::Error for FlagError {}

impl FlagSet {
    fn from_letter(c: char) -> Option<FlagSet> {
        CANONICAL_ORDER
            .iter()
            .find(|(_, letter)| *letter == c)
            .map(|(flag, _)| *flag)
    }

    /// Parse a flag string, accepting any ordering of `g i m u y`.
    ///
    /// Unrecognized characters are ignored; embedding layers that need to
    /// report them use [`FlagSet::parse_strict`] (or `str::parse`).
    pub fn from_flag_str(text: &str) -> FlagSet {
        text.chars()
            .filter_map(FlagSet::from_letter)
            .fold(FlagSet::empty(), |acc, flag| acc | flag)
    }

    /// Parse a flag string, rejecting unknown and duplicate letters.
    pub fn parse_strict(text: &str) -> Result<FlagSet, FlagError> {
        let mut flags = FlagSet::empty();
        for c in text.chars() {
            let flag = FlagSet::from_letter(c).ok_or(FlagError::Unknown(c))?;
            if flags.contains(flag) {
                return Err(FlagError::Duplicate(c));
            }
            flags |= flag;
        }
        Ok(flags)
    }

    /// Canonical string form: letters in the fixed order `g, i, m, u, y`.
    pub fn to_flag_string(self) -> String {
        CANONICAL_ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, letter)| *letter)
            .collect()
    }

    /// Map onto the parser's flag representation. Total and side-effect free.
    pub fn to_syntax_flags(self) -> SyntaxFlags {
        let mut syntax = SyntaxFlags::empty();
        if self.contains(FlagSet::GLOBAL) {
            syntax |= SyntaxFlags::GLOBAL;
        }
        if self.contains(FlagSet::IGNORE_CASE) {
            syntax |= SyntaxFlags::IGNORE_CASE;
        }
        if self.contains(FlagSet::MULTILINE) {
            syntax |= SyntaxFlags::MULTILINE;
        }
        if self.contains(FlagSet::UNICODE) {
            syntax |= SyntaxFlags::UNICODE;
        }
        if self.contains(FlagSet::STICKY) {
            syntax |= SyntaxFlags::STICKY;
        }
        syntax
    }

    #[inline]
    pub fn global(self) -> bool {
        self.contains(FlagSet::GLOBAL)
    }

    #[inline]
    pub fn ignore_case(self) -> bool {
        self.contains(FlagSet::IGNORE_CASE)
    }

    #[inline]
    pub fn multiline(self) -> bool {
        self.contains(FlagSet::MULTILINE)
    }

    #[inline]
    pub fn unicode(self) -> bool {
        self.contains(FlagSet::UNICODE)
    }

    #[inline]
    pub fn sticky(self) -> bool {
        self.contains(FlagSet::STICKY)
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_flag_string())
    }
}

impl FromStr for FlagSet {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagSet::parse_strict(s)
    }
}
