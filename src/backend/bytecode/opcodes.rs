//! Bytecode opcodes for the backtracking VM
//!
//! Opcodes are grouped by category and assigned contiguous ranges. All
//! immediates are big-endian `u32` values; jump targets are absolute byte
//! offsets into the program.

use std::fmt;

/// Bytecode opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Character Matching (0x00-0x0F) ===
    /// Match one character, code point is next 4 bytes
    Char = 0x00,
    /// Match one character after case folding, folded code point is next 4 bytes
    CharFold = 0x01,
    /// Match any character except a line terminator
    Any = 0x02,
    /// Match one character against the class pool, index is next 4 bytes
    Class = 0x03,
    /// Match the text of a previous group, group number is next 4 bytes
    Backref = 0x04,

    // === Assertions (0x10-0x1F) ===
    /// `^`, honoring multiline
    AssertStart = 0x10,
    /// `$`, honoring multiline
    AssertEnd = 0x11,
    /// `\b`
    WordBoundary = 0x12,
    /// `\B`
    NotWordBoundary = 0x13,
    /// Run the body that follows as a positive lookahead; end target is next 4 bytes
    LookAhead = 0x14,
    /// Run the body that follows as a negative lookahead; end target is next 4 bytes
    NegLookAhead = 0x15,
    /// End of a lookahead body
    LookEnd = 0x16,

    // === Control Flow (0x20-0x2F) ===
    /// Unconditional jump, target is next 4 bytes
    Jump = 0x20,
    /// Try the primary target first, backtrack into the alternative.
    /// Primary and alternative targets are the next 4 + 4 bytes.
    Split = 0x21,
    /// Successful end of the pattern
    Match = 0x22,

    // === Captures and Registers (0x30-0x3F) ===
    /// Store the current position in a capture slot, slot is next 4 bytes
    Save = 0x30,
    /// Unset capture slots `[from, to)`, next 4 + 4 bytes
    ResetCaptures = 0x31,
    /// Record the current position in a loop register, register is next 4 bytes
    Mark = 0x32,
    /// Fail if the position has not advanced since `Mark`, register is next 4 bytes
    CheckProgress = 0x33,
}

impl Opcode {
    /// Convert a byte to an opcode
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE.get(byte as usize).copied().flatten()
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get the number of immediate bytes following this opcode
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Any
            | Self::AssertStart
            | Self::AssertEnd
            | Self::WordBoundary
            | Self::NotWordBoundary
            | Self::LookEnd
            | Self::Match => 0,

            Self::Char
            | Self::CharFold
            | Self::Class
            | Self::Backref
            | Self::LookAhead
            | Self::NegLookAhead
            | Self::Jump
            | Self::Save
            | Self::Mark
            | Self::CheckProgress => 4,

            Self::Split | Self::ResetCaptures => 8,
        }
    }

    /// Whether the immediate(s) of this opcode are jump targets
    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::Jump | Self::Split | Self::LookAhead | Self::NegLookAhead
        )
    }

    /// Get the mnemonic name for this opcode
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::CharFold => "char_fold",
            Self::Any => "any",
            Self::Class => "class",
            Self::Backref => "backref",
            Self::AssertStart => "assert_start",
            Self::AssertEnd => "assert_end",
            Self::WordBoundary => "word_boundary",
            Self::NotWordBoundary => "not_word_boundary",
            Self::LookAhead => "look_ahead",
            Self::NegLookAhead => "neg_look_ahead",
            Self::LookEnd => "look_end",
            Self::Jump => "jump",
            Self::Split => "split",
            Self::Match => "match",
            Self::Save => "save",
            Self::ResetCaptures => "reset_captures",
            Self::Mark => "mark",
            Self::CheckProgress => "check_progress",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Lookup table for byte -> Opcode conversion
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];

    // Character matching
    table[0x00] = Some(Opcode::Char);
    table[0x01] = Some(Opcode::CharFold);
    table[0x02] = Some(Opcode::Any);
    table[0x03] = Some(Opcode::Class);
    table[0x04] = Some(Opcode::Backref);

    // Assertions
    table[0x10] = Some(Opcode::AssertStart);
    table[0x11] = Some(Opcode::AssertEnd);
    table[0x12] = Some(Opcode::WordBoundary);
    table[0x13] = Some(Opcode::NotWordBoundary);
    table[0x14] = Some(Opcode::LookAhead);
    table[0x15] = Some(Opcode::NegLookAhead);
    table[0x16] = Some(Opcode::LookEnd);

    // Control flow
    table[0x20] = Some(Opcode::Jump);
    table[0x21] = Some(Opcode::Split);
    table[0x22] = Some(Opcode::Match);

    // Captures and registers
    table[0x30] = Some(Opcode::Save);
    table[0x31] = Some(Opcode::ResetCaptures);
    table[0x32] = Some(Opcode::Mark);
    table[0x33] = Some(Opcode::CheckProgress);

    table
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 19] = [
        Opcode::Char,
        Opcode::CharFold,
        Opcode::Any,
        Opcode::Class,
        Opcode::Backref,
        Opcode::AssertStart,
        Opcode::AssertEnd,
        Opcode::WordBoundary,
        Opcode::NotWordBoundary,
        Opcode::LookAhead,
        Opcode::NegLookAhead,
        Opcode::LookEnd,
        Opcode::Jump,
        Opcode::Split,
        Opcode::Match,
        Opcode::Save,
        Opcode::ResetCaptures,
        Opcode::Mark,
        Opcode::CheckProgress,
    ];

    #[test]
    fn test_opcode_roundtrip() {
        for op in ALL {
            let decoded = Opcode::from_byte(op.to_byte()).expect("Should decode valid opcode");
            assert_eq!(op, decoded, "Opcode {:?} roundtrip failed", op);
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert!(Opcode::from_byte(0x05).is_none());
        assert!(Opcode::from_byte(0x17).is_none());
        assert!(Opcode::from_byte(0xFF).is_none());
    }

    #[test]
    fn test_immediate_sizes() {
        assert_eq!(Opcode::Any.immediate_size(), 0);
        assert_eq!(Opcode::Char.immediate_size(), 4);
        assert_eq!(Opcode::Split.immediate_size(), 8);
        assert_eq!(Opcode::ResetCaptures.immediate_size(), 8);
    }

    #[test]
    fn test_mnemonics_unique() {
        let mut names: Vec<_> = ALL.iter().map(|op| op.mnemonic()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}
