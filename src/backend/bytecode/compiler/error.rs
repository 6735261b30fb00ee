//! Compiler error types for the bytecode compiler.

/// Compiler error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Encoded program exceeds the size limit
    ProgramTooLarge { size: usize },
    /// Class pool index overflow
    TooManyClasses,
    /// Loop register index overflow
    TooManyRegisters,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProgramTooLarge { size } => {
                write!(f, "Program too large: {} bytes", size)
            }
            Self::TooManyClasses => write!(f, "Too many character classes"),
            Self::TooManyRegisters => write!(f, "Too many loop registers"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
