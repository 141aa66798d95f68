//! Error types of the conversion core

use thiserror::Error;

/// Errors raised while converting a single note or reference
///
/// None of them aborts a run: the engine records each one in the
/// migration summary and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A bullet is nested more than one level below its parent
    #[error("line {line}: bullet at depth {depth} under a block at depth {parent_depth}")]
    MalformedOutline {
        line: usize,
        parent_depth: usize,
        depth: usize,
    },

    /// Reference text is empty or cannot name a target
    #[error("unresolvable reference {text:?}: {reason}")]
    UnresolvableReference { text: String, reason: &'static str },

    /// A journal name does not follow the yyyy_mm_dd pattern
    #[error("journal name {name:?} is not a yyyy_mm_dd date")]
    InvalidJournalDate { name: String },
}

pub type ConvertResult<T> = Result<T, ConvertError>;
