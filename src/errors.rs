//! Error types surfaced by the generator pipeline.

use crate::diagnostics::Loc;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user-facing defect in the input grammar.
    #[error("{0}")]
    Grammar(#[from] GrammarError),

    /// Symbol counts exceed the id encoding's range.
    #[error("too many {0}")]
    LimitExceeded(&'static str),

    /// A violated construction invariant. Reported as a bug, not a user error.
    #[error("internal error: {0}")]
    Internal(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A grammar error with an optional source location. The location covers a
/// single line; rendering with the offending line and a caret is done by
/// [`crate::diagnostics::SourceFile::render`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GrammarError {
    pub message: String,
    pub loc: Option<Loc>,
}

impl GrammarError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            loc: None,
        }
    }

    pub fn at(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            message: message.into(),
            loc: Some(loc),
        }
    }
}
