//! Error types for scrivener modules using thiserror.

use std::fmt;

use thiserror::Error;

/// Category of a grammar violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarErrorKind {
    EmptyMessage,
    MalformedHeader,
    InvalidScope,
    EmptyDescription,
    MissingBlankLineAfterHeader,
    InvalidBody,
    InvalidFooterToken,
    InvalidFooterValue,
    BreakingSignalMismatch,
}

impl GrammarErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarErrorKind::EmptyMessage => "empty message",
            GrammarErrorKind::MalformedHeader => "malformed header",
            GrammarErrorKind::InvalidScope => "invalid scope",
            GrammarErrorKind::EmptyDescription => "empty description",
            GrammarErrorKind::MissingBlankLineAfterHeader => "missing blank line after header",
            GrammarErrorKind::InvalidBody => "invalid body",
            GrammarErrorKind::InvalidFooterToken => "invalid footer token",
            GrammarErrorKind::InvalidFooterValue => "invalid footer value",
            GrammarErrorKind::BreakingSignalMismatch => "breaking change signal mismatch",
        }
    }
}

impl fmt::Display for GrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A commit message that does not follow the Conventional Commits grammar.
///
/// `line` and `column` are 1-based and point at the first offending character.
/// Parsing is all-or-nothing, so an error never carries a partial message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct GrammarError {
    pub kind: GrammarErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl GrammarError {
    pub fn new(kind: GrammarErrorKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            column,
            message: message.into(),
        }
    }
}

/// Errors from the text summarizer collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizerError {
    #[error("Summarizer timed out after {0} seconds")]
    Timeout(u64),

    #[error("Summarizer failed: {0}")]
    Failed(String),

    #[error("Summarizer is unavailable: {0}")]
    Unavailable(String),

    #[error("Summarizer task panicked: {0}")]
    Panicked(String),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<SummarizerError>),
}

impl SummarizerError {
    /// Whether this failure should stop the whole run rather than one group.
    pub fn is_fatal(&self) -> bool {
        match self {
            SummarizerError::Unavailable(_) | SummarizerError::Panicked(_) => true,
            SummarizerError::RetriesExhausted(inner) => inner.is_fatal(),
            SummarizerError::Timeout(_) | SummarizerError::Failed(_) => false,
        }
    }
}

/// A group whose message could not be produced. Other groups are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("No description available for commit group {group}: {reason}")]
    MissingDescription { group: usize, reason: String },

    #[error("Summary for commit group {group} does not form a valid message: {source}")]
    InvalidSummary {
        group: usize,
        #[source]
        source: GrammarError,
    },
}

impl GroupError {
    /// 1-based number of the group this error belongs to.
    pub fn group(&self) -> usize {
        match self {
            GroupError::MissingDescription { group, .. } | GroupError::InvalidSummary { group, .. } => {
                *group
            }
        }
    }
}

/// Errors that fail a whole composition run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error(
        "Internal error: composed message for group {group} did not survive a render/parse round trip: {detail}"
    )]
    InvariantViolation { group: usize, detail: String },

    #[error("Internal error: change groups are not a partition of the input: {0}")]
    InvalidPartition(String),
}

/// Errors from reading working tree status.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("No changes to compose (working tree is clean)")]
    NoChanges,

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),
}
