//! scrivener - Conventional Commit messages composed from working tree changes.
//!
//! # Overview
//!
//! scrivener reads the pending changes of a git working tree, partitions them
//! into logical groups, classifies each group (type, scope, breaking change)
//! and assembles a Conventional Commit message per group. Every message is
//! validated and round-tripped through the grammar parser before it is
//! returned. Nothing is ever staged or committed.

pub mod change;
pub mod classify;
pub mod compose;
pub mod error;
pub mod git;
pub mod grammar;
pub mod segment;
pub mod summarize;

// Re-export commonly used types
pub use change::{ChangeGroup, ChangeKind, ChangeUnit, ContentDelta, DiffLine, PathRules};
pub use classify::{Classification, ClassificationHints, Classifier};
pub use compose::{Composer, ComposerConfig, Composition, CompositionPlan, HintSource, SplitMode};
pub use error::{ComposeError, GrammarError, GrammarErrorKind, GroupError, StatusError, SummarizerError};
pub use grammar::{CommitMessage, CommitType, Footer, FooterSeparator, parse, render, validate};
pub use segment::{Segmentation, SegmentationDiagnostic, Segmenter};
pub use summarize::{PathSummarizer, Summarizer, Summary, SummaryPoolConfig};
