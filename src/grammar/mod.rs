//! Conventional commit grammar: message model, parser, renderer and validator.

pub mod parser;
pub mod render;
pub mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GrammarError;

pub use parser::parse;
pub use render::render;
pub use validate::validate;

/// The footer token that signals an incompatible change.
pub const BREAKING_CHANGE: &str = "BREAKING CHANGE";

/// Hyphenated synonym of [`BREAKING_CHANGE`].
pub const BREAKING_CHANGE_HYPHENATED: &str = "BREAKING-CHANGE";

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "build" => Ok(Self::Build),
            "ci" => Ok(Self::Ci),
            "chore" => Ok(Self::Chore),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// How a footer separates its token from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FooterSeparator {
    /// `token: value`
    Colon,
    /// `token #value`
    Hash,
}

/// A single trailer such as `Reviewed-by: Z` or `Refs #133`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub token: String,
    pub separator: FooterSeparator,
    /// May span several lines; continuation lines are kept verbatim.
    pub value: String,
}

impl Footer {
    pub fn new(token: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            separator: FooterSeparator::Colon,
            value: value.into(),
        }
    }

    pub fn with_hash(token: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            separator: FooterSeparator::Hash,
            value: value.into(),
        }
    }

    /// Whether this footer is `BREAKING CHANGE` or `BREAKING-CHANGE`.
    pub fn is_breaking_change(&self) -> bool {
        self.token == BREAKING_CHANGE || self.token == BREAKING_CHANGE_HYPHENATED
    }
}

/// A parsed or to-be-rendered conventional commit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    /// Canonical lowercase type token (`feat`, `fix`, or any custom token).
    pub commit_type: String,
    pub scope: Option<String>,
    pub breaking: bool,
    /// The header carries `!` before the colon.
    pub breaking_marker: bool,
    pub description: String,
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default)]
    pub footers: Vec<Footer>,
}

impl CommitMessage {
    /// Start a header-only message. Type is stored lowercase.
    pub fn new(commit_type: impl AsRef<str>, description: impl Into<String>) -> Self {
        Self {
            commit_type: commit_type.as_ref().to_lowercase(),
            scope: None,
            breaking: false,
            breaking_marker: false,
            description: description.into(),
            body: Vec::new(),
            footers: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl AsRef<str>) -> Self {
        self.scope = Some(scope.as_ref().to_lowercase());
        self
    }

    pub fn with_body_paragraph(mut self, paragraph: impl Into<String>) -> Self {
        self.body.push(paragraph.into());
        self
    }

    /// Append a footer. A breaking-change footer also sets `breaking`.
    pub fn with_footer(mut self, footer: Footer) -> Self {
        if footer.is_breaking_change() {
            self.breaking = true;
        }
        self.footers.push(footer);
        self
    }

    /// Flag the message as breaking with `!` in the header.
    pub fn mark_breaking(mut self) -> Self {
        self.breaking = true;
        self.breaking_marker = true;
        self
    }

    /// Whether the footers carry a breaking-change signal.
    pub fn has_breaking_footer(&self) -> bool {
        self.footers.iter().any(Footer::is_breaking_change)
    }

    /// Canonical header line: `type(scope)!: description`.
    pub fn header(&self) -> String {
        render::render_header(self)
    }
}

impl FromStr for CommitMessage {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
