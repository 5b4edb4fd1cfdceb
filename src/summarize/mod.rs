//! Natural-language summaries of change groups.
//!
//! The [`Summarizer`] trait is the seam for whatever writes the prose of a
//! commit message. [`PathSummarizer`] is a deterministic built-in that works
//! from paths and change kinds alone.

pub mod pool;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::change::{ChangeGroup, ChangeKind, PathRules};
use crate::error::SummarizerError;

pub use pool::{SummaryBatch, SummaryOutcome, SummaryPool, SummaryPoolConfig};

/// Prose for one commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Short imperative description for the header.
    pub description: String,
    /// Body paragraphs.
    #[serde(default)]
    pub body: Vec<String>,
    /// Explanation used as the `BREAKING CHANGE` footer value.
    #[serde(default)]
    pub breaking_note: Option<String>,
}

impl Summary {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_paragraph(mut self, paragraph: impl Into<String>) -> Self {
        self.body.push(paragraph.into());
        self
    }

    pub fn with_breaking_note(mut self, note: impl Into<String>) -> Self {
        self.breaking_note = Some(note.into());
        self
    }
}

/// Produces the description and body text of a commit message.
///
/// This abstraction allows mocking the summarizer in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, group: &ChangeGroup) -> Result<Summary, SummarizerError>;
}

/// Describes a group from its paths and change kinds.
#[derive(Debug, Clone, Default)]
pub struct PathSummarizer {
    rules: PathRules,
}

impl PathSummarizer {
    pub fn new(rules: PathRules) -> Self {
        Self { rules }
    }

    /// Synchronous form of [`Summarizer::summarize`].
    pub fn describe(&self, group: &ChangeGroup) -> Summary {
        let verb = verb(group);

        let description = match group.units.as_slice() {
            [] => "update nothing".to_string(),
            [unit] => match (unit.kind, unit.old_path.as_deref()) {
                (ChangeKind::Renamed, Some(old)) => {
                    format!("rename {} to {}", file_name(old), file_name(&unit.path))
                }
                _ => format!("{} {}", verb, file_name(&unit.path)),
            },
            units => match self.shared_scope(group) {
                Some(scope) => format!("{} {} ({} files)", verb, scope, units.len()),
                None => format!("{} {} files", verb, units.len()),
            },
        };

        let mut summary = Summary::new(description);
        if group.len() > 1 {
            let listing = group
                .units
                .iter()
                .map(|u| format!("- {} {}", kind_word(u.kind), u.path))
                .collect::<Vec<_>>()
                .join("\n");
            summary = summary.with_paragraph(listing);
        }
        summary
    }

    fn shared_scope(&self, group: &ChangeGroup) -> Option<String> {
        let mut keys = group.units.iter().map(|u| self.rules.scope_key(&u.path));
        let first = keys.next()??;
        keys.all(|k| k.as_deref() == Some(first.as_str()))
            .then_some(first)
    }
}

#[async_trait]
impl Summarizer for PathSummarizer {
    async fn summarize(&self, group: &ChangeGroup) -> Result<Summary, SummarizerError> {
        Ok(self.describe(group))
    }
}

fn verb(group: &ChangeGroup) -> &'static str {
    let all = |kind: ChangeKind| !group.is_empty() && group.units.iter().all(|u| u.kind == kind);
    if all(ChangeKind::Added) {
        "add"
    } else if all(ChangeKind::Deleted) {
        "remove"
    } else if all(ChangeKind::Renamed) {
        "move"
    } else {
        "update"
    }
}

fn kind_word(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "add",
        ChangeKind::Modified => "update",
        ChangeKind::Deleted => "remove",
        ChangeKind::Renamed => "rename",
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeUnit;

    fn group(units: Vec<ChangeUnit>) -> ChangeGroup {
        let members = (0..units.len()).collect();
        ChangeGroup::from_members(members, &units)
    }

    #[test]
    fn test_single_file_descriptions() {
        let summarizer = PathSummarizer::default();

        let added = group(vec![ChangeUnit::new("src/export.rs", ChangeKind::Added)]);
        assert_eq!(summarizer.describe(&added), Summary::new("add export.rs"));

        let removed = group(vec![ChangeUnit::new("docs/old.md", ChangeKind::Deleted)]);
        assert_eq!(summarizer.describe(&removed).description, "remove old.md");

        let renamed = group(vec![
            ChangeUnit::new("src/net/client.rs", ChangeKind::Modified).renamed_from("src/http.rs"),
        ]);
        assert_eq!(
            summarizer.describe(&renamed).description,
            "rename http.rs to client.rs"
        );
    }

    #[test]
    fn test_multi_file_description_uses_scope() {
        let summarizer = PathSummarizer::default();
        let auth = group(vec![
            ChangeUnit::new("src/auth/login.rs", ChangeKind::Modified),
            ChangeUnit::new("src/auth/token.rs", ChangeKind::Added),
        ]);
        let summary = summarizer.describe(&auth);
        assert_eq!(summary.description, "update auth (2 files)");
        assert_eq!(
            summary.body,
            vec!["- update src/auth/login.rs\n- add src/auth/token.rs".to_string()]
        );
        assert_eq!(summary.breaking_note, None);
    }

    #[test]
    fn test_multi_file_description_without_scope() {
        let summarizer = PathSummarizer::default();
        let mixed = group(vec![
            ChangeUnit::new("Cargo.toml", ChangeKind::Added),
            ChangeUnit::new("build.rs", ChangeKind::Added),
        ]);
        assert_eq!(summarizer.describe(&mixed).description, "add 2 files");
    }

    #[tokio::test]
    async fn test_trait_impl_matches_describe() {
        let summarizer = PathSummarizer::default();
        let g = group(vec![ChangeUnit::new("src/lib.rs", ChangeKind::Modified)]);
        let summary = summarizer.summarize(&g).await.unwrap();
        assert_eq!(summary, summarizer.describe(&g));
    }
}
