//! Change units captured from the working tree and the groups they form.

pub mod content;
pub mod paths;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use paths::PathRules;

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Renamed => write!(f, "Renamed"),
        }
    }
}

/// Which side of the diff a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOrigin {
    Added,
    Removed,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub origin: LineOrigin,
    pub text: String,
}

impl DiffLine {
    pub fn added(text: impl Into<String>) -> Self {
        Self {
            origin: LineOrigin::Added,
            text: text.into(),
        }
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self {
            origin: LineOrigin::Removed,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self {
            origin: LineOrigin::Context,
            text: text.into(),
        }
    }
}

/// Content delta of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentDelta {
    /// Line counts, plus the diff lines when the reader captured them.
    Text {
        insertions: usize,
        deletions: usize,
        #[serde(default)]
        lines: Vec<DiffLine>,
    },
    /// Opaque binary change. Never inspected.
    Binary,
}

impl ContentDelta {
    /// Build a text delta from diff lines, counting insertions and deletions.
    pub fn from_lines(lines: Vec<DiffLine>) -> Self {
        let insertions = lines.iter().filter(|l| l.origin == LineOrigin::Added).count();
        let deletions = lines.iter().filter(|l| l.origin == LineOrigin::Removed).count();
        ContentDelta::Text {
            insertions,
            deletions,
            lines,
        }
    }

    /// Build a text delta from unified diff text.
    ///
    /// File headers (`diff`, `index`, `---`, `+++`) are skipped until the
    /// first `@@` hunk header; `\ No newline at end of file` markers are
    /// ignored. Text without any hunk header is read as bare hunk lines.
    pub fn from_patch(patch: &str) -> Self {
        let mut in_hunk = !patch.lines().any(|l| l.starts_with("@@"));
        let mut lines = Vec::new();

        for line in patch.lines() {
            if line.starts_with("@@") {
                in_hunk = true;
                continue;
            }
            if line.starts_with("diff ") {
                in_hunk = false;
                continue;
            }
            if !in_hunk {
                continue;
            }

            let mut chars = line.chars();
            match chars.next() {
                Some('+') => lines.push(DiffLine::added(chars.as_str())),
                Some('-') => lines.push(DiffLine::removed(chars.as_str())),
                Some(' ') => lines.push(DiffLine::context(chars.as_str())),
                _ => {}
            }
        }

        Self::from_lines(lines)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ContentDelta::Binary)
    }
}

/// Smallest atomic edit considered by segmentation: one file's delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUnit {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Previous path for renames.
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub delta: ContentDelta,
}

impl ChangeUnit {
    /// A text change with no captured content.
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            kind,
            delta: ContentDelta::Text {
                insertions: 0,
                deletions: 0,
                lines: Vec::new(),
            },
        }
    }

    pub fn binary(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            delta: ContentDelta::Binary,
            ..Self::new(path, kind)
        }
    }

    pub fn with_lines(mut self, lines: Vec<DiffLine>) -> Self {
        self.delta = ContentDelta::from_lines(lines);
        self
    }

    pub fn with_patch(mut self, patch: &str) -> Self {
        self.delta = ContentDelta::from_patch(patch);
        self
    }

    /// Line counts without content.
    pub fn with_counts(mut self, insertions: usize, deletions: usize) -> Self {
        self.delta = ContentDelta::Text {
            insertions,
            deletions,
            lines: Vec::new(),
        };
        self
    }

    pub fn renamed_from(mut self, old_path: impl Into<String>) -> Self {
        self.old_path = Some(old_path.into());
        self.kind = ChangeKind::Renamed;
        self
    }

    pub fn is_binary(&self) -> bool {
        self.delta.is_binary()
    }

    pub fn insertions(&self) -> usize {
        match self.delta {
            ContentDelta::Text { insertions, .. } => insertions,
            ContentDelta::Binary => 0,
        }
    }

    pub fn deletions(&self) -> usize {
        match self.delta {
            ContentDelta::Text { deletions, .. } => deletions,
            ContentDelta::Binary => 0,
        }
    }

    /// Diff lines; empty for binary units or when content was not captured.
    pub fn lines(&self) -> &[DiffLine] {
        match &self.delta {
            ContentDelta::Text { lines, .. } => lines,
            ContentDelta::Binary => &[],
        }
    }

    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.lines()
            .iter()
            .filter(|l| l.origin == LineOrigin::Added)
            .map(|l| l.text.as_str())
    }

    pub fn removed_lines(&self) -> impl Iterator<Item = &str> {
        self.lines()
            .iter()
            .filter(|l| l.origin == LineOrigin::Removed)
            .map(|l| l.text.as_str())
    }

    /// Added and removed lines, in diff order.
    pub fn changed_lines(&self) -> impl Iterator<Item = &str> {
        self.lines()
            .iter()
            .filter(|l| l.origin != LineOrigin::Context)
            .map(|l| l.text.as_str())
    }

    /// Current path, followed by the previous path for renames.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str()).chain(self.old_path.as_deref())
    }
}

/// ChangeUnits believed to form one logical change.
///
/// `members` holds the input index of each unit, ascending; `units` is in the
/// same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeGroup {
    pub members: Vec<usize>,
    pub units: Vec<ChangeUnit>,
}

impl ChangeGroup {
    /// Build a group from input indices into `all`.
    pub fn from_members(members: Vec<usize>, all: &[ChangeUnit]) -> Self {
        let units = members.iter().map(|&i| all[i].clone()).collect();
        Self { members, units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.path.as_str()).collect()
    }

    pub fn insertions(&self) -> usize {
        self.units.iter().map(ChangeUnit::insertions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.units.iter().map(ChangeUnit::deletions).sum()
    }
}
