//! Commit type, scope and breaking-change classification of a change group.
//!
//! A fixed rule table; the first matching rule decides the type:
//!
//! | # | Condition | Type |
//! |---|-----------|------|
//! | 1 | every unit is a test file | `test` |
//! | 2 | every unit is a documentation file | `docs` |
//! | 3 | every unit is a whitespace-only modification | `style` |
//! | 4 | public contract removed or changed | breaking, type from 5/6, else `feat` |
//! | 5 | new capability, no defect reference | `feat` |
//! | 6 | modifies files, defect reference or net deletion | `fix` |
//! | 7 | anything else | `ci` or `build` when every file is one, else `chore` |
//!
//! New capability is a new public symbol, or an added file that is source
//! code or declares something. Rule 4 follows the breaking hint when given.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::change::content::UnitContent;
use crate::change::{ChangeGroup, ChangeKind, ChangeUnit, PathRules};
use crate::grammar::CommitType;

/// Caller-supplied overrides for judgment calls the rules cannot make.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationHints {
    /// Force (`Some(true)`) or suppress (`Some(false)`) the breaking flag.
    pub breaking: Option<bool>,
    /// External defect reference such as `#42` or `ABC-7`.
    pub defect_reference: Option<String>,
}

impl ClassificationHints {
    pub fn breaking(mut self, breaking: bool) -> Self {
        self.breaking = Some(breaking);
        self
    }

    pub fn defect(mut self, reference: impl Into<String>) -> Self {
        self.defect_reference = Some(reference.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub breaking: bool,
    /// Defect reference from the hints or from added comment lines.
    pub defect_reference: Option<String>,
}

/// Classifies change groups with the rule table above.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: PathRules,
}

struct UnitFacts<'a> {
    unit: &'a ChangeUnit,
    is_test: bool,
    is_doc: bool,
    content: UnitContent,
}

impl UnitFacts<'_> {
    fn is_code(&self) -> bool {
        !self.is_test && !self.is_doc
    }
}

impl Classifier {
    pub fn new(rules: PathRules) -> Self {
        Self { rules }
    }

    pub fn classify(&self, group: &ChangeGroup, hints: &ClassificationHints) -> Classification {
        let facts: Vec<UnitFacts<'_>> = group
            .units
            .iter()
            .map(|unit| {
                let is_doc = self.rules.is_doc(&unit.path);
                UnitFacts {
                    unit,
                    is_test: self.rules.is_test(&unit.path),
                    is_doc,
                    content: UnitContent::analyze(unit, is_doc),
                }
            })
            .collect();

        let defect_reference = hints
            .defect_reference
            .clone()
            .or_else(|| facts.iter().find_map(|f| f.content.defect_ref.clone()));

        let detected_breaking = facts.iter().filter(|f| f.is_code()).any(breaks_contract);
        let breaking = hints.breaking.unwrap_or(detected_breaking);

        let commit_type = self.commit_type(&facts, defect_reference.is_some(), breaking);
        let scope = self.scope(group, commit_type);

        debug!(
            "Classified {} as {}{} (scope: {:?})",
            group.paths().join(", "),
            commit_type,
            if breaking { "!" } else { "" },
            scope
        );

        Classification {
            commit_type,
            scope,
            breaking,
            defect_reference,
        }
    }

    fn commit_type(&self, facts: &[UnitFacts<'_>], has_defect: bool, breaking: bool) -> CommitType {
        if facts.is_empty() {
            return CommitType::Chore;
        }

        if facts.iter().all(|f| f.is_test) {
            return CommitType::Test;
        }

        if facts.iter().all(|f| f.is_doc) {
            return CommitType::Docs;
        }

        if facts.iter().all(|f| {
            f.unit.kind == ChangeKind::Modified && !f.unit.is_binary() && f.content.whitespace_only
        }) {
            return CommitType::Style;
        }

        let new_capability = facts.iter().filter(|f| f.is_code()).any(|f| {
            !f.content.new_symbols().is_empty()
                || (f.unit.kind == ChangeKind::Added && self.implements_behavior(f))
        });
        if new_capability && !has_defect {
            return CommitType::Feat;
        }

        let modifies = facts.iter().any(|f| f.unit.kind == ChangeKind::Modified);
        let net_deletion = facts.iter().map(|f| f.unit.deletions()).sum::<usize>()
            > facts.iter().map(|f| f.unit.insertions()).sum::<usize>();
        if modifies && (has_defect || net_deletion) {
            return CommitType::Fix;
        }

        if breaking {
            return CommitType::Feat;
        }

        if facts.iter().all(|f| f.unit.paths().all(|p| self.rules.is_ci(p))) {
            return CommitType::Ci;
        }

        if facts.iter().all(|f| f.unit.paths().all(|p| self.rules.is_build(p))) {
            return CommitType::Build;
        }

        CommitType::Chore
    }

    /// An added file brings behavior when it is source code or declares symbols.
    fn implements_behavior(&self, facts: &UnitFacts<'_>) -> bool {
        self.rules.is_source(&facts.unit.path)
            || !facts.content.added_public.is_empty()
            || !facts.content.declared.is_empty()
    }

    /// Shared scope token of every unit, unless it only repeats the type.
    fn scope(&self, group: &ChangeGroup, commit_type: CommitType) -> Option<String> {
        let mut keys = group
            .units
            .iter()
            .flat_map(|u| u.paths())
            .map(|p| self.rules.scope_key(p));

        let first = keys.next()??;
        if !keys.all(|k| k.as_deref() == Some(first.as_str())) {
            return None;
        }

        let redundant = match commit_type {
            CommitType::Docs => self.rules.doc_dirs.contains(&first),
            CommitType::Test => self.rules.test_dirs.contains(&first),
            _ => false,
        };
        if redundant { None } else { Some(first) }
    }
}

/// Removed or re-signed public symbols, or a deleted file that declared any.
fn breaks_contract(facts: &UnitFacts<'_>) -> bool {
    if facts.unit.kind == ChangeKind::Deleted && !facts.content.removed_public.is_empty() {
        return true;
    }
    !facts.content.broken_symbols().is_empty()
}
