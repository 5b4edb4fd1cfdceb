//! Pairwise affinity signals between change units.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::change::content::UnitContent;
use crate::change::{ChangeUnit, PathRules};

/// Why two units were placed in the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    /// Same module directory below a scope root.
    Module,
    /// A test file and the file it tests.
    TestPairing,
    /// A symbol declared in one unit is used in the other.
    Symbol,
    /// Both units cite the same issue reference.
    Intent,
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affinity::Module => write!(f, "same module"),
            Affinity::TestPairing => write!(f, "test pairing"),
            Affinity::Symbol => write!(f, "shared symbol"),
            Affinity::Intent => write!(f, "shared issue reference"),
        }
    }
}

/// Everything the segmenter needs to know about one unit, computed once.
#[derive(Debug, Clone)]
pub(crate) struct UnitProfile {
    modules: BTreeSet<String>,
    is_test: bool,
    test_subject: Option<String>,
    subjects: Vec<String>,
    content: UnitContent,
}

impl UnitProfile {
    pub(crate) fn build(unit: &ChangeUnit, rules: &PathRules) -> Self {
        let is_test = rules.is_test(&unit.path);
        Self {
            modules: unit.paths().filter_map(|p| rules.module_key(p)).collect(),
            is_test,
            test_subject: if is_test {
                rules.test_subject(&unit.path)
            } else {
                None
            },
            subjects: if is_test {
                Vec::new()
            } else {
                unit.paths().flat_map(|p| rules.subject_names(p)).collect()
            },
            content: UnitContent::analyze(unit, rules.is_doc(&unit.path)),
        }
    }
}

/// The strongest signal linking two units, if any.
pub(crate) fn affinity(a: &UnitProfile, b: &UnitProfile) -> Option<Affinity> {
    if !a.modules.is_disjoint(&b.modules) {
        return Some(Affinity::Module);
    }

    if tests_subject(a, b) || tests_subject(b, a) {
        return Some(Affinity::TestPairing);
    }

    if uses_declared(a, b) || uses_declared(b, a) {
        return Some(Affinity::Symbol);
    }

    if !a.content.issue_refs.is_disjoint(&b.content.issue_refs) {
        return Some(Affinity::Intent);
    }

    None
}

fn tests_subject(test: &UnitProfile, subject: &UnitProfile) -> bool {
    test.is_test
        && !subject.is_test
        && test
            .test_subject
            .as_ref()
            .is_some_and(|s| subject.subjects.contains(s))
}

fn uses_declared(declaring: &UnitProfile, using: &UnitProfile) -> bool {
    declaring
        .content
        .declared
        .iter()
        .any(|name| using.content.identifiers.contains(name))
}
