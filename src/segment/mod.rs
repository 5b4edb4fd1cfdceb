//! Change segmentation: partition change units into logical groups.
//!
//! Units are linked by pairwise affinity signals (module, test pairing,
//! shared symbols, shared issue references) and each connected component
//! becomes one [`ChangeGroup`].

pub mod affinity;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::change::{ChangeGroup, ChangeUnit, PathRules};

pub use affinity::Affinity;
use affinity::{UnitProfile, affinity};

/// Non-fatal observations made while segmenting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationDiagnostic {
    /// No signal linked any pair of units; each unit became its own group.
    AmbiguityFallback { units: usize },
    /// A unit shares no signal with any other unit.
    Isolated { index: usize, path: String },
}

/// Result of segmentation: the groups plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub groups: Vec<ChangeGroup>,
    pub diagnostics: Vec<SegmentationDiagnostic>,
}

/// Partitions change units using path conventions and content signals.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    rules: PathRules,
}

impl Segmenter {
    pub fn new(rules: PathRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PathRules {
        &self.rules
    }

    /// Partition `units` into groups.
    ///
    /// Every input index appears in exactly one group. Members are ascending
    /// and groups are ordered by their first member, so the result depends
    /// only on the input order.
    pub fn segment(&self, units: &[ChangeUnit]) -> Segmentation {
        if units.is_empty() {
            return Segmentation {
                groups: Vec::new(),
                diagnostics: Vec::new(),
            };
        }

        let profiles: Vec<UnitProfile> = units
            .iter()
            .map(|u| UnitProfile::build(u, &self.rules))
            .collect();

        let mut sets = DisjointSet::new(units.len());
        let mut linked = vec![false; units.len()];

        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                if let Some(signal) = affinity(&profiles[i], &profiles[j]) {
                    debug!(
                        "Linked {} and {} ({})",
                        units[i].path, units[j].path, signal
                    );
                    sets.union(i, j);
                    linked[i] = true;
                    linked[j] = true;
                }
            }
        }

        let mut diagnostics = Vec::new();
        if units.len() > 1 && !linked.iter().any(|&l| l) {
            warn!(
                "No affinity between any of {} changed files, using one group per file",
                units.len()
            );
            diagnostics.push(SegmentationDiagnostic::AmbiguityFallback { units: units.len() });
        } else if units.len() > 1 {
            for (index, _) in linked.iter().enumerate().filter(|(_, l)| !**l) {
                debug!("{} is isolated", units[index].path);
                diagnostics.push(SegmentationDiagnostic::Isolated {
                    index,
                    path: units[index].path.clone(),
                });
            }
        }

        let groups = sets
            .components()
            .into_iter()
            .map(|members| ChangeGroup::from_members(members, units))
            .collect::<Vec<_>>();

        debug!("Segmented {} units into {} groups", units.len(), groups.len());

        Segmentation {
            groups,
            diagnostics,
        }
    }

    /// Place every unit in one group.
    pub fn single(&self, units: &[ChangeUnit]) -> Segmentation {
        let groups = if units.is_empty() {
            Vec::new()
        } else {
            vec![ChangeGroup::from_members((0..units.len()).collect(), units)]
        };
        Segmentation {
            groups,
            diagnostics: Vec::new(),
        }
    }
}

/// Check that `groups` partition the indices `0..total`.
///
/// Checks:
/// - No unknown members (indices outside the input)
/// - No duplicate members (indices in several groups)
/// - No orphaned units (indices in no group)
///
/// Returns an error message if validation fails, or `None` if valid.
pub fn validate_partition(groups: &[ChangeGroup], total: usize) -> Option<String> {
    let mut seen: HashSet<usize> = HashSet::new();

    for (position, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Some(format!("Group {} is empty", position + 1));
        }
        for &member in &group.members {
            if member >= total {
                return Some(format!(
                    "Unknown unit in group {}: {}",
                    position + 1,
                    member
                ));
            }

            if !seen.insert(member) {
                return Some(format!("Duplicate unit across groups: {}", member));
            }
        }
    }

    (0..total)
        .find(|i| !seen.contains(i))
        .map(|i| format!("Unit not assigned to any group: {}", i))
}

/// Union-find over unit indices. Each root is the smallest index in its set.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }

    /// Components with ascending members, ordered by their smallest member.
    fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); self.parent.len()];
        for node in 0..self.parent.len() {
            let root = self.find(node);
            by_root[root].push(node);
        }
        by_root.into_iter().filter(|c| !c.is_empty()).collect()
    }
}
