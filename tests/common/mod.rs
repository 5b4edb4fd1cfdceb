//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;

use git2::{Oid, Repository, Signature};

use scrivener::{ChangeGroup, ChangeKind, ChangeUnit, DiffLine};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self { dir, repo }
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file in the working tree, creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&full, content).expect("Failed to write file");
    }

    /// Remove a file from the working tree.
    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
    }

    /// Stage a working tree path.
    pub fn stage(&self, path: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(path)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Remove a path from both the working tree and the index.
    pub fn stage_removal(&self, path: &str) {
        self.remove(path);
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(path)).expect("Failed to remove file from index");
        index.write().expect("Failed to write index");
    }

    /// Write, stage and commit the given files. Returns the commit OID.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Oid {
        for (path, content) in files {
            self.write(path, content);
            self.stage(path);
        }

        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        // Get parent commit if exists
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }
}

/// A modified text unit built from bare diff lines (`+added`, `-removed`).
pub fn unit(path: &str, kind: ChangeKind, patch: &str) -> ChangeUnit {
    ChangeUnit::new(path, kind).with_patch(patch)
}

/// A unit with added lines only.
pub fn added(path: &str, lines: &[&str]) -> ChangeUnit {
    ChangeUnit::new(path, ChangeKind::Added)
        .with_lines(lines.iter().map(|l| DiffLine::added(*l)).collect())
}

/// One group holding every unit.
pub fn group_of(units: &[ChangeUnit]) -> ChangeGroup {
    ChangeGroup::from_members((0..units.len()).collect(), units)
}
