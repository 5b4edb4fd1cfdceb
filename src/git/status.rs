//! Change units from the working tree using git2.

use std::path::Path;

use git2::{Delta, Diff, DiffDelta, DiffFindOptions, DiffOptions, ErrorCode, Patch, Repository, Tree};
use tracing::debug;

use crate::change::{ChangeKind, ChangeUnit, DiffLine};
use crate::error::StatusError;

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD, or `Err(StatusError::DiffFailed)`
/// for real errors (corrupt HEAD, permission issues, missing objects).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, StatusError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(StatusError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(StatusError::DiffFailed)?;
    Ok(Some(tree))
}

/// Collect every pending change (staged, unstaged and untracked) as change
/// units, sorted by path.
pub fn collect_changes(repo: &Repository) -> Result<Vec<ChangeUnit>, StatusError> {
    collect(repo, &[])
}

/// Same as [`collect_changes`], restricted to the given pathspecs.
pub fn collect_changes_for_paths(
    repo: &Repository,
    paths: &[String],
) -> Result<Vec<ChangeUnit>, StatusError> {
    collect(repo, paths)
}

fn collect(repo: &Repository, paths: &[String]) -> Result<Vec<ChangeUnit>, StatusError> {
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = DiffOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    for p in paths {
        opts.pathspec(p);
    }

    let mut diff = repo
        .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))
        .map_err(StatusError::DiffFailed)?;

    let mut find = DiffFindOptions::new();
    find.renames(true).for_untracked(true);
    diff.find_similar(Some(&mut find))
        .map_err(StatusError::DiffFailed)?;

    let mut units = build_units(&diff)?;
    if units.is_empty() {
        return Err(StatusError::NoChanges);
    }

    units.sort_by(|a, b| a.path.cmp(&b.path));
    units.dedup_by(|a, b| a.path == b.path);

    debug!("Collected {} changed files", units.len());
    Ok(units)
}

fn build_units(diff: &Diff<'_>) -> Result<Vec<ChangeUnit>, StatusError> {
    let mut units = Vec::new();

    for idx in 0..diff.deltas().len() {
        let patch = Patch::from_diff(diff, idx).map_err(StatusError::DiffFailed)?;
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };

        let Some(kind) = change_kind(delta.status()) else {
            continue;
        };

        let new_path = path_string(delta.new_file().path());
        let old_path = path_string(delta.old_file().path());
        let path = match kind {
            ChangeKind::Deleted => old_path.clone().or(new_path),
            _ => new_path.or_else(|| old_path.clone()),
        };
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            continue;
        };

        let binary = is_binary(&delta);
        let mut unit = if binary {
            ChangeUnit::binary(path, kind)
        } else {
            let lines = match patch {
                Some(ref patch) => patch_lines(patch)?,
                None => Vec::new(),
            };
            ChangeUnit::new(path, kind).with_lines(lines)
        };

        if kind == ChangeKind::Renamed
            && let Some(old) = old_path
        {
            unit = unit.renamed_from(old);
        }

        units.push(unit);
    }

    Ok(units)
}

fn change_kind(status: Delta) -> Option<ChangeKind> {
    match status {
        Delta::Added | Delta::Untracked => Some(ChangeKind::Added),
        Delta::Deleted => Some(ChangeKind::Deleted),
        Delta::Renamed => Some(ChangeKind::Renamed),
        Delta::Modified | Delta::Typechange | Delta::Copied => Some(ChangeKind::Modified),
        _ => None,
    }
}

fn is_binary(delta: &DiffDelta<'_>) -> bool {
    delta.flags().is_binary() || delta.new_file().is_binary() || delta.old_file().is_binary()
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Added, removed and context lines of a patch, without line terminators.
fn patch_lines(patch: &Patch<'_>) -> Result<Vec<DiffLine>, StatusError> {
    let mut lines = Vec::new();

    for hunk in 0..patch.num_hunks() {
        let count = patch
            .num_lines_in_hunk(hunk)
            .map_err(StatusError::DiffFailed)?;
        for index in 0..count {
            let line = patch
                .line_in_hunk(hunk, index)
                .map_err(StatusError::DiffFailed)?;
            let content = String::from_utf8_lossy(line.content());
            let text = content.trim_end_matches(['\n', '\r']);
            match line.origin() {
                '+' => lines.push(DiffLine::added(text)),
                '-' => lines.push(DiffLine::removed(text)),
                ' ' => lines.push(DiffLine::context(text)),
                _ => {}
            }
        }
    }

    Ok(lines)
}
