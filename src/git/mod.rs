//! Git operations using git2-rs.

pub mod status;

pub use status::{collect_changes, collect_changes_for_paths};
