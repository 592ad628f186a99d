//! Sorted-merge exclusion matching.

use std::path::{Path, PathBuf};

/// Answers "is this path under some exclusion root?" for a sequence of
/// queries issued in non-decreasing path order.
///
/// The cursor only advances for the lifetime of one archiving session:
/// once a root has been passed it can never cover a later query either,
/// so a whole walk costs O(visited paths + exclusion roots) comparisons
/// instead of their product.
#[derive(Debug, Default)]
pub struct ExcludeScanner {
    roots: Vec<PathBuf>,
    cursor: usize,
}

impl ExcludeScanner {
    /// `roots` must be sorted and prefix-free; [`crate::paths::normalize`]
    /// output qualifies. An empty list matches nothing.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots, cursor: 0 }
    }

    /// Queries must arrive in non-decreasing component order, the order a
    /// pre-order walk with sorted children produces.
    pub fn is_excluded(&mut self, path: &Path) -> bool {
        while let Some(root) = self.roots.get(self.cursor) {
            if path < root.as_path() {
                // Every earlier root is already exhausted and this one
                // sorts after the query, so nothing can cover it.
                return false;
            }
            if path.starts_with(root) {
                return true;
            }
            self.cursor += 1;
        }
        false
    }
}
