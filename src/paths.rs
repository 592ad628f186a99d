//! Include/exclude path list preparation.
//!
//! Both sides of the policy go through [`normalize`]; the include side is
//! then widened by [`add_predecessors`] so every archived path has its
//! parent directories recorded in the output.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// One root the archive walk must consider.
///
/// `recursive` entries are walked; non-recursive entries are synthetic
/// ancestor directories that get a header and nothing else, so unrelated
/// siblings under them are never pulled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub path: PathBuf,
    pub recursive: bool,
}

/// Sort, deduplicate and collapse a raw path list.
///
/// A path strictly inside an earlier kept path is dropped, so the result
/// is prefix-free: `/opt` absorbs `/opt/oss` but never `/opt2`.
/// Containment is tested per path component, and component order clusters
/// every descendant directly behind its ancestor, so one left-to-right
/// pass against the last kept path suffices.
pub fn normalize(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths.dedup();
    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        match kept.last() {
            Some(ancestor) if path.starts_with(ancestor) => {}
            _ => kept.push(path),
        }
    }
    kept
}

/// Inject every missing ancestor of the recursive entries, up to but
/// excluding the filesystem root, as non-recursive entries; re-sorts the
/// combined list.
///
/// An empty ancestor is also a stop condition, so the loop terminates for
/// relative paths too.
pub fn add_predecessors(entries: &mut Vec<PathEntry>) {
    let mut ancestors: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in entries.iter().filter(|e| e.recursive) {
        for parent in entry.path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() || is_root(parent) {
                break;
            }
            ancestors.insert(parent.to_path_buf());
        }
    }
    for path in ancestors {
        entries.push(PathEntry {
            path,
            recursive: false,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
}

fn is_root(path: &Path) -> bool {
    let mut components = path.components();
    matches!(components.next(), Some(Component::RootDir)) && components.next().is_none()
}
