//! Filtered `.tar.gz` subtree archiving with a streamed SHA-256 digest.
//!
//! A caller supplies include roots (archived recursively) and exclude
//! roots (pruned, recursively). The include list is normalized, widened
//! with synthetic ancestor-directory entries, and walked in sorted order;
//! every visited path is checked against the sorted exclude list by a
//! monotonic-cursor merge scan. Surviving entries stream through a tar
//! writer, a gzip encoder and a SHA-256 tee in one pass, so the archive
//! and the digest of its compressed bytes come out together.

pub mod archive;
pub mod digest;
pub mod error;
pub mod exclude;
pub mod io_utils;
pub mod paths;
pub mod reader;

pub use archive::{produce_archive, Archiver, ListSide};
pub use digest::DigestWriter;
pub use error::ArchiveError;
pub use exclude::ExcludeScanner;
pub use paths::{add_predecessors, normalize, PathEntry};
pub use reader::read_path_list;
