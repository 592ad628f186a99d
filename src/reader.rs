//! Line-oriented include/exclude list files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Read one path per line, whitespace-trimmed. Blank lines would become
/// bogus walk roots, so they are skipped at the source.
pub fn read_path_list<P: AsRef<Path>>(path: P) -> io::Result<Vec<PathBuf>> {
    let file = File::open(path)?;
    let mut paths = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }
    Ok(paths)
}
