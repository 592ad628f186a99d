//! Archive session: writer stack, filtered walk, ordered close, digest.
//!
//! One [`Archiver`] is one single-threaded archiving session. The writer
//! stack is destination → [`DigestWriter`] → gzip encoder → tar builder,
//! so the digest covers the compressed bytes. The walk visits the sorted,
//! expanded include list in order, which is what lets the exclusion
//! cursor advance monotonically.

use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header, HeaderMode};
use walkdir::WalkDir;

use crate::digest::DigestWriter;
use crate::error::ArchiveError;
use crate::exclude::ExcludeScanner;
use crate::paths::{self, PathEntry};

/// Which side of the include/exclude policy a path list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSide {
    Include,
    Exclude,
}

/// Session lifecycle; operations called out of phase fail fast instead of
/// silently no-opping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Expanded,
    Archived,
    Closed,
}

/// One archiving session over a destination writer.
pub struct Archiver<W: Write> {
    tar: Option<Builder<GzEncoder<DigestWriter<W>>>>,
    include_roots: Vec<PathBuf>,
    exclude_roots: Vec<PathBuf>,
    entries: Vec<PathEntry>,
    scanner: ExcludeScanner,
    phase: Phase,
    digest: Option<String>,
}

impl Archiver<File> {
    /// Open the destination file and the full writer stack. Failure here
    /// is fatal; nothing has been written yet.
    pub fn create<P: AsRef<Path>>(dest: P) -> Result<Self, ArchiveError> {
        let dest = dest.as_ref();
        let file = File::create(dest).map_err(|source| ArchiveError::Create {
            path: dest.display().to_string(),
            source,
        })?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> Archiver<W> {
    /// Build a session over an arbitrary writer.
    pub fn from_writer(dest: W) -> Self {
        let encoder = GzEncoder::new(DigestWriter::new(dest), Compression::default());
        Self {
            tar: Some(Builder::new(encoder)),
            include_roots: Vec::new(),
            exclude_roots: Vec::new(),
            entries: Vec::new(),
            scanner: ExcludeScanner::default(),
            phase: Phase::Loading,
            digest: None,
        }
    }

    /// Accumulate raw roots for one side of the policy. May be called any
    /// number of times before [`Archiver::add_predecessors`].
    pub fn load_paths<I, P>(&mut self, roots: I, side: ListSide) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.phase != Phase::Loading {
            return Err(ArchiveError::Session(
                "load_paths called after path expansion".to_string(),
            ));
        }
        let bucket = match side {
            ListSide::Include => &mut self.include_roots,
            ListSide::Exclude => &mut self.exclude_roots,
        };
        bucket.extend(roots.into_iter().map(Into::into));
        Ok(())
    }

    /// Normalize both sides and widen the include list with synthetic
    /// ancestor entries; freezes the path lists for the walk.
    pub fn add_predecessors(&mut self) -> Result<(), ArchiveError> {
        if self.phase != Phase::Loading {
            return Err(ArchiveError::Session(
                "add_predecessors called out of the loading phase".to_string(),
            ));
        }
        self.entries = paths::normalize(std::mem::take(&mut self.include_roots))
            .into_iter()
            .map(|path| PathEntry {
                path,
                recursive: true,
            })
            .collect();
        paths::add_predecessors(&mut self.entries);
        self.scanner = ExcludeScanner::new(paths::normalize(std::mem::take(
            &mut self.exclude_roots,
        )));
        self.phase = Phase::Expanded;
        Ok(())
    }

    /// Walk the expanded include list in order and write every surviving
    /// entry. Per-entry stat failures are logged and skipped; a failed
    /// header or content write aborts the whole operation.
    pub fn archive(&mut self) -> Result<(), ArchiveError> {
        if self.phase != Phase::Expanded {
            return Err(ArchiveError::Session(
                "archive requires an expanded, unconsumed session".to_string(),
            ));
        }
        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            if entry.recursive {
                self.walk_subtree(&entry.path)?;
            } else {
                self.append_placeholder(&entry.path)?;
            }
        }
        self.phase = Phase::Archived;
        Ok(())
    }

    /// Finish the tar stream, then the gzip stream, then flush the
    /// destination, in that order. Every stage is attempted regardless of
    /// earlier failures; failures are logged individually and reported as
    /// one aggregate error.
    pub fn close(&mut self) -> Result<(), ArchiveError> {
        let Some(mut tar) = self.tar.take() else {
            return Err(ArchiveError::Session("close called twice".to_string()));
        };
        self.phase = Phase::Closed;
        let mut failures: Vec<String> = Vec::new();
        if let Err(err) = tar.finish() {
            eprintln!("closing tar stream: {err}");
            failures.push(format!("tar stream: {err}"));
        }
        // finish() marks the stream done even when it fails, so into_inner
        // will not retry the trailer write.
        match tar.into_inner() {
            Ok(encoder) => match encoder.finish() {
                Ok(mut tee) => {
                    if let Err(err) = tee.flush() {
                        eprintln!("flushing destination: {err}");
                        failures.push(format!("destination: {err}"));
                    }
                    let (_dest, digest) = tee.into_parts();
                    self.digest = Some(digest);
                }
                Err(err) => {
                    eprintln!("closing gzip stream: {err}");
                    failures.push(format!("gzip stream: {err}"));
                }
            },
            Err(err) => {
                eprintln!("closing tar stream: {err}");
                failures.push(format!("tar stream: {err}"));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Close(failures.join("; ")))
        }
    }

    /// Hex-encoded SHA-256 of the compressed bytes. `None` until the
    /// session has been closed and the destination finalized.
    pub fn digest_hex(&self) -> Option<&str> {
        match self.phase {
            Phase::Closed => self.digest.as_deref(),
            _ => None,
        }
    }

    fn walk_subtree(&mut self, root: &Path) -> Result<(), ArchiveError> {
        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    eprintln!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            let file_type = entry.file_type();
            if !keeps_entry_type(file_type) || self.scanner.is_excluded(entry.path()) {
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    eprintln!("skipping '{}': {err}", entry.path().display());
                    continue;
                }
            };
            self.write_entry(entry.path(), &meta, true)?;
        }
        Ok(())
    }

    /// A synthetic ancestor: header only, never content, even if the path
    /// turns out to be a regular file.
    fn append_placeholder(&mut self, path: &Path) -> Result<(), ArchiveError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                eprintln!("skipping '{}': {err}", path.display());
                return Ok(());
            }
        };
        if !keeps_entry_type(meta.file_type()) || self.scanner.is_excluded(path) {
            return Ok(());
        }
        self.write_entry(path, &meta, false)
    }

    fn write_entry(
        &mut self,
        path: &Path,
        meta: &Metadata,
        with_content: bool,
    ) -> Result<(), ArchiveError> {
        let name = archive_name(path);
        let tar = self.tar.as_mut().ok_or_else(|| {
            ArchiveError::Session("write attempted on a closed session".to_string())
        })?;
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(meta, HeaderMode::Complete);
        let file_type = meta.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|source| ArchiveError::Header {
                path: path.display().to_string(),
                source,
            })?;
            tar.append_link(&mut header, &name, &target)
                .map_err(|source| ArchiveError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
        } else if with_content && file_type.is_file() {
            let mut reader = File::open(path).map_err(|source| ArchiveError::Write {
                path: path.display().to_string(),
                source,
            })?;
            tar.append_data(&mut header, &name, &mut reader)
                .map_err(|source| ArchiveError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
        } else {
            if file_type.is_file() {
                // Placeholder file entry: announce zero content so the
                // stream stays well formed.
                header.set_size(0);
            }
            tar.append_data(&mut header, &name, io::empty())
                .map_err(|source| ArchiveError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Build `dest` from include/exclude roots in one pass and return the hex
/// SHA-256 of the compressed bytes. The session is closed on every exit
/// path; a walk failure still runs the full close sequence.
pub fn produce_archive(
    includes: &[PathBuf],
    excludes: &[PathBuf],
    dest: &Path,
) -> Result<String, ArchiveError> {
    let mut session = Archiver::create(dest)?;
    session.load_paths(includes.iter().cloned(), ListSide::Include)?;
    session.load_paths(excludes.iter().cloned(), ListSide::Exclude)?;
    session.add_predecessors()?;
    let walked = session.archive();
    let closed = session.close();
    walked?;
    closed?;
    session
        .digest_hex()
        .map(str::to_owned)
        .ok_or_else(|| ArchiveError::Session("digest unavailable after close".to_string()))
}

/// Tar member names are relative; the leading root separator is stripped
/// the way tar itself strips it.
fn archive_name(path: &Path) -> PathBuf {
    match path.strip_prefix(MAIN_SEPARATOR_STR) {
        Ok(stripped) if stripped.as_os_str().is_empty() => PathBuf::from("."),
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Devices, sockets and FIFOs never get a tar entry.
fn keeps_entry_type(file_type: fs::FileType) -> bool {
    file_type.is_dir() || file_type.is_file() || file_type.is_symlink()
}
