use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Destination archive could not be created.
    #[error("cannot create archive at '{path}': {source}")]
    Create { path: String, source: io::Error },

    /// Header could not be constructed for an entry (e.g. unreadable
    /// symlink target).
    #[error("cannot make header for '{path}': {source}")]
    Header { path: String, source: io::Error },

    /// Header or file content could not be written to the archive stream.
    #[error("cannot write archive entry for '{path}': {source}")]
    Write { path: String, source: io::Error },

    /// A session operation was called out of phase.
    #[error("session error: {0}")]
    Session(String),

    /// One or more writers failed while closing the session.
    #[error("failed during closing writers: {0}")]
    Close(String),
}
