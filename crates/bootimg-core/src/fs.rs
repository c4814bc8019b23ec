//! # Static File System Contract
//!
//! The narrow interface a generic HTTP static-file handler needs from a
//! backing store: open a file by path, stat a path, and list a directory.
//! Handlers built against this trait know nothing about how files are
//! produced.
//!
//! Closing a file is dropping it.

use std::io::{Read, Seek};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata for a file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Base name of the entry.
    pub name: String,
    /// Length in bytes; zero for directories.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl FileInfo {
    /// Metadata for a regular file.
    pub fn file(name: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
            is_dir: false,
        }
    }

    /// Metadata for a directory.
    pub fn directory(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            modified,
            is_dir: true,
        }
    }
}

/// Errors from a [`StaticFileSystem`].
#[derive(Error, Debug)]
pub enum FsError {
    /// Nothing exists at the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not offered by this file system.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// I/O failure while opening the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open file: a seekable reader with metadata.
pub trait StaticFile: Read + Seek + Send {
    /// Metadata captured when the file was opened.
    fn stat(&self) -> FileInfo;
}

/// A read-only file system that can back a static HTTP file handler.
pub trait StaticFileSystem: Send + Sync {
    /// The handle type returned by [`StaticFileSystem::open`].
    type File: StaticFile + 'static;

    /// Open the file at `path`.
    fn open(&self, path: &str) -> Result<Self::File, FsError>;

    /// Return metadata for `path`.
    fn stat(&self, path: &str) -> Result<FileInfo, FsError>;

    /// List the entries of the directory at `path`.
    fn read_dir(&self, _path: &str) -> Result<Vec<FileInfo>, FsError> {
        Err(FsError::Unsupported("directory listing"))
    }
}
