//! # Image File System
//!
//! Presents the registry as a flat, read-only [`StaticFileSystem`] so that a
//! generic static-file HTTP handler can serve registered images without
//! knowing anything about tokens or composition.
//!
//! The namespace is exactly the set of registered tokens under a single
//! synthetic root directory. There are no subdirectories and directory
//! listing is unsupported.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use bootimg_core::{FileInfo, FsError, ImageError, ImageStream, StaticFile, StaticFileSystem};
use chrono::{DateTime, Utc};

use crate::registry::{Artifact, ImageRegistry};

/// Read-only file system view over an [`ImageRegistry`].
#[derive(Debug, Clone)]
pub struct ImageFileSystem {
    registry: Arc<ImageRegistry>,
    mounted_at: DateTime<Utc>,
}

impl ImageFileSystem {
    /// View `registry` as a file system.
    pub fn new(registry: Arc<ImageRegistry>) -> Self {
        Self {
            registry,
            mounted_at: Utc::now(),
        }
    }

    fn resolve(&self, path: &str) -> Result<Arc<Artifact>, FsError> {
        let token = path.strip_prefix('/').unwrap_or(path);
        if token.is_empty() || token.contains('/') {
            return Err(FsError::NotFound(path.to_string()));
        }
        self.registry.lookup(token).map_err(|err| match err {
            ImageError::NotFound(_) => FsError::NotFound(path.to_string()),
            other => FsError::Io(io::Error::new(io::ErrorKind::Other, other.to_string())),
        })
    }
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

fn file_info(artifact: &Artifact) -> FileInfo {
    FileInfo::file(
        artifact.token().as_str(),
        artifact.size(),
        artifact.created_at(),
    )
}

impl StaticFileSystem for ImageFileSystem {
    type File = ImageFile;

    fn open(&self, path: &str) -> Result<ImageFile, FsError> {
        let artifact = self.resolve(path)?;
        let reader = artifact.source().open()?;
        tracing::debug!(path, name = %artifact.name(), "image opened");
        Ok(ImageFile { artifact, reader })
    }

    fn stat(&self, path: &str) -> Result<FileInfo, FsError> {
        if is_root(path) {
            return Ok(FileInfo::directory("/", self.mounted_at));
        }
        self.resolve(path).map(|artifact| file_info(&artifact))
    }
}

/// An open handle on one registered image.
///
/// Each handle owns an independent reader. Dropping (or [`ImageFile::close`])
/// releases the handle only; the artifact stays registered.
pub struct ImageFile {
    artifact: Arc<Artifact>,
    reader: Box<dyn ImageStream>,
}

impl ImageFile {
    /// The artifact this handle reads.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Release the handle.
    pub fn close(self) {
        tracing::trace!(name = %self.artifact.name(), "image handle closed");
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("token", self.artifact.token())
            .field("size", &self.artifact.size())
            .finish()
    }
}

impl Read for ImageFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for ImageFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl StaticFile for ImageFile {
    fn stat(&self) -> FileInfo {
        file_info(&self.artifact)
    }
}
