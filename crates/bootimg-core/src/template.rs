//! # Base Template Store
//!
//! The two immutable base images (ISO and initramfs) every artifact is
//! composed from. Templates are inspected once at startup so that their size
//! is known up front, and they hand out a fresh reader on every `open()`.
//! An exhausted reader is never reused across registrations.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::format::ImageFormat;
use crate::stream::ImageStream;

#[derive(Debug, Clone)]
enum TemplateSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// One immutable base image.
#[derive(Debug, Clone)]
pub struct BaseTemplate {
    format: ImageFormat,
    size: u64,
    source: TemplateSource,
}

impl BaseTemplate {
    /// Load a template from disk, recording its size.
    pub fn from_path(format: ImageFormat, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| ConfigError::MissingTemplate {
            format,
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ConfigError::NotAFile {
                format,
                path: path.to_path_buf(),
            });
        }
        tracing::info!(
            %format,
            path = %path.display(),
            size = metadata.len(),
            "loaded base template"
        );
        Ok(Self {
            format,
            size: metadata.len(),
            source: TemplateSource::File(path.to_path_buf()),
        })
    }

    /// Build a template from an in-memory buffer.
    pub fn from_bytes(format: ImageFormat, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            format,
            size: bytes.len() as u64,
            source: TemplateSource::Memory(bytes),
        }
    }

    /// Which format this template provides.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Size in bytes recorded at load time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// On-disk location, for file-backed templates.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            TemplateSource::File(path) => Some(path),
            TemplateSource::Memory(_) => None,
        }
    }

    /// Open a fresh reader at offset zero.
    pub fn open(&self) -> io::Result<Box<dyn ImageStream>> {
        match &self.source {
            TemplateSource::File(path) => Ok(Box::new(File::open(path)?)),
            TemplateSource::Memory(bytes) => Ok(Box::new(io::Cursor::new(Arc::clone(bytes)))),
        }
    }
}

/// The ISO and initramfs templates, one per format.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    iso: Arc<BaseTemplate>,
    initrd: Arc<BaseTemplate>,
}

impl TemplateStore {
    /// Pair two templates, checking each sits in the right slot.
    pub fn new(iso: BaseTemplate, initrd: BaseTemplate) -> Result<Self, ConfigError> {
        for (expected, template) in [(ImageFormat::Iso, &iso), (ImageFormat::Initrd, &initrd)] {
            if template.format() != expected {
                return Err(ConfigError::FormatMismatch {
                    expected,
                    actual: template.format(),
                });
            }
        }
        Ok(Self {
            iso: Arc::new(iso),
            initrd: Arc::new(initrd),
        })
    }

    /// Load both templates from disk.
    pub fn load(
        iso_path: impl AsRef<Path>,
        initrd_path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            BaseTemplate::from_path(ImageFormat::Iso, iso_path)?,
            BaseTemplate::from_path(ImageFormat::Initrd, initrd_path)?,
        )
    }

    /// The template for `format`.
    pub fn get(&self, format: ImageFormat) -> &Arc<BaseTemplate> {
        match format {
            ImageFormat::Iso => &self.iso,
            ImageFormat::Initrd => &self.initrd,
        }
    }
}
