//! # Image Sources and Streams
//!
//! An [`ImageSource`] is the finalized content of one artifact: a known
//! total size plus a factory for independent seekable readers. The registry
//! stores sources, never live readers, so every HTTP request gets its own
//! read position and dropping a reader never affects anyone else.
//!
//! Closing follows ownership: a reader is closed when it is dropped, and a
//! source releases its resources when the last `Arc` to it goes away.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::template::BaseTemplate;

/// A seekable byte stream that can move between threads.
pub trait ImageStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ImageStream for T {}

/// Finalized, re-openable artifact content.
pub trait ImageSource: Send + Sync + std::fmt::Debug {
    /// Total length of the content in bytes.
    fn size(&self) -> u64;

    /// Open a fresh reader positioned at offset zero.
    fn open(&self) -> io::Result<Box<dyn ImageStream>>;
}

/// Content held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    bytes: Arc<[u8]>,
}

impl MemoryImage {
    /// Wrap an in-memory byte buffer.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ImageSource for MemoryImage {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn ImageStream>> {
        Ok(Box::new(io::Cursor::new(Arc::clone(&self.bytes))))
    }
}

/// A base template followed by an in-memory trailer.
///
/// The template bytes are read lazily from the template on each open; only
/// the trailer is held in memory.
#[derive(Debug, Clone)]
pub struct AppendedImage {
    base: Arc<BaseTemplate>,
    trailer: Arc<[u8]>,
}

impl AppendedImage {
    /// Build an image that serves `base` followed by `trailer`.
    pub fn new(base: Arc<BaseTemplate>, trailer: impl Into<Arc<[u8]>>) -> Self {
        Self {
            base,
            trailer: trailer.into(),
        }
    }

    /// The template this image starts with.
    pub fn base(&self) -> &BaseTemplate {
        &self.base
    }

    /// Bytes served after the template.
    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }
}

impl ImageSource for AppendedImage {
    fn size(&self) -> u64 {
        self.base.size() + self.trailer.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn ImageStream>> {
        Ok(Box::new(AppendedReader {
            base: self.base.open()?,
            base_len: self.base.size(),
            base_pos: 0,
            trailer: Arc::clone(&self.trailer),
            pos: 0,
        }))
    }
}

/// Reader over `base ++ trailer`.
///
/// `base_pos` tracks where the underlying template reader actually is, so
/// the template is only re-seeked when the logical position moved.
struct AppendedReader {
    base: Box<dyn ImageStream>,
    base_len: u64,
    base_pos: u64,
    trailer: Arc<[u8]>,
    pos: u64,
}

impl AppendedReader {
    fn total_len(&self) -> u64 {
        self.base_len + self.trailer.len() as u64
    }
}

impl Read for AppendedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pos < self.base_len {
            if self.base_pos != self.pos {
                self.base.seek(SeekFrom::Start(self.pos))?;
                self.base_pos = self.pos;
            }
            let want = usize::try_from(self.base_len - self.pos)
                .unwrap_or(usize::MAX)
                .min(buf.len());
            let n = self.base.read(&mut buf[..want])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "base template is shorter than its recorded size",
                ));
            }
            self.pos += n as u64;
            self.base_pos += n as u64;
            return Ok(n);
        }

        let offset = self.pos - self.base_len;
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.trailer.len() {
            return Ok(0);
        }
        let remaining = &self.trailer[offset..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for AppendedReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.total_len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
