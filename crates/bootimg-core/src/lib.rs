//! # bootimg-core — Foundational Types for Boot Image Serving
//!
//! This crate defines the vocabulary shared by the image registry and the
//! HTTP layer. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identities.** `LogicalName`, `Token` and
//!    `BaseUrl` are validated newtypes. No bare strings cross the registry
//!    boundary.
//!
//! 2. **Re-openable image content.** An [`ImageSource`] hands out a fresh,
//!    independent reader on every `open()`, so concurrent fetches of the same
//!    artifact never share a read position.
//!
//! 3. **Composition is pluggable.** The registry only sees the [`Composer`]
//!    trait. [`CpioAppendComposer`] is the default implementation.
//!
//! 4. **Flat static file system.** [`fs::StaticFileSystem`] is the narrow
//!    contract a generic HTTP file handler needs: open by path, stat, and an
//!    explicitly unsupported directory listing.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bootimg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod compose;
pub mod cpio;
pub mod digest;
pub mod error;
pub mod format;
pub mod fs;
pub mod identity;
pub mod stream;
pub mod template;

// Re-export primary types for ergonomic imports.
pub use compose::{Composer, CpioAppendComposer};
pub use digest::sha256_hex;
pub use error::{ComposeError, ConfigError, ImageError};
pub use format::{ImageFormat, Naming};
pub use fs::{FileInfo, FsError, StaticFile, StaticFileSystem};
pub use identity::{BaseUrl, LogicalName, Token};
pub use stream::{AppendedImage, ImageSource, ImageStream, MemoryImage};
pub use template::{BaseTemplate, TemplateStore};
