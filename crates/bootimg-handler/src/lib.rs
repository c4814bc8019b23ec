//! # bootimg-handler — Image Registry and File System
//!
//! Registers composed boot images and exposes them for download.
//!
//! - [`registry`]: the token and artifact indices, with idempotent,
//!   at-most-once composition per logical name.
//! - [`filesystem`]: a flat, read-only [`bootimg_core::StaticFileSystem`]
//!   over the registry. Paths are tokens.
//! - [`handler`]: the [`ImageHandler`] facade used by callers.
//! - [`provider`]: derives image names from host identity and builds
//!   configuration payloads from network data.
//!
//! ## Crate Policy
//!
//! - Registry operations are synchronous and never block on I/O while the
//!   registry lock is held.
//! - Removing an image never interrupts a download already in progress.

pub mod filesystem;
pub mod handler;
pub mod provider;
pub mod registry;

pub use filesystem::{ImageFile, ImageFileSystem};
pub use handler::ImageHandler;
pub use provider::{
    image_key, ConfigBuilder, ImageData, ImageProvider, NetworkData, ProviderError,
};
pub use registry::{Artifact, ImageRegistry};
