//! # Image Handler
//!
//! The public entry point: register an image, remove it, and obtain the file
//! system that serves it. Holds no state of its own beyond a shared
//! [`ImageRegistry`]; clones share the same registry.

use std::sync::Arc;

use bootimg_core::{
    BaseUrl, Composer, CpioAppendComposer, ImageError, ImageFormat, LogicalName, Naming,
    TemplateStore,
};

use crate::filesystem::ImageFileSystem;
use crate::registry::ImageRegistry;

/// Serves composed boot images at stable URLs.
#[derive(Debug, Clone)]
pub struct ImageHandler {
    registry: Arc<ImageRegistry>,
    file_system: ImageFileSystem,
}

impl ImageHandler {
    /// Build a handler over `templates` that composes with `composer`.
    ///
    /// Fails with [`ImageError::Configuration`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(
        base_url: &str,
        templates: TemplateStore,
        composer: Arc<dyn Composer>,
    ) -> Result<Self, ImageError> {
        let base_url = BaseUrl::parse(base_url)?;
        let registry = Arc::new(ImageRegistry::new(base_url, templates, composer));
        Ok(Self {
            file_system: ImageFileSystem::new(Arc::clone(&registry)),
            registry,
        })
    }

    /// Build a handler using [`CpioAppendComposer`].
    pub fn with_default_composer(
        base_url: &str,
        templates: TemplateStore,
    ) -> Result<Self, ImageError> {
        Self::new(base_url, templates, Arc::new(CpioAppendComposer::new()))
    }

    /// Register an image and return the URL it can be fetched from.
    ///
    /// `format` picks the ISO or initramfs template. With
    /// [`Naming::Static`] the URL ends in `name` itself; with
    /// [`Naming::Dynamic`] it ends in an opaque token. Calling again with the
    /// same name returns the same URL without composing again.
    pub fn serve_image(
        &self,
        name: &str,
        config: &[u8],
        format: ImageFormat,
        naming: Naming,
    ) -> Result<String, ImageError> {
        let name = LogicalName::new(name)?;
        self.registry.register(&name, config, format, naming)
    }

    /// Stop serving `name`. Unknown names are ignored.
    pub fn remove_image(&self, name: &str) {
        self.registry.remove(name);
    }

    /// File system view of the registered images.
    pub fn file_system(&self) -> ImageFileSystem {
        self.file_system.clone()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<ImageRegistry> {
        &self.registry
    }
}
