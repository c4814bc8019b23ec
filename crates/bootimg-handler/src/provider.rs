//! # Image Provider
//!
//! Adapts host-provisioning requests onto the [`ImageHandler`]. A host is
//! identified by its namespace, name and UID; together with the target
//! architecture and format these form the logical image name, so repeated
//! requests for the same host reuse one composed image.
//!
//! The configuration payload itself is produced by a [`ConfigBuilder`] from
//! the host's network data. Provider images are always served under opaque
//! tokens.

use std::collections::BTreeMap;

use bootimg_core::{ImageError, ImageFormat, Naming};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handler::ImageHandler;

/// Boxed error returned by a [`ConfigBuilder`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-host network configuration, keyed by kind (e.g. `nmstate`).
pub type NetworkData = BTreeMap<String, Vec<u8>>;

/// Identity of the host an image is built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub architecture: String,
    pub format: ImageFormat,
}

/// Logical image name for a host: `{namespace}-{name}-{uid}-{arch}.{format}`.
pub fn image_key(data: &ImageData) -> String {
    format!(
        "{}-{}-{}-{}.{}",
        data.namespace, data.name, data.uid, data.architecture, data.format
    )
}

/// Produces the configuration payload embedded in a host's image.
pub trait ConfigBuilder: Send + Sync {
    fn build(&self, network_data: &NetworkData) -> Result<Vec<u8>, BoxError>;
}

impl<F> ConfigBuilder for F
where
    F: Fn(&NetworkData) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn build(&self, network_data: &NetworkData) -> Result<Vec<u8>, BoxError> {
        self(network_data)
    }
}

/// Errors from the provider layer.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The configuration payload could not be built.
    #[error("building image configuration: {0}")]
    Config(#[source] BoxError),

    /// Registering the image failed.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Builds and discards per-host boot images.
pub struct ImageProvider {
    handler: ImageHandler,
    builder: Box<dyn ConfigBuilder>,
}

impl std::fmt::Debug for ImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProvider")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl ImageProvider {
    pub fn new(handler: ImageHandler, builder: impl ConfigBuilder + 'static) -> Self {
        Self {
            handler,
            builder: Box::new(builder),
        }
    }

    /// Whether images can be built in `format`. Only `iso` and `initrd`.
    pub fn supports_format(&self, format: &str) -> bool {
        ImageFormat::ALL.iter().any(|f| f.as_str() == format)
    }

    /// Whether images can be built for `architecture`. Always true.
    pub fn supports_architecture(&self, _architecture: &str) -> bool {
        true
    }

    /// Build (or reuse) the image for `data` and return its URL.
    pub fn build_image(
        &self,
        data: &ImageData,
        network_data: &NetworkData,
    ) -> Result<String, ProviderError> {
        let config = self
            .builder
            .build(network_data)
            .map_err(ProviderError::Config)?;
        let key = image_key(data);
        let url = self
            .handler
            .serve_image(&key, &config, data.format, Naming::Dynamic)?;
        tracing::info!(key = %key, "host image ready");
        Ok(url)
    }

    /// Stop serving the image for `data`.
    pub fn discard_image(&self, data: &ImageData) -> Result<(), ProviderError> {
        self.handler.remove_image(&image_key(data));
        Ok(())
    }

    pub fn handler(&self) -> &ImageHandler {
        &self.handler
    }
}
