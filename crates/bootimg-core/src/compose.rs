//! # Artifact Composer
//!
//! A [`Composer`] combines a base template with a configuration payload
//! into finalized, re-openable image content. The registry invokes it once
//! per logical name at registration time and never at fetch time.
//!
//! [`CpioAppendComposer`] is the stock implementation: it serves the
//! template unchanged and appends a newc cpio archive carrying the payload.

use std::sync::Arc;

use crate::cpio::{newc_archive, CpioEntry};
use crate::error::ComposeError;
use crate::stream::{AppendedImage, ImageSource};
use crate::template::BaseTemplate;

/// Combines a base template and a configuration payload.
pub trait Composer: Send + Sync {
    /// Produce the finalized content for one artifact.
    fn compose(
        &self,
        template: &Arc<BaseTemplate>,
        config: &[u8],
    ) -> Result<Arc<dyn ImageSource>, ComposeError>;
}

impl<F> Composer for F
where
    F: Fn(&Arc<BaseTemplate>, &[u8]) -> Result<Arc<dyn ImageSource>, ComposeError> + Send + Sync,
{
    fn compose(
        &self,
        template: &Arc<BaseTemplate>,
        config: &[u8],
    ) -> Result<Arc<dyn ImageSource>, ComposeError> {
        self(template, config)
    }
}

/// Default file name for the embedded configuration.
pub const DEFAULT_CONFIG_FILE: &str = "config.ign";

/// Appends the payload as a single-file newc cpio archive after the template.
#[derive(Debug, Clone)]
pub struct CpioAppendComposer {
    file_name: String,
    mode: u32,
}

impl CpioAppendComposer {
    /// Composer that embeds the payload as `config.ign` with mode 0644.
    pub fn new() -> Self {
        Self {
            file_name: DEFAULT_CONFIG_FILE.to_string(),
            mode: 0o644,
        }
    }

    /// Use a different file name inside the appended archive.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Use different permission bits for the embedded file.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for CpioAppendComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer for CpioAppendComposer {
    fn compose(
        &self,
        template: &Arc<BaseTemplate>,
        config: &[u8],
    ) -> Result<Arc<dyn ImageSource>, ComposeError> {
        if self.file_name.is_empty() {
            return Err(ComposeError::Rejected(
                "embedded file name must not be empty".to_string(),
            ));
        }
        if u32::try_from(config.len()).is_err() {
            return Err(ComposeError::Rejected(format!(
                "payload of {} bytes exceeds the cpio size limit",
                config.len()
            )));
        }

        // A template that can no longer be opened fails registration.
        template
            .open()
            .map_err(|source| ComposeError::TemplateUnavailable {
                format: template.format(),
                source,
            })?;

        // The archive must start on a 4-byte boundary of the whole image.
        let padding = ((4 - template.size() % 4) % 4) as usize;
        let mut trailer = vec![0u8; padding];
        trailer.extend_from_slice(&newc_archive(&[CpioEntry {
            name: &self.file_name,
            mode: self.mode,
            data: config,
        }]));
        tracing::debug!(
            format = %template.format(),
            base_size = template.size(),
            trailer_size = trailer.len(),
            "composed image"
        );
        Ok(Arc::new(AppendedImage::new(Arc::clone(template), trailer)))
    }
}
