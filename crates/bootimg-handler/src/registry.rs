//! # Image Registry
//!
//! The two-level index behind every served image:
//!
//! ```text
//! token ──(dynamic only)──▶ logical name ──▶ artifact
//! ```
//!
//! Static artifacts use their logical name as the token and have no entry in
//! the token index; lookups fall back to treating the token as a name.
//!
//! ## Concurrency
//!
//! Both indices live behind one `parking_lot::Mutex`. Registration is a
//! compare-and-insert: the name is marked [`Slot::Composing`] under the lock,
//! the composer runs with the lock released, and the result is committed
//! under the lock again. Concurrent registrations of the same name wait on a
//! condition variable for the in-flight one to settle, so the composer runs
//! at most once per logical name.
//!
//! Artifacts are handed out as `Arc<Artifact>`. Removing an artifact only
//! drops the registry's reference; open handles keep reading until they are
//! dropped, and the underlying source is released exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use bootimg_core::{
    sha256_hex, BaseUrl, Composer, ImageError, ImageFormat, ImageSource, LogicalName, Naming,
    TemplateStore, Token,
};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

/// A registered, servable image.
#[derive(Debug)]
pub struct Artifact {
    name: LogicalName,
    token: Token,
    format: ImageFormat,
    naming: Naming,
    config: Vec<u8>,
    config_digest: String,
    source: Arc<dyn ImageSource>,
    created_at: DateTime<Utc>,
}

impl Artifact {
    /// Logical name the artifact was registered under.
    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    /// URL path segment that resolves to this artifact.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Base template format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Whether the token is the literal name or a generated one.
    pub fn naming(&self) -> Naming {
        self.naming
    }

    /// Total size of the composed image in bytes.
    pub fn size(&self) -> u64 {
        self.source.size()
    }

    /// Configuration payload the image was composed with.
    pub fn config(&self) -> &[u8] {
        &self.config
    }

    /// SHA-256 hex digest of the configuration payload.
    pub fn config_digest(&self) -> &str {
        &self.config_digest
    }

    /// Composed content.
    pub fn source(&self) -> &Arc<dyn ImageSource> {
        &self.source
    }

    /// When the artifact was registered. Served as its modification time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Entry in the artifact index.
#[derive(Debug)]
enum Slot {
    /// A registration for this name is running the composer.
    Composing,
    /// The artifact is committed and servable.
    Ready(Arc<Artifact>),
}

#[derive(Debug, Default)]
struct RegistryState {
    tokens: HashMap<Token, LogicalName>,
    images: HashMap<LogicalName, Slot>,
}

impl RegistryState {
    fn ready_count(&self) -> usize {
        self.images
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// A dynamic token that collides with no current token or name.
    fn fresh_token(&self) -> Token {
        loop {
            let token = Token::generate();
            if !self.tokens.contains_key(token.as_str())
                && !self.images.contains_key(token.as_str())
            {
                return token;
            }
        }
    }
}

/// Thread-safe registry of composed images.
pub struct ImageRegistry {
    base_url: BaseUrl,
    templates: TemplateStore,
    composer: Arc<dyn Composer>,
    state: Mutex<RegistryState>,
    settled: Condvar,
}

impl std::fmt::Debug for ImageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRegistry")
            .field("base_url", &self.base_url)
            .field("templates", &self.templates)
            .field("images", &self.len())
            .finish()
    }
}

impl ImageRegistry {
    /// Create an empty registry.
    pub fn new(base_url: BaseUrl, templates: TemplateStore, composer: Arc<dyn Composer>) -> Self {
        Self {
            base_url,
            templates,
            composer,
            state: Mutex::new(RegistryState::default()),
            settled: Condvar::new(),
        }
    }

    /// Origin that artifact URLs are built from.
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Register `name` and return the URL it is served at.
    ///
    /// Idempotent: if `name` is already registered the existing URL is
    /// returned and the composer is not invoked. On composer failure nothing
    /// is stored.
    pub fn register(
        &self,
        name: &LogicalName,
        config: &[u8],
        format: ImageFormat,
        naming: Naming,
    ) -> Result<String, ImageError> {
        if naming == Naming::Static {
            name.ensure_path_segment()?;
        }

        {
            let mut state = self.state.lock();
            loop {
                match state.images.get(name) {
                    Some(Slot::Ready(artifact)) => {
                        tracing::debug!(%name, token = %artifact.token, "image already registered");
                        return Ok(self.base_url.join(&artifact.token));
                    }
                    Some(Slot::Composing) => self.settled.wait(&mut state),
                    None => break,
                }
            }
            // A live dynamic token would shadow the literal name in lookup.
            if naming == Naming::Static && state.tokens.contains_key(name.as_str()) {
                return Err(ImageError::InvalidName {
                    name: name.to_string(),
                    reason: "collides with a served token",
                });
            }
            state.images.insert(name.clone(), Slot::Composing);
        }

        let mut in_flight = InFlight {
            registry: self,
            name,
            committed: false,
        };

        let template = self.templates.get(format);
        let source = match self.composer.compose(template, config) {
            Ok(source) => source,
            Err(err) => {
                metrics::counter!("bootimg_composition_failures_total", "format" => format.as_str())
                    .increment(1);
                tracing::warn!(%name, %format, error = %err, "image composition failed");
                return Err(err.into());
            }
        };
        metrics::counter!("bootimg_compositions_total", "format" => format.as_str()).increment(1);

        let mut state = self.state.lock();
        let token = match naming {
            Naming::Static => Token::literal(name),
            Naming::Dynamic => state.fresh_token(),
        };
        let artifact = Arc::new(Artifact {
            name: name.clone(),
            token: token.clone(),
            format,
            naming,
            config_digest: sha256_hex(config),
            config: config.to_vec(),
            source,
            created_at: Utc::now(),
        });
        if naming == Naming::Dynamic {
            state.tokens.insert(token.clone(), name.clone());
        }
        tracing::info!(
            %name,
            %token,
            %format,
            %naming,
            size = artifact.size(),
            config_digest = %artifact.config_digest,
            "image registered"
        );
        state.images.insert(name.clone(), Slot::Ready(artifact));
        metrics::gauge!("bootimg_images_registered").set(state.ready_count() as f64);
        in_flight.committed = true;
        drop(state);
        self.settled.notify_all();

        Ok(self.base_url.join(&token))
    }

    /// Remove `name`, returning whether an artifact was removed.
    ///
    /// Unknown names are a no-op. A registration of the same name that is
    /// still composing is waited for and then removed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.lock();
            while matches!(state.images.get(name), Some(Slot::Composing)) {
                self.settled.wait(&mut state);
            }
            let removed = match state.images.remove(name) {
                Some(Slot::Ready(artifact)) => {
                    if artifact.naming == Naming::Dynamic {
                        state.tokens.remove(artifact.token.as_str());
                    }
                    Some(artifact)
                }
                Some(Slot::Composing) | None => None,
            };
            metrics::gauge!("bootimg_images_registered").set(state.ready_count() as f64);
            removed
        };

        // The registry's reference is dropped outside the lock; the source is
        // released once the last open handle goes away.
        match removed {
            Some(artifact) => {
                tracing::info!(%name, token = %artifact.token, "image removed");
                true
            }
            None => {
                tracing::debug!(%name, "remove of unregistered image ignored");
                false
            }
        }
    }

    /// Resolve a URL token to its artifact.
    ///
    /// Dynamic tokens resolve through the token index. Anything else is
    /// tried as a literal logical name, which only matches static artifacts,
    /// so a dynamic artifact is never reachable by its name.
    pub fn lookup(&self, token: &str) -> Result<Arc<Artifact>, ImageError> {
        let state = self.state.lock();
        let (name, indexed) = match state.tokens.get(token) {
            Some(name) => (name.as_str(), true),
            None => (token, false),
        };
        match state.images.get(name) {
            Some(Slot::Ready(artifact)) if indexed || artifact.naming == Naming::Static => {
                Ok(Arc::clone(artifact))
            }
            _ => Err(ImageError::NotFound(token.to_string())),
        }
    }

    /// Number of servable artifacts.
    pub fn len(&self) -> usize {
        self.state.lock().ready_count()
    }

    /// Whether no artifact is servable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clears an uncommitted in-flight marker, including when the composer
/// panics, and wakes any waiters.
struct InFlight<'a> {
    registry: &'a ImageRegistry,
    name: &'a LogicalName,
    committed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        {
            let mut state = self.registry.state.lock();
            if matches!(state.images.get(self.name), Some(Slot::Composing)) {
                state.images.remove(self.name);
            }
        }
        self.registry.settled.notify_all();
    }
}
