//! # Application State
//!
//! Shared state for the Axum application. Holds the image handler and, when
//! metrics are enabled, the Prometheus handle used to render `/metrics`.

use bootimg_handler::ImageHandler;
use metrics_exporter_prometheus::PrometheusHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registers and serves images.
    pub images: ImageHandler,
    /// Renders the metrics endpoint. `None` disables `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("images", &self.images)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// State with metrics disabled.
    pub fn new(images: ImageHandler) -> Self {
        Self {
            images,
            metrics: None,
        }
    }

    /// Expose `/metrics` rendered from `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
