//! # bootimg-server — HTTP Front End for Boot Images
//!
//! Serves the images registered with a [`bootimg_handler::ImageHandler`] at
//! `<base_url>/<token>`.
//!
//! ## API Surface
//!
//! | Path                 | Module                 | Purpose                      |
//! |----------------------|------------------------|------------------------------|
//! | `/{token}`           | [`routes::files`]      | Image download (GET, HEAD)   |
//! | `/health/liveness`   | this module            | Liveness probe               |
//! | `/health/readiness`  | this module            | Readiness probe              |
//! | `/metrics`           | [`routes::metrics`]    | Prometheus exposition        |
//!
//! Fixed routes take precedence over tokens, so a static image named
//! `metrics` is not reachable while metrics are enabled.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::http::Uri;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::files::router(state.images.file_system()));

    if let Some(handle) = state.metrics {
        router = router.merge(routes::metrics::router(handle));
    }

    router
        .fallback(not_found)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: templates are loaded before the listener binds, so a
/// running server is ready.
async fn readiness() -> &'static str {
    "ready"
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
