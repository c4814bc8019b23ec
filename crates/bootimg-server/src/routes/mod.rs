//! # Route Modules
//!
//! - `files`: image downloads from any `StaticFileSystem`.
//! - `metrics`: Prometheus text exposition.

pub mod files;
pub mod metrics;
