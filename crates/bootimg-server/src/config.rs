//! # Server Configuration
//!
//! Command-line flags, each with an environment fallback.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Serve composed boot images over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "bootimg-server", version, about)]
pub struct ServerArgs {
    /// Base ISO image the ISO artifacts are built from.
    #[arg(long, env = "DEPLOY_ISO")]
    pub deploy_iso: PathBuf,

    /// Base initramfs image the initrd artifacts are built from.
    #[arg(long, env = "DEPLOY_INITRD")]
    pub deploy_initrd: PathBuf,

    /// Externally reachable origin that image URLs are built from.
    #[arg(long, env = "IMAGE_BASE_URL")]
    pub base_url: String,

    /// Address to listen on.
    #[arg(long, env = "IMAGE_BIND_ADDR", default_value = "0.0.0.0:8084")]
    pub bind: SocketAddr,

    /// Directory of per-host configuration files to serve under static names.
    #[arg(long, env = "IMAGE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Do not expose `/metrics`.
    #[arg(long)]
    pub no_metrics: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
