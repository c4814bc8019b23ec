//! # Server Bootstrap
//!
//! Builds the image handler from [`ServerArgs`]:
//!
//! 1. **Load base templates.** Both must exist and be regular files.
//! 2. **Validate the base URL.**
//! 3. **Register static configurations.** When a configuration directory is
//!    given, each regular, non-hidden file `<host>.<ext>` is served as
//!    `<host>.iso` and `<host>.initramfs`, with the file's contents as the
//!    payload.
//!
//! Any failure here is fatal.

use std::path::{Path, PathBuf};

use bootimg_core::{ConfigError, ImageError, ImageFormat, Naming, TemplateStore};
use bootimg_handler::ImageHandler;

use crate::config::ServerArgs;

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Base templates are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The image handler could not be built.
    #[error("building image handler: {0}")]
    Handler(#[from] ImageError),

    /// A static configuration could not be registered.
    #[error("registering {path}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    /// The configuration directory could not be read.
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load templates, build the handler and register any static configurations.
pub fn bootstrap(args: &ServerArgs) -> Result<ImageHandler, BootstrapError> {
    let templates = TemplateStore::load(&args.deploy_iso, &args.deploy_initrd)?;
    let handler = ImageHandler::with_default_composer(&args.base_url, templates)?;
    tracing::info!(base_url = %handler.registry().base_url(), "image handler ready");

    if let Some(dir) = &args.config_dir {
        let count = register_static_configs(&handler, dir)?;
        tracing::info!(dir = %dir.display(), count, "static configurations registered");
    }

    Ok(handler)
}

/// Register every configuration file in `dir` under static names.
///
/// Returns the number of files registered. Files are processed in name
/// order.
pub fn register_static_configs(
    handler: &ImageHandler,
    dir: &Path,
) -> Result<usize, BootstrapError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let file_type = entry.file_type().map_err(io_error(&entry.path()))?;
        if hidden || !file_type.is_file() {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    for path in &paths {
        let Some(host) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let config = std::fs::read(path).map_err(io_error(path))?;
        for format in ImageFormat::ALL {
            let name = format!("{host}.{}", format.extension());
            let url = handler
                .serve_image(&name, &config, format, Naming::Static)
                .map_err(|source| BootstrapError::Register {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!(file = %path.display(), %url, "serving static image");
        }
    }

    Ok(paths.len())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BootstrapError {
    let path = path.to_path_buf();
    move |source| BootstrapError::Io { path, source }
}
