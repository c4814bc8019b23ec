//! # Image Formats and Naming Modes
//!
//! The two base template formats the service can compose from, and the two
//! ways a registered artifact can be addressed in a URL.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boot image format. Selects which base template an artifact is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Bootable ISO 9660 image.
    Iso,
    /// Initial RAM filesystem image.
    Initrd,
}

impl ImageFormat {
    /// All supported formats.
    pub const ALL: [ImageFormat; 2] = [ImageFormat::Iso, ImageFormat::Initrd];

    /// Return the canonical string representation of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::Initrd => "initrd",
        }
    }

    /// File extension used for statically named artifacts of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::Initrd => "initramfs",
        }
    }

    /// Whether this is the initramfs format.
    pub fn is_initramfs(&self) -> bool {
        matches!(self, Self::Initrd)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format string that names no supported image format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported image format {0:?}")]
pub struct UnsupportedFormat(pub String);

impl FromStr for ImageFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iso" => Ok(Self::Iso),
            "initrd" | "initramfs" => Ok(Self::Initrd),
            other => Err(UnsupportedFormat(other.to_string())),
        }
    }
}

/// How a registered artifact is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Naming {
    /// The URL path segment is the logical name itself.
    Static,
    /// The URL path segment is a generated, unguessable token.
    #[default]
    Dynamic,
}

impl Naming {
    /// Return the string representation of this naming mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for Naming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("iso".parse::<ImageFormat>().unwrap(), ImageFormat::Iso);
        assert_eq!("initrd".parse::<ImageFormat>().unwrap(), ImageFormat::Initrd);
        assert_eq!(
            "initramfs".parse::<ImageFormat>().unwrap(),
            ImageFormat::Initrd
        );
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "qcow2".parse::<ImageFormat>().unwrap_err();
        assert_eq!(err, UnsupportedFormat("qcow2".into()));
    }

    #[test]
    fn extension_differs_from_key_string_for_initrd() {
        assert_eq!(ImageFormat::Initrd.as_str(), "initrd");
        assert_eq!(ImageFormat::Initrd.extension(), "initramfs");
        assert_eq!(ImageFormat::Iso.extension(), "iso");
    }

    #[test]
    fn naming_defaults_to_dynamic() {
        assert_eq!(Naming::default(), Naming::Dynamic);
    }
}
