//! # Payload Digests
//!
//! SHA-256 digests of configuration payloads, retained alongside each
//! artifact for diagnostics.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
