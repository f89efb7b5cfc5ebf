//! Key hashing
//!
//! Maps arbitrary keys to fixed-width lowercase hex names that are safe to
//! use as file names. Not a security boundary.

use sha2::{Digest, Sha256};

/// Width of a hashed key in hex characters.
pub const HASHED_KEY_LEN: usize = 32;

/// Returns the first 16 bytes of the SHA-256 digest of `key`, hex encoded.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();

    format!("{:x}", hash)[..HASHED_KEY_LEN].to_string()
}
