//! Content fingerprint used as the notebook identity oracle.
//!
//! SHA-256 over the UTF-8 bytes of the code, lowercase hex. The browser
//! client computes the same digest with `crypto.subtle`, so stores on both
//! sides agree on identity.

use sha2::{Digest, Sha256};

/// Length of a rendered fingerprint in hex characters.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Computes the content fingerprint of `code`.
pub fn fingerprint(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Returns whether `value` has the shape of a fingerprint.
pub fn is_valid_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_HEX_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
