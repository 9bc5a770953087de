//! Opaque user identities and the admin password digest

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Opaque per-browser identity token
///
/// Always a UUID v4 in canonical hyphenated form. The core only relies on
/// the same caller presenting the same value for the lifetime of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Issue a fresh identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a presented token only if it is a well-formed UUID
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(|uuid| Self(uuid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 hex digest of the admin password
///
/// The admin cookie carries this digest, never the password itself.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"songflow-admin:");
    hasher.update(password.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Compare two digests without early exit
pub fn digest_matches(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
