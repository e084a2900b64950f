//! # Evidence References
//!
//! A milestone submission points at its evidence; the evidence itself lives
//! outside the escrow (IPFS, object storage, a repository). The reference is
//! opaque to the state machine beyond basic well-formedness.

use serde::{Deserialize, Serialize};

use crate::digest::{sha256_digest, ContentDigest};
use crate::error::ValidationError;

/// A reference to milestone evidence: an IPFS CID, a URL, or a
/// `sha256:<hex>` content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvidenceRef(String);

impl EvidenceRef {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 512;

    /// Validate an evidence reference.
    ///
    /// Must be non-empty after trimming, at most [`Self::MAX_LEN`] bytes and
    /// contain no whitespace or control characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.len() > Self::MAX_LEN
            || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ValidationError::InvalidEvidenceRef(s));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Reference evidence by the SHA-256 digest of its bytes.
    pub fn from_content(bytes: &[u8]) -> Self {
        Self::from_digest(&sha256_digest(bytes))
    }

    /// Reference evidence by a precomputed digest.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self(digest.to_string())
    }

    /// The reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EvidenceRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EvidenceRef> for String {
    fn from(value: EvidenceRef) -> Self {
        value.0
    }
}
