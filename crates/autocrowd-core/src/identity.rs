//! # Identity Newtypes
//!
//! Identifiers for campaigns, milestones and account holders. Each is a
//! distinct type: you cannot pass a [`MilestoneId`] where a [`CampaignId`]
//! is expected.
//!
//! ## Validation
//!
//! [`Address`] validates its format at construction and normalizes to
//! lowercase, so two spellings of the same account compare equal.
//! [`CampaignId`] is UUID-based and valid by construction. [`MilestoneId`]
//! is the milestone's position in its campaign; whether it refers to an
//! existing milestone is checked by the campaign.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

/// A unique identifier for a crowdfunding campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignId(Uuid);

impl CampaignId {
    /// Create a new random campaign identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a campaign identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "campaign:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Milestone
// ---------------------------------------------------------------------------

/// Zero-based position of a milestone within its campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(u32);

impl MilestoneId {
    /// Wrap a milestone index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The milestone index as a `usize`, for slice access.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// The raw index value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "milestone:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address in `0x`-prefixed hex form.
///
/// Identifies creators and backers. Stored lowercase; the `0x` prefix is
/// required and mixed-case input is accepted without checksum validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Number of hex digits after the `0x` prefix.
    pub const HEX_LEN: usize = 40;

    /// Parse and normalize an address.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = s.as_ref().trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAddress(raw.to_string()))?;
        if hex.len() != Self::HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// The normalized `0x`-prefixed lowercase form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn address_normalizes_to_lowercase() {
        let a = Address::parse(ALICE).unwrap();
        assert_eq!(a.as_str(), "0x52908400098527886e0f7030069857d2e4169ee7");
        assert_eq!(a, Address::parse(ALICE.to_lowercase()).unwrap());
    }

    #[test]
    fn address_accepts_uppercase_prefix_and_padding() {
        let a = Address::parse("  0X52908400098527886e0f7030069857d2e4169ee7 ").unwrap();
        assert_eq!(a.as_str(), "0x52908400098527886e0f7030069857d2e4169ee7");
    }

    #[test]
    fn address_rejects_missing_prefix() {
        let err = Address::parse("52908400098527886e0f7030069857d2e4169ee7").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAddress(_)));
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse(format!("{ALICE}00")).is_err());
    }

    #[test]
    fn address_rejects_non_hex() {
        assert!(Address::parse("0xz2908400098527886e0f7030069857d2e4169ee7").is_err());
    }

    #[test]
    fn address_serde_validates() {
        let json = format!("\"{ALICE}\"");
        let a: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            "\"0x52908400098527886e0f7030069857d2e4169ee7\""
        );
        assert!(serde_json::from_str::<Address>("\"0xnope\"").is_err());
    }

    #[test]
    fn campaign_ids_are_unique() {
        assert_ne!(CampaignId::new(), CampaignId::new());
    }

    #[test]
    fn campaign_id_display_is_prefixed() {
        let id = CampaignId::from_uuid(Uuid::nil());
        assert_eq!(
            id.to_string(),
            "campaign:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn milestone_id_index() {
        let m = MilestoneId::new(3);
        assert_eq!(m.index(), 3);
        assert_eq!(m.to_string(), "milestone:3");
        assert_eq!(serde_json::to_string(&m).unwrap(), "3");
    }
}
