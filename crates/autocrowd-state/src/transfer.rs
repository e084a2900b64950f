//! # Transfer Instructions
//!
//! Outbound fund movements produced by the escrow. The campaign only
//! decides *that* funds move and how much; executing the movement is the
//! job of a ledger collaborator.

use autocrowd_core::{Address, Amount, CampaignId, MilestoneId};
use serde::{Deserialize, Serialize};

/// Why funds leave the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferKind {
    /// Allocation of an approved milestone, paid to the creator.
    MilestonePayout {
        /// The approved milestone.
        milestone: MilestoneId,
    },
    /// A backer's full contribution, returned after a failed campaign.
    Refund,
}

/// An instruction to move `amount` out of a campaign's escrow to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInstruction {
    /// The paying campaign.
    pub campaign: CampaignId,
    /// The receiving account.
    pub recipient: Address,
    /// Exact amount to move.
    pub amount: Amount,
    /// Payout or refund.
    #[serde(flatten)]
    pub kind: TransferKind,
}
