//! # Campaign Error Types
//!
//! Every rejected operation maps to exactly one variant, carrying the ids,
//! state and amounts needed to diagnose it. Rejections are synchronous and
//! final: nothing is retried here, and a rejected call has mutated nothing.
//!
//! Two variants are not ordinary guard failures: [`CampaignError::InsufficientFunds`]
//! and [`CampaignError::ArithmeticOverflow`] mean the escrow counters and the
//! milestone allocations have diverged. [`CampaignError::is_invariant_violation`]
//! lets callers alert on them separately.

use autocrowd_core::{Address, Amount, CampaignId, EvidenceRef, MilestoneId, Timestamp};
use thiserror::Error;

use crate::milestone::MilestoneState;

/// Errors arising from campaign and milestone operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CampaignError {
    /// The milestone's current state does not permit the operation.
    #[error("{milestone} is {state}; cannot {operation}")]
    InvalidState {
        /// The milestone.
        milestone: MilestoneId,
        /// Its current state.
        state: MilestoneState,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The caller lacks the role the operation requires.
    #[error("{caller} is not authorized to {operation}: {reason}")]
    Unauthorized {
        /// The calling address.
        caller: Address,
        /// The attempted operation.
        operation: &'static str,
        /// Which role was missing.
        reason: &'static str,
    },

    /// The voter already has a ballot on this milestone in the current round.
    #[error("{voter} already voted on {milestone} (round {round})")]
    AlreadyVoted {
        /// The voter.
        voter: Address,
        /// The milestone.
        milestone: MilestoneId,
        /// The voting round.
        round: u32,
    },

    /// The voting window has closed; votes are no longer accepted.
    #[error("voting on {milestone} closed at {deadline}")]
    VotingWindowClosed {
        /// The milestone.
        milestone: MilestoneId,
        /// The window's last open instant.
        deadline: Timestamp,
    },

    /// The voting window is still open; the vote cannot be finalized yet.
    #[error("voting on {milestone} is open until {deadline}")]
    VotingWindowOpen {
        /// The milestone.
        milestone: MilestoneId,
        /// The window's last open instant.
        deadline: Timestamp,
    },

    /// A verdict was delivered for evidence other than the current round's.
    #[error("verdict on {milestone} covers {received}, but the submitted evidence is {expected}")]
    EvidenceMismatch {
        /// The milestone.
        milestone: MilestoneId,
        /// The evidence under review.
        expected: EvidenceRef,
        /// The evidence the verdict names.
        received: EvidenceRef,
    },

    /// The escrow does not hold enough to cover an outbound transfer.
    #[error("{campaign} holds {held} but {requested} is required")]
    InsufficientFunds {
        /// The campaign.
        campaign: CampaignId,
        /// The amount that had to be transferred.
        requested: Amount,
        /// The escrow balance at the time.
        held: Amount,
    },

    /// No milestone with this id exists in the campaign.
    #[error("{campaign} has no {milestone}")]
    UnknownMilestone {
        /// The campaign.
        campaign: CampaignId,
        /// The requested milestone.
        milestone: MilestoneId,
    },

    /// Milestone allocations would exceed the campaign goal.
    #[error("milestone allocations {allocated} exceed goal {goal}")]
    AllocationExceedsGoal {
        /// Sum of allocations including the offending milestone.
        allocated: Amount,
        /// The campaign goal.
        goal: Amount,
    },

    /// The campaign is not accepting contributions.
    #[error("{campaign} is not accepting contributions: {reason}")]
    CampaignInactive {
        /// The campaign.
        campaign: CampaignId,
        /// Why (not started, ended, goal reached).
        reason: &'static str,
    },

    /// An amount that must be positive was zero.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Start/end times do not form a valid funding window.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Refund conditions are not met.
    #[error("refund unavailable for {campaign}: {reason}")]
    RefundUnavailable {
        /// The campaign.
        campaign: CampaignId,
        /// Which condition failed.
        reason: &'static str,
    },

    /// The backer has no contribution left to refund.
    #[error("{backer} has nothing to refund")]
    NothingToRefund {
        /// The backer.
        backer: Address,
    },

    /// A counter would overflow or underflow.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

impl CampaignError {
    /// Whether this error indicates the escrow counters have diverged from
    /// the milestone allocations, as opposed to a caller supplying a bad
    /// request.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. } | Self::ArithmeticOverflow(_)
        )
    }
}
