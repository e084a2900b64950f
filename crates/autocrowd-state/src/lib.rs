//! # autocrowd-state: Milestone Escrow State Machines
//!
//! Implements the milestone lifecycle and the campaign escrow it drives.
//!
//! ## State Machines
//!
//! - **Milestone** (`milestone.rs`):
//!   `Pending → Submitted → (Approved | Rejected | Voting)`,
//!   `Voting → Approved | Rejected`, and `Rejected → Submitted` on
//!   resubmission. `Approved` is terminal.
//!
//! - **Campaign** (`campaign.rs`): owns its milestones, the contribution
//!   ledger, and the escrow counters. Every milestone transition goes
//!   through a campaign method, which performs authorization, fund checks
//!   and bookkeeping.
//!
//! ## Design
//!
//! Milestones use an enum with validated transitions rather than typestate:
//! a milestone lives inside a campaign's `Vec`, is selected by id at runtime,
//! and its next state depends on runtime inputs (verdicts, tallies), so the
//! state cannot be known at compile time.
//!
//! Transitions are pure functions of `(state, input, now)`. Each operation
//! validates every guard before touching any field, so a rejected call
//! leaves the campaign exactly as it was. Time is an explicit parameter;
//! nothing in this crate reads the clock.

pub mod campaign;
pub mod error;
pub mod milestone;
pub mod transfer;
pub mod verdict;

pub use campaign::{Campaign, CampaignParams, Contribution, MilestonePlan, Settlement};
pub use error::CampaignError;
pub use milestone::{Ballot, Milestone, MilestoneState, MilestoneTransitionRecord, VoteTally};
pub use transfer::{TransferInstruction, TransferKind};
pub use verdict::{Verdict, VerificationVerdict};
