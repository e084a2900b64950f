#![deny(missing_docs)]

//! # autocrowd-core: Foundational Types for AutoCrowd
//!
//! Every other crate in the workspace depends on `autocrowd-core`; it depends
//! on nothing internal.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`CampaignId`] is not a
//!    [`MilestoneId`], and a backer is an [`Address`], never a bare string.
//!    String-based primitives validate at construction.
//!
//! 2. **Integer money.** [`Amount`] wraps a `u128` in the smallest currency
//!    unit. All arithmetic is checked; overflow is an error, not a wrap.
//!    Amounts serialize as decimal strings so JSON consumers never see a
//!    lossy float.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!    Voting windows and campaign deadlines compare timestamps directly.
//!
//! 4. **Content-addressed evidence.** [`EvidenceRef`] is either an external
//!    locator (IPFS CID, URL) or a [`ContentDigest`] of the evidence bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `autocrowd-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod digest;
pub mod error;
pub mod evidence;
pub mod identity;
pub mod temporal;

pub use amount::Amount;
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::ValidationError;
pub use evidence::EvidenceRef;
pub use identity::{Address, CampaignId, MilestoneId};
pub use temporal::Timestamp;
