//! Engine error type.

use autocrowd_core::CampaignId;
use autocrowd_state::CampaignError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors returned by [`CampaignEngine`](crate::CampaignEngine) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No campaign is registered under this id.
    #[error("{0} not found")]
    CampaignNotFound(CampaignId),

    /// The campaign rejected the operation.
    #[error(transparent)]
    Rejected(#[from] CampaignError),

    /// The ledger failed the transfer; nothing was committed.
    #[error("ledger transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    /// The campaign's rejection, if that is what this is.
    pub fn as_campaign_error(&self) -> Option<&CampaignError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Whether escrow bookkeeping has diverged.
    pub fn is_invariant_violation(&self) -> bool {
        self.as_campaign_error()
            .is_some_and(CampaignError::is_invariant_violation)
    }
}
