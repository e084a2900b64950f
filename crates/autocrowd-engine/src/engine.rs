//! # Campaign Engine
//!
//! Owns every campaign and serializes mutations to each one.
//!
//! ## Locking
//!
//! The registry is a `parking_lot::RwLock<HashMap<CampaignId, Arc<Mutex<Campaign>>>>`.
//! Operations take the read lock only long enough to clone the campaign's
//! handle, then hold that campaign's mutex for the whole
//! read-validate-transfer-commit sequence. Two operations on the same
//! campaign (and therefore on the same milestone) are linearized; operations
//! on different campaigns run in parallel.
//!
//! ## Commit protocol
//!
//! 1. Read the clock once.
//! 2. Apply the transition to a scratch copy of the campaign.
//! 3. If it produced a transfer, hand it to the [`FundLedger`].
//! 4. Replace the stored campaign with the scratch copy.
//! 5. Notify observers, then release the lock.
//!
//! A failure in step 2 or 3 returns before step 4, so the stored campaign
//! is untouched. Observers run while the campaign is locked, so they see
//! each campaign's transitions in commit order and must not call back into
//! the engine for the same campaign.

use std::collections::HashMap;
use std::sync::Arc;

use autocrowd_core::{Address, Amount, CampaignId, EvidenceRef, MilestoneId, Timestamp};
use autocrowd_state::{
    Ballot, Campaign, CampaignError, CampaignParams, Contribution, Milestone, MilestonePlan,
    MilestoneTransitionRecord, Settlement, TransferInstruction, VerificationVerdict,
};
use parking_lot::{Mutex, RwLock};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ledger::FundLedger;
use crate::notify::{MilestoneEvent, MilestoneObserver};

type CampaignHandle = Arc<Mutex<Campaign>>;

/// The side effects an operation result carries out of the lock.
trait Effects {
    fn transfer(&self) -> Option<&TransferInstruction> {
        None
    }

    fn transition(&self) -> Option<&MilestoneTransitionRecord> {
        None
    }
}

impl Effects for Contribution {}
impl Effects for MilestoneId {}
impl Effects for Ballot {}

impl Effects for MilestoneTransitionRecord {
    fn transition(&self) -> Option<&MilestoneTransitionRecord> {
        Some(self)
    }
}

impl Effects for Settlement {
    fn transfer(&self) -> Option<&TransferInstruction> {
        self.transfer.as_ref()
    }

    fn transition(&self) -> Option<&MilestoneTransitionRecord> {
        Some(&self.transition)
    }
}

impl Effects for TransferInstruction {
    fn transfer(&self) -> Option<&TransferInstruction> {
        Some(self)
    }
}

/// Registry and coordinator for all campaigns.
pub struct CampaignEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn FundLedger>,
    campaigns: RwLock<HashMap<CampaignId, CampaignHandle>>,
    observers: RwLock<Vec<Arc<dyn MilestoneObserver>>>,
}

impl std::fmt::Debug for CampaignEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignEngine")
            .field("config", &self.config)
            .field("campaigns", &self.campaigns.read().len())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl CampaignEngine {
    /// Create an engine with no campaigns and no observers.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, ledger: Arc<dyn FundLedger>) -> Self {
        Self {
            config,
            clock,
            ledger,
            campaigns: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an observer for milestone events.
    pub fn add_observer(&self, observer: Arc<dyn MilestoneObserver>) {
        self.observers.write().push(observer);
    }

    // ── Factory ──────────────────────────────────────────────────────

    /// Create and register a campaign.
    pub fn create_campaign(&self, params: CampaignParams) -> Result<CampaignId, EngineError> {
        let id = CampaignId::new();
        let now = self.clock.now();
        let campaign = Campaign::create(id, params, now).map_err(|e| {
            self.log_rejection(id, "create campaign", &e);
            EngineError::Rejected(e)
        })?;
        tracing::info!(
            campaign = %id,
            creator = %campaign.creator(),
            goal = %campaign.goal(),
            milestones = campaign.milestones().len(),
            "campaign created"
        );
        self.campaigns
            .write()
            .insert(id, Arc::new(Mutex::new(campaign)));
        Ok(id)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot of a campaign.
    pub fn campaign(&self, id: CampaignId) -> Result<Campaign, EngineError> {
        Ok(self.handle(id)?.lock().clone())
    }

    /// Snapshot of one milestone.
    pub fn milestone(&self, id: CampaignId, milestone: MilestoneId) -> Result<Milestone, EngineError> {
        let handle = self.handle(id)?;
        let campaign = handle.lock();
        campaign.milestone(milestone).cloned().ok_or(EngineError::Rejected(
            CampaignError::UnknownMilestone {
                campaign: id,
                milestone,
            },
        ))
    }

    /// Ids of all registered campaigns, sorted.
    pub fn campaign_ids(&self) -> Vec<CampaignId> {
        let mut ids: Vec<_> = self.campaigns.read().keys().copied().collect();
        ids.sort();
        ids
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Deposit funds into a campaign.
    pub fn contribute(
        &self,
        id: CampaignId,
        backer: Address,
        amount: Amount,
    ) -> Result<Contribution, EngineError> {
        let record = self.transact(id, "contribute", |c, now| c.contribute(backer, amount, now))?;
        tracing::debug!(
            campaign = %id,
            backer = %record.backer,
            amount = %amount,
            cumulative = %record.amount,
            "contribution received"
        );
        Ok(record)
    }

    /// Append a milestone to a campaign. Owner only.
    pub fn append_milestone(
        &self,
        id: CampaignId,
        caller: &Address,
        plan: MilestonePlan,
    ) -> Result<MilestoneId, EngineError> {
        let milestone = self.transact(id, "append milestone", |c, _| c.append_milestone(caller, plan))?;
        tracing::info!(campaign = %id, milestone = %milestone, "milestone appended");
        Ok(milestone)
    }

    /// Submit or resubmit milestone evidence. Owner only.
    pub fn submit_evidence(
        &self,
        id: CampaignId,
        caller: &Address,
        milestone: MilestoneId,
        evidence: EvidenceRef,
    ) -> Result<MilestoneTransitionRecord, EngineError> {
        self.transact(id, "submit evidence", |c, now| {
            c.submit_evidence(caller, milestone, evidence, now)
        })
    }

    /// Deliver an external verification verdict.
    pub fn deliver_verdict(
        &self,
        id: CampaignId,
        milestone: MilestoneId,
        verdict: VerificationVerdict,
    ) -> Result<Settlement, EngineError> {
        let period = self.config.voting_period_secs;
        self.transact(id, "deliver verdict", |c, now| {
            c.deliver_verdict(milestone, verdict, now, period)
        })
    }

    /// Cast a contribution-weighted vote.
    pub fn cast_vote(
        &self,
        id: CampaignId,
        voter: Address,
        milestone: MilestoneId,
        approve: bool,
    ) -> Result<Ballot, EngineError> {
        let ballot = self.transact(id, "vote", |c, now| c.cast_vote(voter, milestone, approve, now))?;
        tracing::debug!(
            campaign = %id,
            milestone = %milestone,
            voter = %ballot.voter,
            approve = ballot.approve,
            weight = %ballot.weight,
            round = ballot.round,
            "vote recorded"
        );
        Ok(ballot)
    }

    /// Close a milestone's vote after its window.
    pub fn finalize(&self, id: CampaignId, milestone: MilestoneId) -> Result<Settlement, EngineError> {
        self.transact(id, "finalize", |c, now| c.finalize(milestone, now))
    }

    /// Refund a backer of a campaign that ended short of its goal.
    pub fn refund(&self, id: CampaignId, backer: &Address) -> Result<TransferInstruction, EngineError> {
        self.transact(id, "refund", |c, now| c.refund(backer, now))
    }

    // ── Internals ────────────────────────────────────────────────────

    fn handle(&self, id: CampaignId) -> Result<CampaignHandle, EngineError> {
        self.campaigns
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::CampaignNotFound(id))
    }

    fn transact<R, F>(&self, id: CampaignId, operation: &'static str, f: F) -> Result<R, EngineError>
    where
        R: Effects,
        F: FnOnce(&mut Campaign, Timestamp) -> Result<R, CampaignError>,
    {
        let handle = self.handle(id)?;
        let now = self.clock.now();

        let mut stored = handle.lock();
        let mut scratch = stored.clone();
        let result = f(&mut scratch, now).map_err(|e| {
            self.log_rejection(id, operation, &e);
            EngineError::Rejected(e)
        })?;

        if let Some(transfer) = result.transfer() {
            self.ledger.execute(transfer).map_err(|e| {
                tracing::warn!(
                    campaign = %id,
                    operation,
                    recipient = %transfer.recipient,
                    amount = %transfer.amount,
                    error = %e,
                    "ledger rejected transfer; nothing committed"
                );
                EngineError::Ledger(e)
            })?;
            tracing::info!(
                campaign = %id,
                recipient = %transfer.recipient,
                amount = %transfer.amount,
                kind = ?transfer.kind,
                "funds transferred"
            );
        }

        *stored = scratch;

        let event = result.transition().map(|t| {
            tracing::info!(
                campaign = %id,
                milestone = %t.milestone,
                from = %t.from_state,
                to = %t.to_state,
                round = t.round,
                "milestone transition"
            );
            MilestoneEvent {
                campaign: id,
                transition: t.clone(),
                transfer: result.transfer().cloned(),
            }
        });
        // Delivered under the campaign lock so observers see one
        // milestone's transitions in commit order.
        if let Some(event) = event {
            self.notify(&event);
        }
        Ok(result)
    }

    fn notify(&self, event: &MilestoneEvent) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.milestone_changed(event);
        }
    }

    fn log_rejection(&self, id: CampaignId, operation: &'static str, error: &CampaignError) {
        if error.is_invariant_violation() {
            tracing::error!(
                campaign = %id,
                operation,
                error = %error,
                "escrow bookkeeping invariant violated"
            );
        } else {
            tracing::warn!(campaign = %id, operation, error = %error, "operation rejected");
        }
    }
}
