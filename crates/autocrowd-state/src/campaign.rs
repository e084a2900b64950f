//! # Campaign Escrow
//!
//! A campaign owns its milestones and the escrow bookkeeping they drive:
//! backer contributions, the held balance, payouts and refunds.
//!
//! ## Counters
//!
//! | Counter    | Contribution | Payout | Refund |
//! |------------|--------------|--------|--------|
//! | `raised`   | +            | −      | −      |
//! | `held`     | +            | −      | −      |
//! | `released` |              | +      |        |
//!
//! `total_raised()` is `raised + released`, the gross amount raised net of
//! refunds. Goal checks compare against it, so paying out a milestone never
//! makes a funded campaign look underfunded.
//!
//! ## Atomicity
//!
//! Every operation evaluates all of its guards before touching any field.
//! A returned error means the campaign is exactly as it was.

use std::collections::BTreeMap;

use autocrowd_core::{Address, Amount, CampaignId, EvidenceRef, MilestoneId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::CampaignError;
use crate::milestone::{Ballot, Milestone, MilestoneState, MilestoneTransitionRecord};
use crate::transfer::{TransferInstruction, TransferKind};
use crate::verdict::{Verdict, VerificationVerdict};

/// A milestone as proposed by the creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestonePlan {
    /// What will be delivered.
    pub description: String,
    /// Amount released on approval.
    pub amount: Amount,
    /// Delivery deadline.
    pub deadline: Timestamp,
}

/// Parameters for creating a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParams {
    /// The campaign owner and payout recipient.
    pub creator: Address,
    /// Funding goal.
    pub goal: Amount,
    /// First instant contributions are accepted.
    pub start_time: Timestamp,
    /// Last instant contributions are accepted.
    pub end_time: Timestamp,
    /// Initial milestones. More may be appended later.
    pub milestones: Vec<MilestonePlan>,
}

/// A backer's cumulative deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// The backer.
    pub backer: Address,
    /// Cumulative amount; zeroed by a refund.
    pub amount: Amount,
    /// When the backer last contributed.
    pub last_contributed_at: Timestamp,
    /// Whether the contribution was refunded.
    pub refunded: bool,
}

/// Outcome of an operation that may move a milestone into a decided state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// The milestone state change.
    pub transition: MilestoneTransitionRecord,
    /// The payout, present iff the milestone was approved.
    pub transfer: Option<TransferInstruction>,
}

impl Settlement {
    /// The state the milestone ended in.
    pub fn state(&self) -> MilestoneState {
        self.transition.to_state
    }
}

/// Counter values after a payout, computed before anything is mutated.
struct Release {
    amount: Amount,
    raised: Amount,
    held: Amount,
    released: Amount,
}

/// A milestone-gated crowdfunding campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    id: CampaignId,
    creator: Address,
    goal: Amount,
    raised: Amount,
    held: Amount,
    released: Amount,
    start_time: Timestamp,
    end_time: Timestamp,
    active: bool,
    milestones: Vec<Milestone>,
    contributions: BTreeMap<Address, Contribution>,
    created_at: Timestamp,
}

impl Campaign {
    /// Create a campaign.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the goal or any milestone amount is zero.
    /// - `InvalidSchedule` unless `end_time > start_time`.
    /// - `AllocationExceedsGoal` if the milestone amounts sum above the goal.
    pub fn create(
        id: CampaignId,
        params: CampaignParams,
        now: Timestamp,
    ) -> Result<Self, CampaignError> {
        if params.goal.is_zero() {
            return Err(CampaignError::InvalidAmount("goal must be positive".into()));
        }
        if params.end_time <= params.start_time {
            return Err(CampaignError::InvalidSchedule(format!(
                "end {} is not after start {}",
                params.end_time, params.start_time
            )));
        }
        if params.milestones.iter().any(|m| m.amount.is_zero()) {
            return Err(CampaignError::InvalidAmount(
                "milestone amount must be positive".into(),
            ));
        }
        let allocated = Amount::checked_sum(params.milestones.iter().map(|m| m.amount))
            .map_err(|_| CampaignError::ArithmeticOverflow("milestone allocations"))?;
        if allocated > params.goal {
            return Err(CampaignError::AllocationExceedsGoal {
                allocated,
                goal: params.goal,
            });
        }

        let milestones = params
            .milestones
            .into_iter()
            .enumerate()
            .map(|(i, plan)| {
                let index = u32::try_from(i)
                    .map_err(|_| CampaignError::ArithmeticOverflow("milestone index"))?;
                Ok(Milestone::new(
                    MilestoneId::new(index),
                    plan.description,
                    plan.amount,
                    plan.deadline,
                ))
            })
            .collect::<Result<Vec<_>, CampaignError>>()?;

        Ok(Self {
            id,
            creator: params.creator,
            goal: params.goal,
            raised: Amount::ZERO,
            held: Amount::ZERO,
            released: Amount::ZERO,
            start_time: params.start_time,
            end_time: params.end_time,
            active: true,
            milestones,
            contributions: BTreeMap::new(),
            created_at: now,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Campaign id.
    pub fn id(&self) -> CampaignId {
        self.id
    }

    /// The owner and payout recipient.
    pub fn creator(&self) -> &Address {
        &self.creator
    }

    /// Funding goal.
    pub fn goal(&self) -> Amount {
        self.goal
    }

    /// Outstanding raised counter: contributions minus payouts and refunds.
    pub fn raised(&self) -> Amount {
        self.raised
    }

    /// Escrow balance.
    pub fn held(&self) -> Amount {
        self.held
    }

    /// Cumulative amount paid to the creator.
    pub fn released(&self) -> Amount {
        self.released
    }

    /// Gross amount raised net of refunds.
    pub fn total_raised(&self) -> Amount {
        self.raised.saturating_add(self.released)
    }

    /// Funding window start.
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Funding window end.
    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    /// When the campaign was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether the goal has been reached.
    pub fn goal_reached(&self) -> bool {
        self.total_raised() >= self.goal
    }

    /// Whether contributions are accepted at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.active && self.start_time <= now && now <= self.end_time
    }

    /// Milestones in id order.
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Look up a milestone.
    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.get(id.index())
    }

    /// Sum of all milestone allocations.
    pub fn allocated(&self) -> Amount {
        self.milestones
            .iter()
            .fold(Amount::ZERO, |acc, m| acc.saturating_add(m.amount()))
    }

    /// A backer's contribution record.
    pub fn contribution(&self, backer: &Address) -> Option<&Contribution> {
        self.contributions.get(backer)
    }

    /// A backer's current contribution, zero if none.
    pub fn contribution_of(&self, backer: &Address) -> Amount {
        self.contributions
            .get(backer)
            .map_or(Amount::ZERO, |c| c.amount)
    }

    /// All contribution records, ordered by backer address.
    pub fn contributions(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.values()
    }

    /// Whether `backer` has voted on `milestone` in its current round.
    pub fn has_voted(&self, milestone: MilestoneId, backer: &Address) -> bool {
        self.milestone(milestone)
            .is_some_and(|m| m.has_voted(backer))
    }

    // ── Authorization ────────────────────────────────────────────────

    /// Check that `caller` owns the campaign.
    pub fn authorize_owner(
        &self,
        caller: &Address,
        operation: &'static str,
    ) -> Result<(), CampaignError> {
        if caller != &self.creator {
            return Err(CampaignError::Unauthorized {
                caller: caller.clone(),
                operation,
                reason: "caller is not the campaign owner",
            });
        }
        Ok(())
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Deposit `amount` from `backer`.
    ///
    /// Returns the backer's updated record. Reaching the goal closes the
    /// campaign to further contributions.
    pub fn contribute(
        &mut self,
        backer: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Contribution, CampaignError> {
        if amount.is_zero() {
            return Err(CampaignError::InvalidAmount(
                "contribution must be positive".into(),
            ));
        }
        let reason = if now < self.start_time {
            Some("campaign has not started")
        } else if now > self.end_time {
            Some("campaign has ended")
        } else if !self.active {
            Some("goal reached")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CampaignError::CampaignInactive {
                campaign: self.id,
                reason,
            });
        }

        let raised = self
            .raised
            .checked_add(amount)
            .ok_or(CampaignError::ArithmeticOverflow("raised"))?;
        let held = self
            .held
            .checked_add(amount)
            .ok_or(CampaignError::ArithmeticOverflow("held"))?;
        let cumulative = self
            .contribution_of(&backer)
            .checked_add(amount)
            .ok_or(CampaignError::ArithmeticOverflow("contribution"))?;

        let record = Contribution {
            backer: backer.clone(),
            amount: cumulative,
            last_contributed_at: now,
            refunded: false,
        };
        self.raised = raised;
        self.held = held;
        self.contributions.insert(backer, record.clone());
        if self.goal_reached() {
            self.active = false;
        }
        Ok(record)
    }

    /// Append a milestone. Only the owner may append.
    pub fn append_milestone(
        &mut self,
        caller: &Address,
        plan: MilestonePlan,
    ) -> Result<MilestoneId, CampaignError> {
        self.authorize_owner(caller, "append milestone")?;
        if plan.amount.is_zero() {
            return Err(CampaignError::InvalidAmount(
                "milestone amount must be positive".into(),
            ));
        }
        let allocated = Amount::checked_sum(
            self.milestones
                .iter()
                .map(Milestone::amount)
                .chain(std::iter::once(plan.amount)),
        )
        .map_err(|_| CampaignError::ArithmeticOverflow("milestone allocations"))?;
        if allocated > self.goal {
            return Err(CampaignError::AllocationExceedsGoal {
                allocated,
                goal: self.goal,
            });
        }
        let index = u32::try_from(self.milestones.len())
            .map_err(|_| CampaignError::ArithmeticOverflow("milestone index"))?;
        let id = MilestoneId::new(index);
        self.milestones
            .push(Milestone::new(id, plan.description, plan.amount, plan.deadline));
        Ok(id)
    }

    /// Submit or resubmit evidence for a milestone. Only the owner may submit.
    pub fn submit_evidence(
        &mut self,
        caller: &Address,
        milestone: MilestoneId,
        evidence: EvidenceRef,
        now: Timestamp,
    ) -> Result<MilestoneTransitionRecord, CampaignError> {
        self.authorize_owner(caller, "submit evidence")?;
        let idx = self.milestone_index(milestone)?;
        self.milestones[idx].ensure_accepts_evidence()?;
        Ok(self.milestones[idx].submit_evidence(evidence, now))
    }

    /// Apply an external verification verdict to a submitted milestone.
    ///
    /// An `Uncertain` verdict opens voting until `now + voting_period_secs`.
    /// An `Approved` verdict pays out the allocation. The verdict must name
    /// the evidence submitted in the current round.
    pub fn deliver_verdict(
        &mut self,
        milestone: MilestoneId,
        verdict: VerificationVerdict,
        now: Timestamp,
        voting_period_secs: u64,
    ) -> Result<Settlement, CampaignError> {
        let idx = self.milestone_index(milestone)?;
        self.milestones[idx].ensure_state(MilestoneState::Submitted, "deliver verdict")?;
        self.milestones[idx].ensure_evidence(verdict.evidence())?;

        match verdict.verdict() {
            Verdict::Approved => {
                let release = self.plan_release(idx)?;
                let transition = self.milestones[idx].apply_verdict(verdict, None, now);
                let transfer = self.commit_release(idx, release, now);
                Ok(Settlement {
                    transition,
                    transfer: Some(transfer),
                })
            }
            Verdict::Rejected => Ok(Settlement {
                transition: self.milestones[idx].apply_verdict(verdict, None, now),
                transfer: None,
            }),
            Verdict::Uncertain => {
                let deadline = now
                    .checked_add_secs(voting_period_secs)
                    .ok_or(CampaignError::ArithmeticOverflow("voting deadline"))?;
                Ok(Settlement {
                    transition: self.milestones[idx].apply_verdict(verdict, Some(deadline), now),
                    transfer: None,
                })
            }
        }
    }

    /// Cast a contribution-weighted vote on a milestone under vote.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        milestone: MilestoneId,
        approve: bool,
        now: Timestamp,
    ) -> Result<Ballot, CampaignError> {
        let idx = self.milestone_index(milestone)?;
        let weight = self.contribution_of(&voter);
        self.milestones[idx].cast_vote(voter, approve, weight, now)
    }

    /// Close a milestone's vote once its window has passed.
    pub fn finalize(
        &mut self,
        milestone: MilestoneId,
        now: Timestamp,
    ) -> Result<Settlement, CampaignError> {
        let idx = self.milestone_index(milestone)?;
        let outcome = self.milestones[idx].ensure_finalizable(now)?;
        if outcome == MilestoneState::Approved {
            let release = self.plan_release(idx)?;
            let transition = self.milestones[idx].close_vote(outcome, now);
            let transfer = self.commit_release(idx, release, now);
            return Ok(Settlement {
                transition,
                transfer: Some(transfer),
            });
        }
        Ok(Settlement {
            transition: self.milestones[idx].close_vote(outcome, now),
            transfer: None,
        })
    }

    /// Return a backer's full contribution after a failed campaign.
    ///
    /// Available once the funding window has ended without reaching the goal,
    /// and only while no milestone has been paid out. After a payout the
    /// remaining escrow stays committed to the open milestones.
    pub fn refund(
        &mut self,
        backer: &Address,
        now: Timestamp,
    ) -> Result<TransferInstruction, CampaignError> {
        if now <= self.end_time {
            return Err(CampaignError::RefundUnavailable {
                campaign: self.id,
                reason: "campaign has not ended",
            });
        }
        if self.goal_reached() {
            return Err(CampaignError::RefundUnavailable {
                campaign: self.id,
                reason: "goal was reached",
            });
        }
        if !self.released.is_zero() {
            return Err(CampaignError::RefundUnavailable {
                campaign: self.id,
                reason: "escrow already released to creator",
            });
        }
        let amount = self.contribution_of(backer);
        if amount.is_zero() {
            return Err(CampaignError::NothingToRefund {
                backer: backer.clone(),
            });
        }
        let held = self
            .held
            .checked_sub(amount)
            .ok_or(CampaignError::InsufficientFunds {
                campaign: self.id,
                requested: amount,
                held: self.held,
            })?;
        let raised = self
            .raised
            .checked_sub(amount)
            .ok_or(CampaignError::ArithmeticOverflow("raised"))?;

        self.held = held;
        self.raised = raised;
        if let Some(record) = self.contributions.get_mut(backer) {
            record.amount = Amount::ZERO;
            record.refunded = true;
        }
        Ok(TransferInstruction {
            campaign: self.id,
            recipient: backer.clone(),
            amount,
            kind: TransferKind::Refund,
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn milestone_index(&self, milestone: MilestoneId) -> Result<usize, CampaignError> {
        let idx = milestone.index();
        if idx >= self.milestones.len() {
            return Err(CampaignError::UnknownMilestone {
                campaign: self.id,
                milestone,
            });
        }
        Ok(idx)
    }

    fn plan_release(&self, idx: usize) -> Result<Release, CampaignError> {
        let amount = self.milestones[idx].amount();
        let insufficient = || CampaignError::InsufficientFunds {
            campaign: self.id,
            requested: amount,
            held: self.held,
        };
        let held = self.held.checked_sub(amount).ok_or_else(insufficient)?;
        let raised = self.raised.checked_sub(amount).ok_or_else(insufficient)?;
        let released = self
            .released
            .checked_add(amount)
            .ok_or(CampaignError::ArithmeticOverflow("released"))?;
        Ok(Release {
            amount,
            raised,
            held,
            released,
        })
    }

    fn commit_release(&mut self, idx: usize, release: Release, now: Timestamp) -> TransferInstruction {
        self.raised = release.raised;
        self.held = release.held;
        self.released = release.released;
        self.milestones[idx].mark_released(now);
        TransferInstruction {
            campaign: self.id,
            recipient: self.creator.clone(),
            amount: release.amount,
            kind: TransferKind::MilestonePayout {
                milestone: self.milestones[idx].id(),
            },
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
