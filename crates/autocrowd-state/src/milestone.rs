//! # Milestone Lifecycle State Machine
//!
//! Tracks one funding tranche from evidence submission to payout.
//!
//! ## States
//!
//! ```text
//!                      verdict=Approved
//!   Pending ──submit──▶ Submitted ─────────────────────────▶ Approved (terminal)
//!                        │    │                                  ▲
//!                        │    │ verdict=Uncertain                │ yes > no
//!                        │    └──────────────▶ Voting ──finalize─┤
//!        verdict=Rejected│                                       │ yes <= no
//!                        ▼                                       ▼
//!                     Rejected ◀──────────────────────────── Rejected
//!                        │
//!                        └──resubmit──▶ Submitted (next round)
//! ```
//!
//! ## Rounds
//!
//! Each submission opens a round. Resubmitting after `Rejected` clears the
//! tallies, ballots, voting deadline and stored verdict, and increments the
//! round, so a backer may vote at most once per round.
//!
//! ## Tie-break
//!
//! Approval requires strictly more yes-weight than no-weight. A tie,
//! including the no-votes case `0 == 0`, resolves to `Rejected`.
//!
//! ## Mutation discipline
//!
//! Fields are private. Guards live in `ensure_*` methods taking `&self`;
//! the mutators that follow them cannot fail. The owning [`Campaign`]
//! runs all of its guards (authorization, funds) between the two, so a
//! rejected operation never leaves a half-applied transition.
//!
//! [`Campaign`]: crate::Campaign

use std::collections::BTreeMap;

use autocrowd_core::{Address, Amount, EvidenceRef, MilestoneId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::CampaignError;
use crate::verdict::{Verdict, VerificationVerdict};

// ─── State ───────────────────────────────────────────────────────────

/// The lifecycle state of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneState {
    /// Awaiting the creator's evidence.
    Pending,
    /// Evidence submitted; awaiting the verification verdict.
    Submitted,
    /// Verdict was inconclusive; backers are voting.
    Voting,
    /// Funds released to the creator (terminal).
    Approved,
    /// Not approved; the creator may resubmit.
    Rejected,
}

impl MilestoneState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether the creator may submit evidence in this state.
    pub fn accepts_evidence(&self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Voting => "VOTING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for MilestoneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Voting ──────────────────────────────────────────────────────────

/// Contribution-weighted yes/no totals for one voting round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    yes: Amount,
    no: Amount,
}

impl VoteTally {
    /// Total weight voting to approve.
    pub fn yes(&self) -> Amount {
        self.yes
    }

    /// Total weight voting to reject.
    pub fn no(&self) -> Amount {
        self.no
    }

    /// The tally with one more vote added, or `None` on overflow.
    fn with_vote(self, approve: bool, weight: Amount) -> Option<Self> {
        if approve {
            Some(Self {
                yes: self.yes.checked_add(weight)?,
                no: self.no,
            })
        } else {
            Some(Self {
                yes: self.yes,
                no: self.no.checked_add(weight)?,
            })
        }
    }

    /// The state a finalized vote resolves to. Ties reject.
    pub fn outcome(&self) -> MilestoneState {
        if self.yes > self.no {
            MilestoneState::Approved
        } else {
            MilestoneState::Rejected
        }
    }
}

/// A recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// The voting backer.
    pub voter: Address,
    /// `true` to approve the milestone.
    pub approve: bool,
    /// The backer's contribution at the moment the vote was cast.
    pub weight: Amount,
    /// The round the vote belongs to.
    pub round: u32,
    /// When the vote was cast.
    pub cast_at: Timestamp,
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a milestone state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneTransitionRecord {
    /// The milestone that changed.
    pub milestone: MilestoneId,
    /// State before the transition.
    pub from_state: MilestoneState,
    /// State after the transition.
    pub to_state: MilestoneState,
    /// Submission round in which the transition happened.
    pub round: u32,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Why it happened.
    pub reason: String,
}

// ─── Milestone ───────────────────────────────────────────────────────

/// A campaign milestone with its lifecycle state, current round's votes,
/// and transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    id: MilestoneId,
    description: String,
    amount: Amount,
    deadline: Timestamp,
    state: MilestoneState,
    evidence: Option<EvidenceRef>,
    submitted_at: Option<Timestamp>,
    verdict: Option<VerificationVerdict>,
    tally: VoteTally,
    ballots: BTreeMap<Address, Ballot>,
    voting_deadline: Option<Timestamp>,
    funds_released: bool,
    released_at: Option<Timestamp>,
    round: u32,
    transitions: Vec<MilestoneTransitionRecord>,
}

impl Milestone {
    pub(crate) fn new(
        id: MilestoneId,
        description: String,
        amount: Amount,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            description,
            amount,
            deadline,
            state: MilestoneState::Pending,
            evidence: None,
            submitted_at: None,
            verdict: None,
            tally: VoteTally::default(),
            ballots: BTreeMap::new(),
            voting_deadline: None,
            funds_released: false,
            released_at: None,
            round: 0,
            transitions: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The milestone's id within its campaign.
    pub fn id(&self) -> MilestoneId {
        self.id
    }

    /// What the creator committed to deliver.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Amount released to the creator on approval.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// The creator's delivery deadline.
    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    /// Whether the delivery deadline has passed without approval.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        !self.state.is_terminal() && now > self.deadline
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MilestoneState {
        self.state
    }

    /// Evidence of the current round, if submitted.
    pub fn evidence(&self) -> Option<&EvidenceRef> {
        self.evidence.as_ref()
    }

    /// When the current round's evidence was submitted.
    pub fn submitted_at(&self) -> Option<Timestamp> {
        self.submitted_at
    }

    /// The verdict received in the current round.
    pub fn verdict(&self) -> Option<&VerificationVerdict> {
        self.verdict.as_ref()
    }

    /// Current round's tally.
    pub fn tally(&self) -> VoteTally {
        self.tally
    }

    /// Current round's ballot from `voter`, if any.
    pub fn ballot(&self, voter: &Address) -> Option<&Ballot> {
        self.ballots.get(voter)
    }

    /// All ballots of the current round.
    pub fn ballots(&self) -> impl Iterator<Item = &Ballot> {
        self.ballots.values()
    }

    /// Whether `voter` has voted in the current round.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.ballots.contains_key(voter)
    }

    /// Last instant at which votes are accepted, while voting.
    pub fn voting_deadline(&self) -> Option<Timestamp> {
        self.voting_deadline
    }

    /// Whether the allocation has been paid out.
    pub fn funds_released(&self) -> bool {
        self.funds_released
    }

    /// When the allocation was paid out.
    pub fn released_at(&self) -> Option<Timestamp> {
        self.released_at
    }

    /// Submission round; 0 before the first submission.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Every state change, oldest first.
    pub fn transitions(&self) -> &[MilestoneTransitionRecord] {
        &self.transitions
    }

    // ── Guards ───────────────────────────────────────────────────────

    pub(crate) fn ensure_state(
        &self,
        expected: MilestoneState,
        operation: &'static str,
    ) -> Result<(), CampaignError> {
        if self.state != expected {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    pub(crate) fn ensure_accepts_evidence(&self) -> Result<(), CampaignError> {
        if !self.state.accepts_evidence() {
            return Err(self.invalid("submit evidence"));
        }
        Ok(())
    }

    /// Check that a verdict reviews the evidence currently under submission.
    pub(crate) fn ensure_evidence(&self, received: &EvidenceRef) -> Result<(), CampaignError> {
        let expected = self
            .evidence
            .as_ref()
            .ok_or_else(|| self.invalid("deliver verdict"))?;
        if expected != received {
            return Err(CampaignError::EvidenceMismatch {
                milestone: self.id,
                expected: expected.clone(),
                received: received.clone(),
            });
        }
        Ok(())
    }

    /// Check that the vote window has closed and return the outcome.
    pub(crate) fn ensure_finalizable(&self, now: Timestamp) -> Result<MilestoneState, CampaignError> {
        self.ensure_state(MilestoneState::Voting, "finalize")?;
        let deadline = self.voting_deadline_or_overflow()?;
        if now <= deadline {
            return Err(CampaignError::VotingWindowOpen {
                milestone: self.id,
                deadline,
            });
        }
        Ok(self.tally.outcome())
    }

    fn voting_deadline_or_overflow(&self) -> Result<Timestamp, CampaignError> {
        self.voting_deadline
            .ok_or(CampaignError::ArithmeticOverflow("voting deadline"))
    }

    fn invalid(&self, operation: &'static str) -> CampaignError {
        CampaignError::InvalidState {
            milestone: self.id,
            state: self.state,
            operation,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// PENDING|REJECTED → SUBMITTED. Caller has run `ensure_accepts_evidence`.
    pub(crate) fn submit_evidence(
        &mut self,
        evidence: EvidenceRef,
        now: Timestamp,
    ) -> MilestoneTransitionRecord {
        let reason = if self.state == MilestoneState::Rejected {
            format!("evidence resubmitted: {evidence}")
        } else {
            format!("evidence submitted: {evidence}")
        };
        self.round += 1;
        self.tally = VoteTally::default();
        self.ballots.clear();
        self.voting_deadline = None;
        self.verdict = None;
        self.evidence = Some(evidence);
        self.submitted_at = Some(now);
        self.do_transition(MilestoneState::Submitted, now, reason)
    }

    /// SUBMITTED → APPROVED | REJECTED | VOTING.
    ///
    /// Caller has run `ensure_state(Submitted)`, checked funds for an
    /// approval, and computed `voting_deadline` for an uncertain verdict.
    pub(crate) fn apply_verdict(
        &mut self,
        verdict: VerificationVerdict,
        voting_deadline: Option<Timestamp>,
        now: Timestamp,
    ) -> MilestoneTransitionRecord {
        let (to, reason) = match verdict.verdict() {
            Verdict::Approved => (
                MilestoneState::Approved,
                format!("verified (confidence {:.2})", verdict.confidence()),
            ),
            Verdict::Rejected => (
                MilestoneState::Rejected,
                format!("verification rejected (confidence {:.2})", verdict.confidence()),
            ),
            Verdict::Uncertain => {
                self.voting_deadline = voting_deadline;
                (
                    MilestoneState::Voting,
                    format!(
                        "verification inconclusive (confidence {:.2}); voting opened",
                        verdict.confidence()
                    ),
                )
            }
        };
        self.verdict = Some(verdict);
        self.do_transition(to, now, reason)
    }

    /// Record a ballot. Runs every vote guard before mutating.
    ///
    /// Guard order: state, window, weight, duplicate.
    pub(crate) fn cast_vote(
        &mut self,
        voter: Address,
        approve: bool,
        weight: Amount,
        now: Timestamp,
    ) -> Result<Ballot, CampaignError> {
        self.ensure_state(MilestoneState::Voting, "vote")?;
        let deadline = self.voting_deadline_or_overflow()?;
        if now > deadline {
            return Err(CampaignError::VotingWindowClosed {
                milestone: self.id,
                deadline,
            });
        }
        if weight.is_zero() {
            return Err(CampaignError::Unauthorized {
                caller: voter,
                operation: "vote",
                reason: "caller has no contribution",
            });
        }
        if self.ballots.contains_key(&voter) {
            return Err(CampaignError::AlreadyVoted {
                voter,
                milestone: self.id,
                round: self.round,
            });
        }
        let tally = self
            .tally
            .with_vote(approve, weight)
            .ok_or(CampaignError::ArithmeticOverflow("vote tally"))?;

        let ballot = Ballot {
            voter: voter.clone(),
            approve,
            weight,
            round: self.round,
            cast_at: now,
        };
        self.tally = tally;
        self.ballots.insert(voter, ballot.clone());
        Ok(ballot)
    }

    /// VOTING → `outcome`. Caller obtained `outcome` from `ensure_finalizable`.
    pub(crate) fn close_vote(
        &mut self,
        outcome: MilestoneState,
        now: Timestamp,
    ) -> MilestoneTransitionRecord {
        let reason = format!(
            "vote finalized: yes {} / no {}",
            self.tally.yes, self.tally.no
        );
        self.do_transition(outcome, now, reason)
    }

    pub(crate) fn mark_released(&mut self, now: Timestamp) {
        self.funds_released = true;
        self.released_at = Some(now);
    }

    fn do_transition(
        &mut self,
        to: MilestoneState,
        now: Timestamp,
        reason: String,
    ) -> MilestoneTransitionRecord {
        let record = MilestoneTransitionRecord {
            milestone: self.id,
            from_state: self.state,
            to_state: to,
            round: self.round,
            timestamp: now,
            reason,
        };
        self.transitions.push(record.clone());
        self.state = to;
        record
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(1_800_000_000 + secs).unwrap()
    }

    fn addr(n: u8) -> Address {
        Address::parse(format!("0x{n:040x}")).unwrap()
    }

    fn evidence(label: &str) -> EvidenceRef {
        EvidenceRef::new(format!("ipfs://{label}")).unwrap()
    }

    fn verdict(v: Verdict) -> VerificationVerdict {
        VerificationVerdict::new(v, 0.5, evidence("report")).unwrap()
    }

    fn make_milestone() -> Milestone {
        Milestone::new(MilestoneId::new(0), "prototype".into(), Amount::new(400), ts(10_000))
    }

    fn voting_milestone() -> Milestone {
        let mut m = make_milestone();
        m.submit_evidence(evidence("e1"), ts(0));
        m.apply_verdict(verdict(Verdict::Uncertain), Some(ts(100)), ts(1));
        m
    }

    #[test]
    fn new_milestone_is_pending() {
        let m = make_milestone();
        assert_eq!(m.state(), MilestoneState::Pending);
        assert_eq!(m.round(), 0);
        assert!(!m.funds_released());
        assert!(m.transitions().is_empty());
    }

    #[test]
    fn submission_records_evidence_and_time() {
        let mut m = make_milestone();
        let rec = m.submit_evidence(evidence("e1"), ts(5));
        assert_eq!(rec.from_state, MilestoneState::Pending);
        assert_eq!(rec.to_state, MilestoneState::Submitted);
        assert_eq!(m.evidence().unwrap().as_str(), "ipfs://e1");
        assert_eq!(m.submitted_at(), Some(ts(5)));
        assert_eq!(m.round(), 1);
    }

    #[test]
    fn uncertain_verdict_opens_voting() {
        let m = voting_milestone();
        assert_eq!(m.state(), MilestoneState::Voting);
        assert_eq!(m.voting_deadline(), Some(ts(100)));
    }

    #[test]
    fn vote_at_deadline_is_accepted_after_is_closed() {
        let mut m = voting_milestone();
        assert!(m.cast_vote(addr(1), true, Amount::new(10), ts(100)).is_ok());
        let err = m
            .cast_vote(addr(2), true, Amount::new(10), ts(101))
            .unwrap_err();
        assert!(matches!(err, CampaignError::VotingWindowClosed { .. }));
    }

    #[test]
    fn zero_weight_vote_is_unauthorized() {
        let mut m = voting_milestone();
        let err = m.cast_vote(addr(1), true, Amount::ZERO, ts(2)).unwrap_err();
        assert!(matches!(err, CampaignError::Unauthorized { .. }));
        assert_eq!(m.tally(), VoteTally::default());
    }

    #[test]
    fn double_vote_rejected_and_tally_unchanged() {
        let mut m = voting_milestone();
        m.cast_vote(addr(1), true, Amount::new(300), ts(2)).unwrap();
        let before = m.clone();
        let err = m
            .cast_vote(addr(1), false, Amount::new(300), ts(3))
            .unwrap_err();
        assert!(matches!(err, CampaignError::AlreadyVoted { round: 1, .. }));
        assert_eq!(m, before);
    }

    #[test]
    fn vote_outside_voting_is_invalid_state() {
        let mut m = make_milestone();
        let err = m.cast_vote(addr(1), true, Amount::new(1), ts(0)).unwrap_err();
        assert!(matches!(
            err,
            CampaignError::InvalidState {
                state: MilestoneState::Pending,
                ..
            }
        ));
    }

    #[test]
    fn finalize_before_deadline_rejected() {
        let m = voting_milestone();
        let err = m.ensure_finalizable(ts(100)).unwrap_err();
        assert!(matches!(err, CampaignError::VotingWindowOpen { .. }));
    }

    #[test]
    fn tie_resolves_to_rejected() {
        let mut m = voting_milestone();
        m.cast_vote(addr(1), true, Amount::new(250), ts(2)).unwrap();
        m.cast_vote(addr(2), false, Amount::new(250), ts(3)).unwrap();
        assert_eq!(m.ensure_finalizable(ts(101)).unwrap(), MilestoneState::Rejected);
    }

    #[test]
    fn no_votes_resolves_to_rejected() {
        let m = voting_milestone();
        assert_eq!(m.ensure_finalizable(ts(101)).unwrap(), MilestoneState::Rejected);
    }

    #[test]
    fn majority_yes_resolves_to_approved() {
        let mut m = voting_milestone();
        m.cast_vote(addr(1), true, Amount::new(300), ts(2)).unwrap();
        m.cast_vote(addr(2), false, Amount::new(200), ts(3)).unwrap();
        let outcome = m.ensure_finalizable(ts(101)).unwrap();
        let rec = m.close_vote(outcome, ts(101));
        assert_eq!(rec.to_state, MilestoneState::Approved);
        assert!(rec.reason.contains("yes 300 / no 200"));
    }

    #[test]
    fn resubmission_starts_fresh_round() {
        let mut m = voting_milestone();
        m.cast_vote(addr(1), false, Amount::new(300), ts(2)).unwrap();
        let outcome = m.ensure_finalizable(ts(101)).unwrap();
        m.close_vote(outcome, ts(101));
        assert_eq!(m.state(), MilestoneState::Rejected);

        m.ensure_accepts_evidence().unwrap();
        m.submit_evidence(evidence("e2"), ts(200));
        assert_eq!(m.state(), MilestoneState::Submitted);
        assert_eq!(m.round(), 2);
        assert!(!m.has_voted(&addr(1)));
        assert_eq!(m.tally(), VoteTally::default());
        assert_eq!(m.voting_deadline(), None);
        assert!(m.verdict().is_none());
    }

    #[test]
    fn approved_is_terminal_for_evidence() {
        let mut m = make_milestone();
        m.submit_evidence(evidence("e1"), ts(0));
        m.apply_verdict(verdict(Verdict::Approved), None, ts(1));
        assert!(m.state().is_terminal());
        assert!(matches!(
            m.ensure_accepts_evidence().unwrap_err(),
            CampaignError::InvalidState { .. }
        ));
    }

    #[test]
    fn transition_log_records_all_changes() {
        let mut m = voting_milestone();
        let outcome = m.ensure_finalizable(ts(101)).unwrap();
        m.close_vote(outcome, ts(101));
        let states: Vec<_> = m
            .transitions()
            .iter()
            .map(|t| (t.from_state, t.to_state))
            .collect();
        assert_eq!(
            states,
            vec![
                (MilestoneState::Pending, MilestoneState::Submitted),
                (MilestoneState::Submitted, MilestoneState::Voting),
                (MilestoneState::Voting, MilestoneState::Rejected),
            ]
        );
    }

    #[test]
    fn overdue_only_before_approval() {
        let mut m = make_milestone();
        assert!(!m.is_overdue(ts(10_000)));
        assert!(m.is_overdue(ts(10_001)));
        m.submit_evidence(evidence("e1"), ts(0));
        m.apply_verdict(verdict(Verdict::Approved), None, ts(1));
        assert!(!m.is_overdue(ts(10_001)));
    }

    #[test]
    fn state_display() {
        assert_eq!(MilestoneState::Voting.to_string(), "VOTING");
        assert_eq!(
            serde_json::to_string(&MilestoneState::Submitted).unwrap(),
            "\"SUBMITTED\""
        );
    }
}
