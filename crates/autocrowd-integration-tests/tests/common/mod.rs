//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use autocrowd_core::{Address, Amount, CampaignId, EvidenceRef, MilestoneId, Timestamp};
use autocrowd_engine::{
    CampaignEngine, EngineConfig, InMemoryLedger, ManualClock, MilestoneEvent, MilestoneObserver,
};
use autocrowd_state::{CampaignParams, MilestonePlan, Verdict, VerificationVerdict};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Voting window used by every harness.
pub const VOTING_PERIOD: u64 = 3_600;

pub const M0: MilestoneId = MilestoneId::new(0);

/// Evidence label submitted by [`Harness::submitted_campaign`].
pub const BUILD: &str = "build-1";

/// Install a test-writer subscriber once per test binary.
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=autocrowd_engine=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn ts(secs: i64) -> Timestamp {
    Timestamp::from_epoch_secs(1_800_000_000 + secs).unwrap()
}

pub fn addr(n: u16) -> Address {
    Address::parse(format!("0x{n:040x}")).unwrap()
}

pub fn creator() -> Address {
    addr(0xc0de)
}

pub fn evidence(label: &str) -> EvidenceRef {
    EvidenceRef::new(format!("ipfs://{label}")).unwrap()
}

/// A verdict on the evidence submitted as [`BUILD`].
pub fn verdict(v: Verdict) -> VerificationVerdict {
    verdict_on(v, BUILD)
}

pub fn verdict_on(v: Verdict, label: &str) -> VerificationVerdict {
    let confidence = match v {
        Verdict::Approved => 0.94,
        Verdict::Rejected => 0.12,
        Verdict::Uncertain => 0.55,
    };
    VerificationVerdict::new(v, confidence, evidence(label))
        .unwrap()
        .with_reasoning("automated review")
}

pub fn plan(amount: u128) -> MilestonePlan {
    MilestonePlan {
        description: format!("deliverable worth {amount}"),
        amount: Amount::new(amount),
        deadline: ts(50_000),
    }
}

/// Funding window `[ts(0), ts(1000)]`, owned by [`creator`].
pub fn params(goal: u128, milestones: Vec<MilestonePlan>) -> CampaignParams {
    CampaignParams {
        creator: creator(),
        goal: Amount::new(goal),
        start_time: ts(0),
        end_time: ts(1_000),
        milestones,
    }
}

/// Records every event it is told about.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<MilestoneEvent>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<MilestoneEvent> {
        self.events.lock().clone()
    }
}

impl MilestoneObserver for EventLog {
    fn milestone_changed(&self, event: &MilestoneEvent) {
        self.events.lock().push(event.clone());
    }
}

pub struct Harness {
    pub engine: CampaignEngine,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
    pub log: Arc<EventLog>,
}

impl Harness {
    /// An engine at `ts(0)` with an in-memory ledger and an event log.
    pub fn new() -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(ts(0)));
        let ledger = Arc::new(InMemoryLedger::new());
        let log = Arc::new(EventLog::default());
        let config = EngineConfig {
            voting_period_secs: VOTING_PERIOD,
            ..EngineConfig::default()
        };
        let engine = CampaignEngine::new(config, clock.clone(), ledger.clone());
        engine.add_observer(log.clone());
        Self {
            engine,
            clock,
            ledger,
            log,
        }
    }

    /// Goal 1000 with a single 400 milestone; A=300 and B=200 contributed at
    /// `ts(10)`; evidence submitted at `ts(20)`.
    pub fn submitted_campaign(&self) -> CampaignId {
        let id = self
            .engine
            .create_campaign(params(1_000, vec![plan(400)]))
            .unwrap();
        self.clock.set(ts(10));
        self.engine
            .contribute(id, addr(0xa), Amount::new(300))
            .unwrap();
        self.engine
            .contribute(id, addr(0xb), Amount::new(200))
            .unwrap();
        self.clock.set(ts(20));
        self.engine
            .submit_evidence(id, &creator(), M0, evidence(BUILD))
            .unwrap();
        id
    }

    /// [`Self::submitted_campaign`] with an uncertain verdict at `ts(30)`,
    /// so voting is open until `ts(30 + VOTING_PERIOD)`.
    pub fn voting_campaign(&self) -> CampaignId {
        let id = self.submitted_campaign();
        self.clock.set(ts(30));
        self.engine
            .deliver_verdict(id, M0, verdict(Verdict::Uncertain))
            .unwrap();
        id
    }

    /// Move past the voting window opened by [`Self::voting_campaign`].
    pub fn close_voting(&self) {
        self.clock.set(ts(30 + VOTING_PERIOD as i64 + 1));
    }
}
