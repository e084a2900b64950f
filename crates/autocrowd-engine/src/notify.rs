//! # Milestone Notifications
//!
//! Every committed milestone transition is published to the registered
//! [`MilestoneObserver`]s before the campaign lock is released, so events
//! for one campaign arrive in the order they were committed. Delivery to
//! clients (WebSockets, push) lives outside this crate; [`EventBroadcaster`]
//! bridges events onto a `tokio::sync::broadcast` channel for that layer.

use autocrowd_core::CampaignId;
use autocrowd_state::{MilestoneState, MilestoneTransitionRecord, TransferInstruction};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A committed milestone state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneEvent {
    /// The owning campaign.
    pub campaign: CampaignId,
    /// The state change.
    pub transition: MilestoneTransitionRecord,
    /// The payout that accompanied it, if any.
    pub transfer: Option<TransferInstruction>,
}

impl MilestoneEvent {
    /// The milestone's new state.
    pub fn state(&self) -> MilestoneState {
        self.transition.to_state
    }
}

/// Receives milestone notifications.
///
/// Called synchronously on the thread that committed the change, with the
/// campaign still locked. Must not block for long and must not call back
/// into the engine for the same campaign.
pub trait MilestoneObserver: Send + Sync {
    /// A milestone changed state.
    fn milestone_changed(&self, event: &MilestoneEvent);
}

/// Forwards events onto a broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<MilestoneEvent>,
}

impl EventBroadcaster {
    /// A broadcaster buffering up to `capacity` events per lagging receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// A new receiver that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MilestoneEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl MilestoneObserver for EventBroadcaster {
    fn milestone_changed(&self, event: &MilestoneEvent) {
        // Err only means nobody is listening right now.
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(
                campaign = %event.campaign,
                milestone = %event.transition.milestone,
                "no broadcast receivers"
            );
        }
    }
}
