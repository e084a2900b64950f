//! # autocrowd-engine
//!
//! Coordinates campaigns at runtime: one lock per campaign, a clock read once
//! per operation, outbound transfers through a [`FundLedger`], and
//! notifications to [`MilestoneObserver`]s after each committed transition.
//!
//! The crate emits `tracing` events but never installs a subscriber; that
//! is the embedding binary's job.
//!
//! ```ignore
//! let engine = CampaignEngine::new(
//!     EngineConfig::from_env()?,
//!     Arc::new(SystemClock),
//!     Arc::new(InMemoryLedger::new()),
//! );
//! let broadcaster = Arc::new(EventBroadcaster::new(engine.config().event_buffer));
//! engine.add_observer(broadcaster.clone());
//! ```

#![deny(missing_docs)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::CampaignEngine;
pub use error::EngineError;
pub use ledger::{FundLedger, InMemoryLedger, LedgerError};
pub use notify::{EventBroadcaster, MilestoneEvent, MilestoneObserver};
