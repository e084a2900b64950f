//! Engine configuration.
//!
//! Defaults suit production. Override via environment variables or explicit
//! construction in tests.

/// Default voting window: seven days.
pub const DEFAULT_VOTING_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

/// Default capacity of the broadcast bridge.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Runtime configuration for a [`CampaignEngine`](crate::CampaignEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long backers may vote after an inconclusive verdict.
    pub voting_period_secs: u64,
    /// Capacity of the [`EventBroadcaster`](crate::EventBroadcaster) channel.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voting_period_secs: DEFAULT_VOTING_PERIOD_SECS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AUTOCROWD_VOTING_PERIOD_SECS` (default: 604800)
    /// - `AUTOCROWD_EVENT_BUFFER` (default: 256)
    ///
    /// Unset variables take their defaults. Set but malformed values are an
    /// error rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            voting_period_secs: positive(
                &lookup,
                "AUTOCROWD_VOTING_PERIOD_SECS",
                DEFAULT_VOTING_PERIOD_SECS,
            )?,
            event_buffer: positive(&lookup, "AUTOCROWD_EVENT_BUFFER", DEFAULT_EVENT_BUFFER)?,
        })
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let value: T = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.clone(),
        reason: "not an unsigned integer",
    })?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The raw value.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}
