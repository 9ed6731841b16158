//! Ban state tracking for the registry's two channel categories
//!
//! The registry bans silently and never says when a ban ends, so the resume
//! time kept here is an estimate derived from a configurable cooldown. A
//! channel is considered banned while `now < expires_at`; there is no explicit
//! unban transition.

use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the ban event channel; slow observers only miss old events
const EVENT_CAPACITY: usize = 16;

/// Marker the registry embeds in HTTP documents served to a banned client
const DOCUMENT_BAN_MARKER: &str = ">banned<";

/// Independently banned communication paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanChannel {
    /// The UDP command channel
    Command,
    /// The HTTP document-fetch channel
    DocumentFetch,
}

impl BanChannel {
    pub const ALL: [Self; 2] = [Self::Command, Self::DocumentFetch];

    fn index(self) -> usize {
        match self {
            Self::Command => 0,
            Self::DocumentFetch => 1,
        }
    }
}

impl fmt::Display for BanChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::DocumentFetch => write!(f, "document-fetch"),
        }
    }
}

/// Estimated ban durations per channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanCooldowns {
    pub command_cooldown_secs: u64,
    pub document_cooldown_secs: u64,
}

impl Default for BanCooldowns {
    fn default() -> Self {
        Self {
            command_cooldown_secs: 90 * 60,
            document_cooldown_secs: 12 * 60 * 60,
        }
    }
}

impl BanCooldowns {
    pub fn for_channel(&self, channel: BanChannel) -> TimeDelta {
        let secs = match channel {
            BanChannel::Command => self.command_cooldown_secs,
            BanChannel::DocumentFetch => self.document_cooldown_secs,
        };
        TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::MAX)
    }
}

/// Ban state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanState {
    pub channel: BanChannel,
    pub occurred_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BanState {
    /// The "never banned" state every channel starts in
    pub fn never(channel: BanChannel) -> Self {
        Self {
            channel,
            occurred_at: DateTime::UNIX_EPOCH,
            expires_at: DateTime::UNIX_EPOCH,
        }
    }

    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn has_ever_been_banned(&self) -> bool {
        self.occurred_at != DateTime::UNIX_EPOCH
    }
}

/// Notification raised whenever a ban is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BanEvent {
    pub state: BanState,
    /// Whether the channel was already banned when this ban was recorded
    pub extended: bool,
}

/// Shared ban state for both channels
///
/// Cheap to query from any number of tasks; written only by the serialized
/// send path (and by the document fetcher through
/// [`observe_document`](Self::observe_document)).
#[derive(Debug)]
pub struct BanTracker {
    cooldowns: BanCooldowns,
    states: RwLock<[BanState; 2]>,
    events: broadcast::Sender<BanEvent>,
}

impl BanTracker {
    pub fn new(cooldowns: BanCooldowns) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cooldowns,
            states: RwLock::new(BanChannel::ALL.map(BanState::never)),
            events,
        }
    }

    pub fn cooldowns(&self) -> &BanCooldowns {
        &self.cooldowns
    }

    /// Record a ban observed at `occurred_at`.
    ///
    /// A ban recorded while already banned overwrites the previous estimate;
    /// nothing accumulates.
    pub fn record_ban(&self, channel: BanChannel, occurred_at: DateTime<Utc>) -> BanState {
        let state = BanState {
            channel,
            occurred_at,
            expires_at: occurred_at
                .checked_add_signed(self.cooldowns.for_channel(channel))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let extended = {
            let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
            let slot = &mut states[channel.index()];
            let extended = slot.is_banned_at(occurred_at);
            *slot = state;
            extended
        };

        warn!(
            "Registry {channel} channel banned at {occurred_at}, communication suspended until {}",
            state.expires_at
        );

        // No subscribers is fine; the state itself is the source of truth
        if self.events.send(BanEvent { state, extended }).is_err() {
            info!("No observers for ban events");
        }

        state
    }

    /// Record a document-fetch ban if the fetched document carries the ban marker.
    ///
    /// Returns the new state when a ban was recorded.
    pub fn observe_document(&self, document: &str, at: DateTime<Utc>) -> Option<BanState> {
        document_indicates_ban(document).then(|| self.record_ban(BanChannel::DocumentFetch, at))
    }

    pub fn state(&self, channel: BanChannel) -> BanState {
        self.states.read().unwrap_or_else(PoisonError::into_inner)[channel.index()]
    }

    pub fn is_banned(&self, channel: BanChannel) -> bool {
        self.is_banned_at(channel, Utc::now())
    }

    pub fn is_banned_at(&self, channel: BanChannel, now: DateTime<Utc>) -> bool {
        self.state(channel).is_banned_at(now)
    }

    /// Estimated moment the channel may be used again
    pub fn resume_time(&self, channel: BanChannel) -> DateTime<Utc> {
        self.state(channel).expires_at
    }

    /// Subscribe to ban notifications
    pub fn subscribe(&self) -> broadcast::Receiver<BanEvent> {
        self.events.subscribe()
    }
}

impl Default for BanTracker {
    fn default() -> Self {
        Self::new(BanCooldowns::default())
    }
}

/// Check whether an HTTP document is the registry's ban notice
pub fn document_indicates_ban(document: &str) -> bool {
    document.to_ascii_lowercase().contains(DOCUMENT_BAN_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_starts_never_banned() {
        let tracker = BanTracker::default();
        for channel in BanChannel::ALL {
            let state = tracker.state(channel);
            assert_eq!(state, BanState::never(channel));
            assert!(!state.has_ever_been_banned());
            assert!(!tracker.is_banned(channel));
            assert_eq!(tracker.resume_time(channel), DateTime::UNIX_EPOCH);
        }
    }

    #[test]
    fn test_ban_expires_after_cooldown() {
        let tracker = BanTracker::default();
        let occurred = at(1_700_000_000);
        let state = tracker.record_ban(BanChannel::Command, occurred);

        assert_eq!(state.expires_at, occurred + TimeDelta::minutes(90));
        assert!(tracker.is_banned_at(BanChannel::Command, occurred));
        assert!(tracker.is_banned_at(BanChannel::Command, state.expires_at - TimeDelta::seconds(1)));
        assert!(!tracker.is_banned_at(BanChannel::Command, state.expires_at));
    }

    #[test]
    fn test_channels_are_independent() {
        let tracker = BanTracker::default();
        let occurred = at(1_700_000_000);
        tracker.record_ban(BanChannel::DocumentFetch, occurred);

        assert!(tracker.is_banned_at(BanChannel::DocumentFetch, occurred));
        assert!(!tracker.is_banned_at(BanChannel::Command, occurred));
        assert_eq!(
            tracker.resume_time(BanChannel::DocumentFetch),
            occurred + TimeDelta::hours(12)
        );
    }

    #[test]
    fn test_second_ban_overwrites() {
        let tracker = BanTracker::default();
        let first = at(1_700_000_000);
        let second = first + TimeDelta::minutes(30);

        tracker.record_ban(BanChannel::Command, first);
        let state = tracker.record_ban(BanChannel::Command, second);

        assert_eq!(state.occurred_at, second);
        // One cooldown from the latest ban, not two stacked cooldowns
        assert_eq!(state.expires_at, second + TimeDelta::minutes(90));
        assert_eq!(tracker.resume_time(BanChannel::Command), state.expires_at);
    }

    #[test]
    fn test_configured_cooldown() {
        let tracker = BanTracker::new(BanCooldowns {
            command_cooldown_secs: 60,
            document_cooldown_secs: 120,
        });
        let occurred = at(1_700_000_000);
        let state = tracker.record_ban(BanChannel::Command, occurred);
        assert_eq!(state.expires_at, occurred + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_ban_events_are_broadcast() {
        let tracker = BanTracker::default();
        let mut events = tracker.subscribe();
        let occurred = at(1_700_000_000);

        tracker.record_ban(BanChannel::Command, occurred);
        tracker.record_ban(BanChannel::Command, occurred + TimeDelta::minutes(1));

        let first = events.recv().await.unwrap();
        assert_eq!(first.state.channel, BanChannel::Command);
        assert!(!first.extended);

        let second = events.recv().await.unwrap();
        assert!(second.extended);
    }

    #[test]
    fn test_observe_document() {
        let tracker = BanTracker::default();
        let now = at(1_700_000_000);

        assert!(tracker.observe_document("<anime id=\"1\"></anime>", now).is_none());
        assert!(!tracker.is_banned_at(BanChannel::DocumentFetch, now));

        let state = tracker.observe_document("<error code=\"500\">Banned</error>", now);
        assert!(state.is_some());
        assert!(tracker.is_banned_at(BanChannel::DocumentFetch, now));
        assert!(!tracker.is_banned_at(BanChannel::Command, now));
    }
}
