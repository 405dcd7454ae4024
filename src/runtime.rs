//! Runtime for executing planning flows
//!
//! Owns the flow engine, the in-process channel hub that dispatched
//! itineraries are posted to, and the idle-session sweeper.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{FlowEngine, Outcome};
pub use traits::*;

use crate::airport::HttpAirportLookup;
use crate::render::OutboundMessage;
use crate::session::SessionStore;
use crate::state_machine::Itinerary;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Type alias for production engine with concrete implementations
pub type ProductionEngine = FlowEngine<HttpAirportLookup, ChannelDispatcher>;

/// Messages in these channels starting with one of these are commands for
/// other bots, never flow input
pub const RESERVED_PREFIXES: [char; 5] = ['.', '?', '!', '/', '$'];

/// Whether a chat message may be treated as flow input
pub fn accepts_text_message(content: &str, author_is_bot: bool) -> bool {
    if author_is_bot {
        return false;
    }
    !content.trim_start().starts_with(RESERVED_PREFIXES)
}

const HISTORY_PER_CHANNEL: usize = 50;

/// Something posted to a channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    Itinerary {
        itinerary: Itinerary,
        message: OutboundMessage,
    },
    Announcement {
        message: OutboundMessage,
    },
}

impl ChannelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::Itinerary { .. } => "itinerary",
            ChannelEvent::Announcement { .. } => "announcement",
        }
    }
}

struct ChannelHandle {
    broadcast_tx: broadcast::Sender<ChannelEvent>,
    history: VecDeque<ChannelEvent>,
}

impl ChannelHandle {
    fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            broadcast_tx,
            history: VecDeque::new(),
        }
    }
}

/// Destination channels for dispatched flight plans
#[derive(Default)]
pub struct ChannelHub {
    channels: RwLock<HashMap<String, ChannelHandle>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post to a channel, keeping it in the channel's recent history
    pub async fn post(&self, channel_id: &str, event: ChannelEvent) {
        let mut channels = self.channels.write().await;
        let handle = channels
            .entry(channel_id.to_string())
            .or_insert_with(ChannelHandle::new);

        if handle.history.len() == HISTORY_PER_CHANNEL {
            handle.history.pop_front();
        }
        handle.history.push_back(event.clone());

        // No live subscribers is fine; the history still has it
        let receivers = handle.broadcast_tx.send(event).unwrap_or(0);
        tracing::debug!(channel_id = %channel_id, receivers, "Posted to channel");
    }

    pub async fn subscribe(&self, channel_id: &str) -> broadcast::Receiver<ChannelEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel_id.to_string())
            .or_insert_with(ChannelHandle::new)
            .broadcast_tx
            .subscribe()
    }

    /// Recent posts, oldest first
    pub async fn recent(&self, channel_id: &str) -> Vec<ChannelEvent> {
        self.channels
            .read()
            .await
            .get(channel_id)
            .map(|handle| handle.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Periodically remove sessions idle longer than `idle_timeout`
pub fn spawn_session_sweeper(
    store: Arc<SessionStore>,
    idle_timeout: Duration,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    for session in store.expire_idle(Utc::now(), idle_timeout) {
                        tracing::info!(
                            user_id = %session.user_id,
                            stage = %session.stage,
                            reason = "expired",
                            "Session ended"
                        );
                    }
                }
            }
        }
        tracing::info!("Session sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;
    use crate::state_machine::{Airline, Session};
    use chrono::TimeZone;

    #[test]
    fn test_reserved_prefixes_and_bots_filtered() {
        assert!(accepts_text_message("SYD", false));
        assert!(accepts_text_message("2:30 PM", false));
        for content in [".help", "?SYD", "!plan", "/plan", "$bal", "  !plan"] {
            assert!(!accepts_text_message(content, false), "{content}");
        }
        assert!(!accepts_text_message("SYD", true));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let hub = ChannelHub::new();
        for i in 0..(HISTORY_PER_CHANNEL + 5) {
            let message = render::check_in_closed(Airline::Qantas, &format!("QF{i}"));
            hub.post("ops", ChannelEvent::Announcement { message }).await;
        }

        let recent = hub.recent("ops").await;
        assert_eq!(recent.len(), HISTORY_PER_CHANNEL);
        let ChannelEvent::Announcement { message } = &recent[0] else {
            panic!("expected announcement");
        };
        assert!(message.fields[0].value.contains("QF5"));
        assert!(hub.recent("elsewhere").await.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_expires_idle_sessions() {
        let store = Arc::new(SessionStore::new());
        let long_ago = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        store.create(Session::new("alice", "chan-1", Airline::Qantas, "Airbus A380", long_ago));
        store.create(Session::new("bob", "chan-1", Airline::Jetstar, "Airbus A320", Utc::now()));

        let cancel = CancellationToken::new();
        let handle = spawn_session_sweeper(
            store.clone(),
            Duration::from_secs(600),
            Duration::from_millis(10),
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(store.get("alice").is_none());
        assert!(store.get("bob").is_some());
    }
}
