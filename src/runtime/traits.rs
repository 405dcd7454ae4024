//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

pub use crate::airport::AirportLookup;

use super::{ChannelEvent, ChannelHub};
use crate::render::{self, OutboundMessage};
use crate::state_machine::Itinerary;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No destination channel is configured")]
    DestinationMissing,
    #[error("Destination channel {0} is not accepting posts")]
    ChannelClosed(String),
}

/// Delivers finished itineraries and follow-up announcements
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Post the itinerary; returns the channel it went to
    async fn dispatch(&self, itinerary: &Itinerary) -> Result<String, DispatchError>;

    /// Post a follow-up message to the same destination
    async fn announce(&self, message: &OutboundMessage) -> Result<String, DispatchError>;
}

#[async_trait]
impl<T: Dispatcher + ?Sized> Dispatcher for Arc<T> {
    async fn dispatch(&self, itinerary: &Itinerary) -> Result<String, DispatchError> {
        (**self).dispatch(itinerary).await
    }

    async fn announce(&self, message: &OutboundMessage) -> Result<String, DispatchError> {
        (**self).announce(message).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter posting to a configured channel of the in-process hub
#[derive(Clone)]
pub struct ChannelDispatcher {
    hub: Arc<ChannelHub>,
    channel_id: Option<String>,
}

impl ChannelDispatcher {
    pub fn new(hub: Arc<ChannelHub>, channel_id: Option<String>) -> Self {
        Self { hub, channel_id }
    }

    fn destination(&self) -> Result<&str, DispatchError> {
        self.channel_id
            .as_deref()
            .ok_or(DispatchError::DestinationMissing)
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn dispatch(&self, itinerary: &Itinerary) -> Result<String, DispatchError> {
        let channel_id = self.destination()?;
        self.hub
            .post(
                channel_id,
                ChannelEvent::Itinerary {
                    itinerary: itinerary.clone(),
                    message: render::dispatched_itinerary(itinerary),
                },
            )
            .await;
        Ok(channel_id.to_string())
    }

    async fn announce(&self, message: &OutboundMessage) -> Result<String, DispatchError> {
        let channel_id = self.destination()?;
        self.hub
            .post(
                channel_id,
                ChannelEvent::Announcement {
                    message: message.clone(),
                },
            )
            .await;
        Ok(channel_id.to_string())
    }
}
