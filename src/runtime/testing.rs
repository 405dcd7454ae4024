//! Mock implementations for testing
//!
//! These mocks enable engine and gateway testing without real I/O.

use super::traits::*;
use crate::airport::{AirportInfo, LookupError};
use crate::render::OutboundMessage;
use crate::state_machine::Itinerary;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Airport Lookup
// ============================================================================

/// Mock lookup answering from a fixed set of airports
pub struct MockAirportLookup {
    airports: HashMap<String, AirportInfo>,
    available: bool,
    delay: Option<Duration>,
    /// Record of every code looked up
    pub codes: Mutex<Vec<String>>,
    /// Notified when a lookup starts (for test synchronization)
    pub lookup_started: Arc<Notify>,
}

impl MockAirportLookup {
    pub fn new() -> Self {
        Self {
            airports: HashMap::new(),
            available: true,
            delay: None,
            codes: Mutex::new(Vec::new()),
            lookup_started: Arc::new(Notify::new()),
        }
    }

    /// A lookup whose service always fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_airport(mut self, airport: AirportInfo) -> Self {
        self.airports.insert(airport.code.clone(), airport);
        self
    }

    /// Hold every lookup for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn recorded_codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

impl Default for MockAirportLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AirportLookup for MockAirportLookup {
    async fn lookup(&self, code: &str) -> Result<Option<AirportInfo>, LookupError> {
        self.codes.lock().unwrap().push(code.to_string());
        self.lookup_started.notify_waiters();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(LookupError::Status(503));
        }
        Ok(self.airports.get(code).cloned())
    }
}

// ============================================================================
// Recording Dispatcher
// ============================================================================

/// Dispatcher that records everything posted to it
pub struct RecordingDispatcher {
    channel_id: String,
    failure: Option<DispatchError>,
    pub dispatched: Mutex<Vec<Itinerary>>,
    pub announced: Mutex<Vec<OutboundMessage>>,
}

impl RecordingDispatcher {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            failure: None,
            dispatched: Mutex::new(Vec::new()),
            announced: Mutex::new(Vec::new()),
        }
    }

    /// A dispatcher whose destination is closed
    pub fn closed(channel_id: impl Into<String>) -> Self {
        let channel_id = channel_id.into();
        Self {
            failure: Some(DispatchError::ChannelClosed(channel_id.clone())),
            ..Self::new(channel_id)
        }
    }

    pub fn dispatched(&self) -> Vec<Itinerary> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn announced(&self) -> Vec<OutboundMessage> {
        self.announced.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, itinerary: &Itinerary) -> Result<String, DispatchError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        self.dispatched.lock().unwrap().push(itinerary.clone());
        Ok(self.channel_id.clone())
    }

    async fn announce(&self, message: &OutboundMessage) -> Result<String, DispatchError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        self.announced.lock().unwrap().push(message.clone());
        Ok(self.channel_id.clone())
    }
}
