//! HTTP message gateway
//!
//! Translates platform events (commands, component presses, chat messages)
//! into inbound flow commands and serializes the rendered replies.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::airport::{HttpAirportLookup, LookupError};
use crate::config::PlannerConfig;
use crate::db::Database;
use crate::runtime::{ChannelDispatcher, ChannelHub, FlowEngine, ProductionEngine};
use crate::session::SessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProductionEngine>,
    pub hub: Arc<ChannelHub>,
    pub db: Database,
    pub config: Arc<PlannerConfig>,
}

impl AppState {
    pub fn new(config: PlannerConfig, db: Database) -> Result<Self, LookupError> {
        let hub = Arc::new(ChannelHub::new());
        let lookup = HttpAirportLookup::new(
            &config.airport_api_url,
            &config.airport_api_key,
            config.lookup_timeout,
        )?;
        let dispatcher = ChannelDispatcher::new(hub.clone(), config.dispatch_channel.clone());
        let engine = FlowEngine::new(
            Arc::new(SessionStore::new()),
            lookup,
            dispatcher,
            config.prompt_timeout,
        );

        Ok(Self {
            engine: Arc::new(engine),
            hub,
            db,
            config: Arc::new(config),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.engine.store()
    }
}
