//! Inbound commands and the events they carry

use super::state::{Airline, Leg, Stage};
use crate::airport::AirportInfo;
use serde::{Deserialize, Serialize};

/// Events that drive the planning flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The plan command; offers the airline choice
    StartPlan,

    SelectAirline { airline: Airline },

    SelectAircraft { airline: Airline, aircraft: String },

    /// Free-text chat message in the session's channel
    Text { content: String },

    Confirm { prompt_id: String },

    Retry { prompt_id: String },

    Send,

    Cancel,

    /// Result of an airport lookup, fed back by the executor
    AirportResolved {
        leg: Leg,
        code: String,
        info: Option<AirportInfo>,
    },
}

impl Event {
    /// Button and dropdown presses, as opposed to typed text
    pub fn is_interaction(&self) -> bool {
        matches!(
            self,
            Event::SelectAirline { .. }
                | Event::SelectAircraft { .. }
                | Event::Confirm { .. }
                | Event::Retry { .. }
                | Event::Send
                | Event::Cancel
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::StartPlan => "start_plan",
            Event::SelectAirline { .. } => "select_airline",
            Event::SelectAircraft { .. } => "select_aircraft",
            Event::Text { .. } => "text",
            Event::Confirm { .. } => "confirm",
            Event::Retry { .. } => "retry",
            Event::Send => "send",
            Event::Cancel => "cancel",
            Event::AirportResolved { .. } => "airport_resolved",
        }
    }
}

/// An event together with who sent it and where
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Owner of the flow being acted on
    pub user_id: String,
    /// Whoever pressed the button or typed the message
    pub actor_id: String,
    pub channel_id: String,
    /// Stage the pressed component was rendered for, if known
    pub expected_stage: Option<Stage>,
    pub event: Event,
}

impl Inbound {
    /// An event sent by the flow's owner
    pub fn new(user_id: impl Into<String>, channel_id: impl Into<String>, event: Event) -> Self {
        let user_id = user_id.into();
        Self {
            actor_id: user_id.clone(),
            user_id,
            channel_id: channel_id.into(),
            expected_stage: None,
            event,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    pub fn with_expected_stage(mut self, stage: Stage) -> Self {
        self.expected_stage = Some(stage);
        self
    }

    pub fn is_from_owner(&self) -> bool {
        self.actor_id == self.user_id
    }
}
