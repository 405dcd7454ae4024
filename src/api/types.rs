//! API request and response types

use crate::loyalty::{FlightRecord, Member};
use crate::render::{Action, OutboundMessage};
use crate::state_machine::{Airline, Stage};
use serde::{Deserialize, Serialize};

/// The plan command
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub user_id: String,
    pub channel_id: String,
}

/// A pressed button or chosen dropdown option
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    /// Who pressed it
    pub user_id: String,
    /// Owner of the message the component was attached to; defaults to the presser
    pub owner_id: Option<String>,
    pub channel_id: String,
    /// The `stage` the component was rendered with
    pub expected_stage: Option<Stage>,
    pub action: Action,
}

/// A chat message seen in a channel
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    pub channel_id: String,
    pub content: String,
    #[serde(default)]
    pub author_is_bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckInClosedRequest {
    pub user_id: String,
    /// Planner who dispatched the flight, if known
    pub owner_id: Option<String>,
    pub airline: Airline,
    pub flight_number: String,
}

// ============================================================================
// Loyalty
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkRobloxRequest {
    pub roblox_id: String,
}

/// Admin request to credit a flight to a member
#[derive(Debug, Deserialize)]
pub struct AddFlightRequest {
    pub admin_id: String,
    pub user_id: String,
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub status_credits: u32,
    pub points: u64,
    /// Parsed separately so a bad value gets the list of valid cabins
    pub cabin: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: Member,
    pub reply: OutboundMessage,
}

#[derive(Debug, Serialize)]
pub struct FlightAddedResponse {
    pub member: Member,
    pub flight: FlightRecord,
    pub upgraded: bool,
    pub reply: OutboundMessage,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub members: Vec<Member>,
    pub reply: OutboundMessage,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
