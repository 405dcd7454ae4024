//! Effects produced by state transitions

use super::state::{Airline, Itinerary, Leg, PendingConfirmation, Session, Stage};
use crate::parse::ParseError;
use serde::Serialize;
use thiserror::Error;

/// Recoverable problems with what the user typed or picked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Parse(ParseError),
    #[error("Airport {code} could not be found")]
    AirportNotFound { code: String },
    #[error("{aircraft} is not operated by {airline}")]
    UnknownAircraft { airline: Airline, aircraft: String },
}

impl From<ParseError> for ValidationError {
    fn from(e: ParseError) -> Self {
        ValidationError::Parse(e)
    }
}

/// Why a session went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Dispatched,
    Cancelled,
    /// A new plan command started over
    Replaced,
    Expired,
    Failed,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Dispatched => "dispatched",
            EndReason::Cancelled => "cancelled",
            EndReason::Replaced => "replaced",
            EndReason::Expired => "expired",
            EndReason::Failed => "failed",
        }
    }
}

/// Short, usually ephemeral, notices to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Cancelled,
    NotOwner,
    Expired,
    DispatchFailed,
    InternalError,
}

/// What to prompt for when entering a stage
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    ChooseAirline,
    ChooseAircraft { airline: Airline },
    /// Ask for text input at a session stage
    Input { session: Box<Session> },
}

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask for the input of a stage
    Prompt(Prompt),

    /// Look up an airport; the executor feeds back `AirportResolved`
    ResolveAirport { leg: Leg, code: String },

    /// Show a proposed value with confirm/retry buttons
    RequestConfirmation {
        session: Box<Session>,
        pending: PendingConfirmation,
    },

    /// Tell the user why their input was not accepted
    Reject {
        airline: Option<Airline>,
        stage: Stage,
        error: ValidationError,
    },

    /// Show the finished itinerary with send/cancel buttons
    PresentItinerary(Itinerary),

    /// Post the itinerary to the destination channel
    Dispatch(Itinerary),

    Notice(Notice),

    /// Log that the session ended
    SessionEnded { user_id: String, reason: EndReason },
}

impl Effect {
    pub fn prompt_input(session: &Session) -> Self {
        Effect::Prompt(Prompt::Input {
            session: Box::new(session.clone()),
        })
    }

    pub fn reject(session: Option<&Session>, stage: Stage, error: impl Into<ValidationError>) -> Self {
        Effect::Reject {
            airline: session.map(|s| s.airline),
            stage,
            error: error.into(),
        }
    }

    pub fn ended(user_id: &str, reason: EndReason) -> Self {
        Effect::SessionEnded {
            user_id: user_id.to_string(),
            reason,
        }
    }
}
