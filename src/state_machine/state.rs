//! Flight planning session types

use crate::airport::AirportInfo;
use crate::parse::{combine, REFERENCE_TZ};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Airlines
// ============================================================================

/// Supported carriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Airline {
    Qantas,
    Jetstar,
}

const QANTAS_AIRCRAFT: &[&str] = &[
    "Bombardier Dash 8 Q400",
    "Boeing 737-800",
    "Airbus A330-200",
    "Airbus A330-300",
    "Boeing 787-9",
    "Airbus A380",
];

const JETSTAR_AIRCRAFT: &[&str] = &[
    "Airbus A320",
    "Airbus A320neo",
    "Airbus A321",
    "Airbus A321neo",
    "Boeing 787-8",
];

impl Airline {
    pub const ALL: [Airline; 2] = [Airline::Qantas, Airline::Jetstar];

    pub fn name(self) -> &'static str {
        match self {
            Airline::Qantas => "Qantas",
            Airline::Jetstar => "Jetstar",
        }
    }

    /// Aircraft offered in this airline's dropdown
    pub fn aircraft(self) -> &'static [&'static str] {
        match self {
            Airline::Qantas => QANTAS_AIRCRAFT,
            Airline::Jetstar => JETSTAR_AIRCRAFT,
        }
    }

    pub fn operates(self, aircraft: &str) -> bool {
        self.aircraft().contains(&aircraft)
    }

    /// Designator shown as a hint when asking for the flight number
    pub fn flight_prefix(self) -> &'static str {
        match self {
            Airline::Qantas => "QF",
            Airline::Jetstar => "JQ",
        }
    }
}

impl fmt::Display for Airline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Steps of the planning flow, in strict forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AirlineSelect,
    AircraftSelect,
    DepartureIata,
    ArrivalIata,
    DepartureTime,
    DepartureDate,
    FlightNumber,
    AwaitDispatch,
}

impl Stage {
    /// The stage that follows a confirmed value at this stage
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::AirlineSelect => Some(Stage::AircraftSelect),
            Stage::AircraftSelect => Some(Stage::DepartureIata),
            Stage::DepartureIata => Some(Stage::ArrivalIata),
            Stage::ArrivalIata => Some(Stage::DepartureTime),
            Stage::DepartureTime => Some(Stage::DepartureDate),
            Stage::DepartureDate => Some(Stage::FlightNumber),
            Stage::FlightNumber => Some(Stage::AwaitDispatch),
            Stage::AwaitDispatch => None,
        }
    }

    /// Whether this stage is answered by a free-text chat message
    pub fn accepts_text(self) -> bool {
        matches!(
            self,
            Stage::DepartureIata
                | Stage::ArrivalIata
                | Stage::DepartureTime
                | Stage::DepartureDate
                | Stage::FlightNumber
        )
    }

    /// Stages reached only once a session exists
    pub fn has_session(self) -> bool {
        self >= Stage::DepartureIata
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::AirlineSelect => "airline_select",
            Stage::AircraftSelect => "aircraft_select",
            Stage::DepartureIata => "departure_iata",
            Stage::ArrivalIata => "arrival_iata",
            Stage::DepartureTime => "departure_time",
            Stage::DepartureDate => "departure_date",
            Stage::FlightNumber => "flight_number",
            Stage::AwaitDispatch => "await_dispatch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of the route an airport belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    Departure,
    Arrival,
}

impl Leg {
    /// The input stage that asks for this leg's airport
    pub fn stage(self) -> Stage {
        match self {
            Leg::Departure => Stage::DepartureIata,
            Leg::Arrival => Stage::ArrivalIata,
        }
    }

    pub fn for_stage(stage: Stage) -> Option<Leg> {
        match stage {
            Stage::DepartureIata => Some(Leg::Departure),
            Stage::ArrivalIata => Some(Leg::Arrival),
            _ => None,
        }
    }
}

// ============================================================================
// Two-phase confirmation
// ============================================================================

/// A value the user entered but has not confirmed yet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Proposal {
    Airport { leg: Leg, airport: AirportInfo },
    Time { time: NaiveTime },
    Date {
        date: NaiveDate,
        departure_at: DateTime<Utc>,
    },
    FlightNumber { flight_number: String },
}

/// An outstanding confirmation prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfirmation {
    /// Identifies the prompt; buttons on any other prompt are stale
    pub prompt_id: String,
    pub stage: Stage,
    pub proposal: Proposal,
    pub issued_at: DateTime<Utc>,
}

impl PendingConfirmation {
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let elapsed = now.signed_duration_since(self.issued_at);
        elapsed.to_std().is_ok_and(|elapsed| elapsed > timeout)
    }
}

// ============================================================================
// Itinerary
// ============================================================================

/// The finished flight plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    pub airline: Airline,
    pub aircraft: String,
    pub departure: AirportInfo,
    pub arrival: AirportInfo,
    pub departure_at: DateTime<Utc>,
    pub flight_number: String,
}

impl Itinerary {
    /// `SYD → MEL`
    pub fn route(&self) -> String {
        format!("{} → {}", self.departure.code, self.arrival.code)
    }

    pub fn departure_local(&self) -> DateTime<Tz> {
        self.departure_at.with_timezone(&REFERENCE_TZ)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Conversation state for one user's active flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: String,
    /// Text input is only accepted from this channel
    pub channel_id: String,
    pub stage: Stage,
    pub airline: Airline,
    pub aircraft: String,
    pub departure: Option<AirportInfo>,
    pub arrival: Option<AirportInfo>,
    pub departure_time: Option<NaiveTime>,
    pub departure_date: Option<NaiveDate>,
    /// Derived from date and time; recomputed when either changes
    pub departure_at: Option<DateTime<Utc>>,
    pub flight_number: Option<String>,
    pub pending: Option<PendingConfirmation>,
    pub itinerary: Option<Itinerary>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// A single-field change to a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Stage(Stage),
    Departure(AirportInfo),
    Arrival(AirportInfo),
    DepartureTime(NaiveTime),
    DepartureDate(NaiveDate),
    FlightNumber(String),
    Pending(Option<PendingConfirmation>),
    Itinerary(Itinerary),
    Touch(DateTime<Utc>),
}

impl Session {
    /// Start a session once airline and aircraft are chosen
    pub fn new(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        airline: Airline,
        aircraft: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            stage: Stage::DepartureIata,
            airline,
            aircraft: aircraft.into(),
            departure: None,
            arrival: None,
            departure_time: None,
            departure_date: None,
            departure_at: None,
            flight_number: None,
            pending: None,
            itinerary: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Stage(stage) => self.stage = stage,
            SessionUpdate::Departure(airport) => self.departure = Some(airport),
            SessionUpdate::Arrival(airport) => self.arrival = Some(airport),
            SessionUpdate::DepartureTime(time) => {
                self.departure_time = Some(time);
                self.recompute_departure_at();
            }
            SessionUpdate::DepartureDate(date) => {
                self.departure_date = Some(date);
                self.recompute_departure_at();
            }
            SessionUpdate::FlightNumber(flight_number) => self.flight_number = Some(flight_number),
            SessionUpdate::Pending(pending) => self.pending = pending,
            SessionUpdate::Itinerary(itinerary) => self.itinerary = Some(itinerary),
            SessionUpdate::Touch(now) => self.last_activity = now,
        }
    }

    fn recompute_departure_at(&mut self) {
        self.departure_at = match (self.departure_date, self.departure_time) {
            (Some(date), Some(time)) => combine(date, time).ok(),
            _ => None,
        };
    }

    /// Build the itinerary from confirmed fields, using `flight_number` in
    /// place of the stored one. `None` while any leg or the instant is missing.
    pub fn itinerary_with(&self, flight_number: &str) -> Option<Itinerary> {
        Some(Itinerary {
            airline: self.airline,
            aircraft: self.aircraft.clone(),
            departure: self.departure.clone()?,
            arrival: self.arrival.clone()?,
            departure_at: self.departure_at?,
            flight_number: flight_number.to_string(),
        })
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now.signed_duration_since(self.last_activity)
            .to_std()
            .is_ok_and(|elapsed| elapsed > timeout)
    }
}

/// Immutable inputs to a transition besides the session and the event
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub now: DateTime<Utc>,
    /// Confirmation prompts older than this are stale
    pub prompt_timeout: Duration,
    /// Id given to a confirmation prompt if this transition issues one
    pub prompt_id: String,
}

/// Default lifetime of a confirmation prompt
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

impl FlowContext {
    pub fn new(now: DateTime<Utc>, prompt_timeout: Duration) -> Self {
        Self {
            now,
            prompt_timeout,
            prompt_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.prompt_id = prompt_id.into();
        self
    }
}
