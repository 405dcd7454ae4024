//! Outbound message rendering
//!
//! One function per stage or outcome. Every card the planner shows is an
//! [`OutboundMessage`]: an embed-like body plus the buttons or dropdown the
//! gateway should attach. Pressed components come back as an [`Action`].

pub mod loyalty;

use crate::airport::AirportInfo;
use crate::parse::REFERENCE_TZ;
use crate::state_machine::{
    Airline, Itinerary, Leg, Notice, PendingConfirmation, Proposal, Session, Stage,
    ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const INFO_COLOR: u32 = 0x3498DB;
const ERROR_COLOR: u32 = 0xE74C3C;
const SUCCESS_COLOR: u32 = 0x2ECC71;

/// What a pressed button or chosen dropdown option asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Airline { airline: Airline },
    Aircraft { airline: Airline, aircraft: String },
    Confirm { prompt_id: String },
    Retry { prompt_id: String },
    Send,
    Cancel,
    CheckInClosed {
        airline: Airline,
        flight_number: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub style: ButtonStyle,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectMenu {
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered reply, announcement or notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectMenu>,
    /// Stage the attached components belong to; echoed back as `expected_stage`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Only visible to the user who triggered it
    pub ephemeral: bool,
}

impl OutboundMessage {
    pub fn new(color: u32) -> Self {
        Self {
            title: None,
            description: None,
            color,
            fields: vec![],
            footer: None,
            buttons: vec![],
            select: None,
            stage: None,
            ephemeral: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_button(mut self, label: impl Into<String>, style: ButtonStyle, action: Action) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            style,
            action,
        });
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

// ============================================================================
// Airline presentation
// ============================================================================

struct Branding {
    color: u32,
    emoji: &'static str,
    footer: &'static str,
    services: &'static str,
}

fn branding(airline: Airline) -> Branding {
    match airline {
        Airline::Qantas => Branding {
            color: 0xE4_00_00,
            emoji: "🦘",
            footer: "Qantas Airways • The Spirit of Australia",
            services: "📶 Wi-Fi Available  •  🍽️ In-Flight Service  •  🎬 Entertainment",
        },
        Airline::Jetstar => Branding {
            color: 0xFF_66_00,
            emoji: "⭐",
            footer: "Jetstar Airways • All Day, Every Day, Low Fares",
            services: "🎵 In-Flight Entertainment  •  📞 Customer Service",
        },
    }
}

/// `Monday, 2 March 2026 at 14:30 AEDT`
pub fn format_departure(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&REFERENCE_TZ)
        .format("%A, %-d %B %Y at %H:%M %Z")
        .to_string()
}

// ============================================================================
// Flow prompts
// ============================================================================

pub fn choose_airline() -> OutboundMessage {
    let mut message = OutboundMessage::new(INFO_COLOR)
        .with_title("✈️ Flight Planning")
        .with_description("Which airline are you planning to fly with?")
        .with_footer("Click a button below to select your airline")
        .with_stage(Stage::AirlineSelect);
    for airline in Airline::ALL {
        let style = match airline {
            Airline::Qantas => ButtonStyle::Danger,
            Airline::Jetstar => ButtonStyle::Success,
        };
        message = message.with_button(
            format!("{} {}", branding(airline).emoji, airline),
            style,
            Action::Airline { airline },
        );
    }
    message
}

pub fn choose_aircraft(airline: Airline) -> OutboundMessage {
    let brand = branding(airline);
    let options = airline
        .aircraft()
        .iter()
        .map(|aircraft| SelectOption {
            label: format!("✈️ {aircraft}"),
            action: Action::Aircraft {
                airline,
                aircraft: (*aircraft).to_string(),
            },
        })
        .collect();

    let mut message = OutboundMessage::new(brand.color)
        .with_title(format!("{} {airline} Flight Selected", brand.emoji))
        .with_description("Please select which aircraft will be operating your flight:")
        .with_stage(Stage::AircraftSelect);
    message.select = Some(SelectMenu {
        placeholder: "Choose an aircraft...".to_string(),
        options,
    });
    message
}

/// Ask for the text input of the session's current stage
pub fn input_prompt(session: &Session, now: DateTime<Utc>) -> OutboundMessage {
    let brand = branding(session.airline);
    let local_now = now.with_timezone(&REFERENCE_TZ);

    let message = match session.stage {
        Stage::AirlineSelect => return choose_airline(),
        Stage::AircraftSelect => return choose_aircraft(session.airline),
        Stage::AwaitDispatch => {
            if let Some(itinerary) = &session.itinerary {
                return itinerary_preview(itinerary);
            }
            return choose_airline();
        }
        Stage::DepartureIata => OutboundMessage::new(brand.color)
            .with_title("🛫 Departure Airport")
            .with_description(
                "Please enter the **3-letter IATA code** of your departure airport.\n\nExample: `SYD` for Sydney, `MEL` for Melbourne",
            )
            .with_field("Airline", format!("{} {}", brand.emoji, session.airline), true)
            .with_field("Aircraft", format!("✈️ {}", session.aircraft), true)
            .with_footer("Type the 3-letter airport code in chat"),
        Stage::ArrivalIata => OutboundMessage::new(brand.color)
            .with_title("🛬 Arrival Airport")
            .with_description(
                "Please enter the **3-letter IATA code** of your arrival airport.\n\nExample: `MEL` for Melbourne, `BNE` for Brisbane",
            )
            .with_footer("Type the 3-letter airport code in chat"),
        Stage::DepartureTime => OutboundMessage::new(brand.color)
            .with_title("🕐 Departure Time")
            .with_description(format!(
                "Please enter your departure time in **Sydney time**.\n\n**Current Sydney time:** {}",
                local_now.format("%H:%M %Z")
            ))
            .with_field("Accepted Formats", crate::parse::ParseError::InvalidTime.hint(), false)
            .with_footer("Type the departure time in chat"),
        Stage::DepartureDate => OutboundMessage::new(brand.color)
            .with_title("📅 Departure Date")
            .with_description(format!(
                "Please enter your departure date.\n\n**Current date:** {}",
                local_now.format("%d/%m/%Y")
            ))
            .with_field("Accepted Formats", crate::parse::ParseError::InvalidDate.hint(), false)
            .with_footer("Type the departure date in chat"),
        Stage::FlightNumber => OutboundMessage::new(brand.color)
            .with_title("✈️ Flight Number")
            .with_description(format!(
                "Please enter your flight number.\n\n**Tip:** {} flight numbers start with `{}`",
                session.airline,
                session.airline.flight_prefix()
            ))
            .with_field(
                "Examples",
                crate::parse::ParseError::InvalidFlightNumber.hint(),
                false,
            )
            .with_footer("Type the flight number in chat"),
    };
    message.with_stage(session.stage)
}

fn airport_card(message: OutboundMessage, airport: &AirportInfo) -> OutboundMessage {
    let mut message = message;
    if let Some(city) = &airport.city {
        message = message.with_field("City", city, true);
    }
    if let Some(country) = &airport.country {
        message = message.with_field("Country", country, true);
    }
    message
}

/// Show a proposed value with confirm and retry buttons
pub fn confirmation(session: &Session, pending: &PendingConfirmation) -> OutboundMessage {
    let message = match &pending.proposal {
        Proposal::Airport { leg, airport } => {
            let which = match leg {
                Leg::Departure => "departure",
                Leg::Arrival => "arrival",
            };
            let title = match leg {
                Leg::Departure => "✅ Departure Airport Found!",
                Leg::Arrival => "✅ Arrival Airport Found!",
            };
            airport_card(
                OutboundMessage::new(SUCCESS_COLOR)
                    .with_title(title)
                    .with_description(format!(
                        "Is this the correct {which} airport?\n\n**{}**\n`{}`",
                        airport.name, airport.code
                    )),
                airport,
            )
        }
        Proposal::Time { time } => OutboundMessage::new(INFO_COLOR)
            .with_title("🕐 Confirm Departure Time")
            .with_description(format!(
                "Is this the correct departure time?\n\n**Sydney Time:** {}",
                time.format("%H:%M")
            )),
        Proposal::Date { departure_at, .. } => OutboundMessage::new(INFO_COLOR)
            .with_title("📅 Confirm Departure Date")
            .with_description(format!(
                "Is this the correct departure date?\n\n**Departs:** {}",
                format_departure(*departure_at)
            )),
        Proposal::FlightNumber { flight_number } => {
            let mut message = OutboundMessage::new(branding(session.airline).color)
                .with_title("✈️ Confirm Flight Number")
                .with_description(format!(
                    "Is this the correct flight number?\n\n**{flight_number}**"
                ));
            if let Some(itinerary) = session.itinerary_with(flight_number) {
                message = message
                    .with_field("Route", itinerary.route(), true)
                    .with_field("Aircraft", &itinerary.aircraft, true)
                    .with_field("Departs", format_departure(itinerary.departure_at), false);
            }
            message
        }
    };

    message
        .with_footer("Confirm below")
        .with_button(
            "✅ Yes, Correct",
            ButtonStyle::Success,
            Action::Confirm {
                prompt_id: pending.prompt_id.clone(),
            },
        )
        .with_button(
            "❌ No, Try Again",
            ButtonStyle::Danger,
            Action::Retry {
                prompt_id: pending.prompt_id.clone(),
            },
        )
        .with_stage(pending.stage)
}

/// Explain why input was not accepted
pub fn rejection(error: &ValidationError) -> OutboundMessage {
    let description = match error {
        ValidationError::Parse(parse) => match parse {
            crate::parse::ParseError::InvalidIata => format!("❌ {parse}"),
            crate::parse::ParseError::InvalidFlightNumber => {
                format!("❌ {parse}\n{}", parse.hint())
            }
            _ => format!(
                "❌ {parse} Please enter it in one of these formats:\n{}",
                parse.hint()
            ),
        },
        ValidationError::AirportNotFound { code } => {
            format!("❌ Could not find an airport with code **{code}**. Please try again.")
        }
        ValidationError::UnknownAircraft { airline, aircraft } => {
            format!("❌ {aircraft} is not in the {airline} fleet. Please pick one from the list.")
        }
    };
    OutboundMessage::new(ERROR_COLOR).with_description(description)
}

// ============================================================================
// Itinerary
// ============================================================================

fn itinerary_card(itinerary: &Itinerary) -> OutboundMessage {
    let brand = branding(itinerary.airline);
    let details = [
        format!("🗺️ **Route:** {}", itinerary.route()),
        format!("💺 **Aircraft:** {}", itinerary.aircraft),
        "📣 **Status:** Confirmed".to_string(),
    ]
    .join("\n");

    OutboundMessage::new(brand.color)
        .with_field(
            format!("{} FLIGHT CONFIRMATION", brand.emoji),
            format!("**Flight {}** • {}", itinerary.flight_number, itinerary.aircraft),
            false,
        )
        .with_field(
            "🛫 DEPARTURE",
            format!(
                "**{}** {}\n{}",
                itinerary.departure.code,
                itinerary.departure.name,
                format_departure(itinerary.departure_at)
            ),
            true,
        )
        .with_field(
            "🛬 ARRIVAL",
            format!("**{}** {}", itinerary.arrival.code, itinerary.arrival.name),
            true,
        )
        .with_field("ℹ️ FLIGHT INFORMATION", details, false)
        .with_field("✈️ SERVICES", brand.services, false)
        .with_footer(brand.footer)
}

/// Final review shown to the planner, with send and cancel buttons
pub fn itinerary_preview(itinerary: &Itinerary) -> OutboundMessage {
    itinerary_card(itinerary)
        .with_button("📤 Send Flight Plan", ButtonStyle::Success, Action::Send)
        .with_button("❌ Don't Send", ButtonStyle::Danger, Action::Cancel)
        .with_stage(Stage::AwaitDispatch)
}

/// The itinerary as posted to the destination channel
pub fn dispatched_itinerary(itinerary: &Itinerary) -> OutboundMessage {
    itinerary_card(itinerary).with_button(
        "🔒 Check-In Closed",
        ButtonStyle::Primary,
        Action::CheckInClosed {
            airline: itinerary.airline,
            flight_number: itinerary.flight_number.clone(),
        },
    )
}

pub fn dispatch_sent(channel_id: &str) -> OutboundMessage {
    OutboundMessage::new(SUCCESS_COLOR)
        .with_title("✅ Flight Plan Sent!")
        .with_description(format!(
            "Your flight plan has been successfully sent to #{channel_id}!"
        ))
}

/// Airline-templated follow-up announcement for a dispatched flight
pub fn check_in_closed(airline: Airline, flight_number: &str) -> OutboundMessage {
    let brand = branding(airline);
    OutboundMessage::new(brand.color)
        .with_field(
            format!("{} CHECK-IN STATUS", brand.emoji),
            format!("**Flight {flight_number}**"),
            false,
        )
        .with_field("", "━━━━━━━━━━━━━━━━━━━━━━", false)
        .with_field(
            "🔒 CHECK-IN CLOSED",
            format!(
                "Online check-in for this flight has now closed.\n\nPassengers are advised to proceed directly to the airport and complete check-in at the {airline} service counter."
            ),
            false,
        )
        .with_field(
            "📣 IMPORTANT INFORMATION",
            "• Arrive at the airport at least **2 hours** before departure for domestic flights\n• Arrive at least **3 hours** before departure for international flights\n• Have your booking reference and identification ready",
            false,
        )
        .with_field(
            "☎️ NEED ASSISTANCE?",
            format!(
                "Visit the {airline} service desk or contact our customer service team for support."
            ),
            false,
        )
        .with_footer(brand.footer)
}

pub fn check_in_closed_sent(channel_id: &str) -> OutboundMessage {
    OutboundMessage::new(SUCCESS_COLOR)
        .with_title("✅ Check-In Closed Message Sent!")
        .with_description(format!(
            "The check-in closed notification has been sent to #{channel_id}!"
        ))
}

// ============================================================================
// Notices
// ============================================================================

pub fn notice(notice: Notice) -> OutboundMessage {
    match notice {
        Notice::Cancelled => OutboundMessage::new(ERROR_COLOR)
            .with_title("❌ Flight Plan Cancelled")
            .with_description("Your flight plan was not sent. Session closed."),
        Notice::NotOwner => OutboundMessage::new(ERROR_COLOR)
            .with_description("This isn't your flight planning session!")
            .ephemeral(),
        Notice::Expired => OutboundMessage::new(ERROR_COLOR)
            .with_description("⌛ This prompt has expired. Please enter the value again.")
            .ephemeral(),
        Notice::DispatchFailed => OutboundMessage::new(ERROR_COLOR)
            .with_title("❌ Flight Plan Not Sent")
            .with_description(
                "The flight plan channel is not available, so your flight plan could not be sent. Session closed.",
            ),
        Notice::InternalError => OutboundMessage::new(ERROR_COLOR)
            .with_title("❌ Something Went Wrong")
            .with_description("Your flight planning session hit an error and was closed. Please start again."),
    }
}
