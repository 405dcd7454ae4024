//! Pure state transition function
//!
//! Given the current session (if any) and an inbound command, decides the
//! session change and the effects to run. No I/O happens here; airport
//! lookups are requested as an effect and come back as `AirportResolved`.

use super::effect::{EndReason, Notice, Prompt, ValidationError};
use super::event::Inbound;
use super::state::{Leg, PendingConfirmation, Proposal, Session, SessionUpdate, Stage};
use super::{Effect, Event, FlowContext};
use crate::parse::{
    combine, parse_date, parse_flight_number, parse_iata, parse_time, reference_today,
};
use thiserror::Error;

/// How the stored session changes as a result of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    Unchanged,
    /// Insert a new session, replacing any existing one for the user
    Create(Box<Session>),
    /// Apply field updates in order
    Update(Vec<SessionUpdate>),
    End(EndReason),
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub change: SessionChange,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(change: SessionChange) -> Self {
        Self {
            change,
            effects: vec![],
        }
    }

    pub fn unchanged() -> Self {
        Self::new(SessionChange::Unchanged)
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No active flight planning session")]
    NoSession,
    #[error("Message was not sent in the session's channel")]
    WrongChannel,
    #[error("This isn't your flight planning session!")]
    NotOwner,
    #[error("This prompt has expired")]
    StaleInteraction,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    session: Option<&Session>,
    context: &FlowContext,
    inbound: Inbound,
) -> Result<TransitionResult, TransitionError> {
    if !inbound.is_from_owner() {
        return Err(TransitionError::NotOwner);
    }

    let event = match inbound.event {
        // ============================================================
        // Flow entry: no session required
        // ============================================================
        Event::StartPlan => {
            let result = match session {
                Some(existing) => TransitionResult::new(SessionChange::End(EndReason::Replaced))
                    .with_effect(Effect::ended(&existing.user_id, EndReason::Replaced)),
                None => TransitionResult::unchanged(),
            };
            return Ok(result.with_effect(Effect::Prompt(Prompt::ChooseAirline)));
        }

        // Menus from before the session started; only StartPlan begins again
        Event::SelectAirline { .. } | Event::SelectAircraft { .. } if session.is_some() => {
            return Err(TransitionError::StaleInteraction);
        }

        Event::SelectAirline { airline } => {
            return Ok(TransitionResult::unchanged()
                .with_effect(Effect::Prompt(Prompt::ChooseAircraft { airline })));
        }

        Event::SelectAircraft { airline, aircraft } => {
            if !airline.operates(&aircraft) {
                return Ok(TransitionResult::unchanged().with_effect(Effect::Reject {
                    airline: Some(airline),
                    stage: Stage::AircraftSelect,
                    error: ValidationError::UnknownAircraft { airline, aircraft },
                }));
            }

            let created = Session::new(
                inbound.user_id,
                inbound.channel_id,
                airline,
                aircraft,
                context.now,
            );
            let prompt = Effect::prompt_input(&created);
            return Ok(TransitionResult::new(SessionChange::Create(Box::new(created)))
                .with_effect(prompt));
        }

        event => event,
    };

    let session = session.ok_or(TransitionError::NoSession)?;

    // Components rendered for an earlier step must not act on a later one
    if let Some(expected) = inbound.expected_stage {
        if expected.has_session() && expected != session.stage && event != Event::Cancel {
            return Err(TransitionError::StaleInteraction);
        }
    }

    match event {
        // ============================================================
        // Free-text input
        // ============================================================
        Event::Text { content } => {
            if inbound.channel_id != session.channel_id {
                return Err(TransitionError::WrongChannel);
            }
            if !session.stage.accepts_text() {
                return Ok(TransitionResult::unchanged());
            }
            Ok(handle_text(session, context, &content))
        }

        Event::AirportResolved { leg, code, info } => {
            if session.stage != leg.stage() {
                return Err(TransitionError::StaleInteraction);
            }
            match info {
                Some(airport) => Ok(propose(
                    session,
                    context,
                    Proposal::Airport { leg, airport },
                )),
                None => Ok(touched(context).with_effect(Effect::reject(
                    Some(session),
                    session.stage,
                    ValidationError::AirportNotFound { code },
                ))),
            }
        }

        // ============================================================
        // Two-phase confirmation
        // ============================================================
        Event::Confirm { prompt_id } => {
            let pending = current_pending(session, &prompt_id)?;
            if pending.is_expired(context.now, context.prompt_timeout) {
                return Ok(expire_pending(session, context));
            }
            commit(session, context, pending.proposal.clone())
        }

        Event::Retry { prompt_id } => {
            let pending = current_pending(session, &prompt_id)?;
            if pending.is_expired(context.now, context.prompt_timeout) {
                return Ok(expire_pending(session, context));
            }
            let updates = vec![
                SessionUpdate::Pending(None),
                SessionUpdate::Touch(context.now),
            ];
            let prompt = Effect::prompt_input(&preview(session, &updates));
            Ok(TransitionResult::new(SessionChange::Update(updates)).with_effect(prompt))
        }

        // ============================================================
        // Completion
        // ============================================================
        Event::Send => {
            if session.stage != Stage::AwaitDispatch {
                return Err(TransitionError::InvalidTransition(format!(
                    "cannot send a flight plan at stage {}",
                    session.stage
                )));
            }
            let itinerary = session.itinerary.clone().ok_or_else(|| {
                TransitionError::InvalidTransition("no itinerary to send".to_string())
            })?;
            // Nothing touches the session while the preview is showing
            if session.is_idle(context.now, context.prompt_timeout) {
                return Ok(touched(context).with_effects([
                    Effect::Notice(Notice::Expired),
                    Effect::PresentItinerary(itinerary),
                ]));
            }
            Ok(TransitionResult::new(SessionChange::End(EndReason::Dispatched))
                .with_effect(Effect::Dispatch(itinerary))
                .with_effect(Effect::ended(&session.user_id, EndReason::Dispatched)))
        }

        Event::Cancel => Ok(
            TransitionResult::new(SessionChange::End(EndReason::Cancelled)).with_effects([
                Effect::Notice(Notice::Cancelled),
                Effect::ended(&session.user_id, EndReason::Cancelled),
            ]),
        ),

        Event::StartPlan | Event::SelectAirline { .. } | Event::SelectAircraft { .. } => {
            Err(TransitionError::InvalidTransition(
                "selection events are handled before session lookup".to_string(),
            ))
        }
    }
}

/// Parse text for the current stage. Any text at an input stage supersedes a
/// pending proposal.
fn handle_text(session: &Session, context: &FlowContext, content: &str) -> TransitionResult {
    let stage = session.stage;
    if let Some(leg) = Leg::for_stage(stage) {
        return match parse_iata(content) {
            Ok(code) => {
                superseded(session, context).with_effect(Effect::ResolveAirport { leg, code })
            }
            Err(e) => {
                superseded(session, context).with_effect(Effect::reject(Some(session), stage, e))
            }
        };
    }

    let proposal = match stage {
        Stage::DepartureTime => parse_time(content).map(|time| Proposal::Time { time }),
        Stage::DepartureDate => {
            let today = reference_today(context.now);
            parse_date(content, today).and_then(|date| {
                // The time is confirmed before the date is asked for
                let time = session.departure_time.unwrap_or_default();
                combine(date, time).map(|departure_at| Proposal::Date { date, departure_at })
            })
        }
        Stage::FlightNumber => parse_flight_number(content)
            .map(|flight_number| Proposal::FlightNumber { flight_number }),
        Stage::AirlineSelect
        | Stage::AircraftSelect
        | Stage::DepartureIata
        | Stage::ArrivalIata
        | Stage::AwaitDispatch => return TransitionResult::unchanged(),
    };

    match proposal {
        Ok(proposal) => propose(session, context, proposal),
        Err(e) => superseded(session, context).with_effect(Effect::reject(Some(session), stage, e)),
    }
}

/// Store a proposal as pending and ask the user to confirm it
fn propose(session: &Session, context: &FlowContext, proposal: Proposal) -> TransitionResult {
    let pending = PendingConfirmation {
        prompt_id: context.prompt_id.clone(),
        stage: session.stage,
        proposal,
        issued_at: context.now,
    };
    let updates = vec![
        SessionUpdate::Pending(Some(pending.clone())),
        SessionUpdate::Touch(context.now),
    ];
    let updated = preview(session, &updates);
    TransitionResult::new(SessionChange::Update(updates)).with_effect(Effect::RequestConfirmation {
        session: Box::new(updated),
        pending,
    })
}

/// Commit a confirmed proposal and move to the next stage
fn commit(
    session: &Session,
    context: &FlowContext,
    proposal: Proposal,
) -> Result<TransitionResult, TransitionError> {
    let next = session.stage.next().ok_or_else(|| {
        TransitionError::InvalidTransition(format!("nothing follows stage {}", session.stage))
    })?;

    let mut updates = match proposal {
        Proposal::Airport { leg: Leg::Departure, airport } => vec![SessionUpdate::Departure(airport)],
        Proposal::Airport { leg: Leg::Arrival, airport } => vec![SessionUpdate::Arrival(airport)],
        Proposal::Time { time } => vec![SessionUpdate::DepartureTime(time)],
        Proposal::Date { date, .. } => vec![SessionUpdate::DepartureDate(date)],
        Proposal::FlightNumber { flight_number } => {
            let itinerary = session.itinerary_with(&flight_number).ok_or_else(|| {
                TransitionError::InvalidTransition(
                    "itinerary is missing a confirmed field".to_string(),
                )
            })?;
            vec![
                SessionUpdate::FlightNumber(flight_number),
                SessionUpdate::Itinerary(itinerary),
            ]
        }
    };
    updates.extend([
        SessionUpdate::Pending(None),
        SessionUpdate::Stage(next),
        SessionUpdate::Touch(context.now),
    ]);

    let updated = preview(session, &updates);
    let effect = match (&updated.itinerary, next) {
        (Some(itinerary), Stage::AwaitDispatch) => Effect::PresentItinerary(itinerary.clone()),
        _ => Effect::prompt_input(&updated),
    };
    Ok(TransitionResult::new(SessionChange::Update(updates)).with_effect(effect))
}

fn current_pending<'a>(
    session: &'a Session,
    prompt_id: &str,
) -> Result<&'a PendingConfirmation, TransitionError> {
    match &session.pending {
        Some(pending) if pending.prompt_id == prompt_id && pending.stage == session.stage => {
            Ok(pending)
        }
        _ => Err(TransitionError::StaleInteraction),
    }
}

/// Drop an expired proposal and ask for the input again
fn expire_pending(session: &Session, context: &FlowContext) -> TransitionResult {
    let updates = vec![
        SessionUpdate::Pending(None),
        SessionUpdate::Touch(context.now),
    ];
    let prompt = Effect::prompt_input(&preview(session, &updates));
    TransitionResult::new(SessionChange::Update(updates))
        .with_effect(Effect::Notice(Notice::Expired))
        .with_effect(prompt)
}

fn superseded(session: &Session, context: &FlowContext) -> TransitionResult {
    if session.pending.is_some() {
        TransitionResult::new(SessionChange::Update(vec![
            SessionUpdate::Pending(None),
            SessionUpdate::Touch(context.now),
        ]))
    } else {
        touched(context)
    }
}

fn touched(context: &FlowContext) -> TransitionResult {
    TransitionResult::new(SessionChange::Update(vec![SessionUpdate::Touch(context.now)]))
}

/// The session as it will look once `updates` are applied
fn preview(session: &Session, updates: &[SessionUpdate]) -> Session {
    let mut updated = session.clone();
    for update in updates {
        updated.apply(update.clone());
    }
    updated
}

/// The stored session after `change`, without touching a store
#[cfg(test)]
pub(crate) fn preview_change(session: Option<&Session>, change: &SessionChange) -> Option<Session> {
    match change {
        SessionChange::Unchanged => session.cloned(),
        SessionChange::Create(created) => Some((**created).clone()),
        SessionChange::Update(updates) => session.map(|s| preview(s, updates)),
        SessionChange::End(_) => None,
    }
}
