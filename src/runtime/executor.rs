//! Flow engine executor
//!
//! Runs one inbound command to completion: claims the user's single-flight
//! slot, feeds the command through the pure transition function, applies
//! the session change to the store and executes the effects. Effects that
//! produce follow-up events (airport resolution) loop back through the
//! transition function before the reply is returned.

use super::traits::{AirportLookup, DispatchError, Dispatcher};
use crate::airport::AirportResolver;
use crate::render::{self, OutboundMessage};
use crate::session::{SessionError, SessionStore};
use crate::state_machine::{
    transition, Airline, Effect, Event, FlowContext, Inbound, Notice, Prompt, SessionChange,
    TransitionError,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What the gateway should do with an inbound command's result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    /// Another event for the same user was still being processed
    pub dropped: bool,
    /// Not meant for the flow (wrong channel, no session)
    pub ignored: bool,
    pub replies: Vec<OutboundMessage>,
}

impl Outcome {
    fn dropped() -> Self {
        Self {
            dropped: true,
            ..Self::default()
        }
    }

    pub fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    pub fn replies(replies: Vec<OutboundMessage>) -> Self {
        Self {
            replies,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
enum EngineError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Generic flow engine that can work with any lookup and dispatcher
pub struct FlowEngine<L, D>
where
    L: AirportLookup + 'static,
    D: Dispatcher + 'static,
{
    store: Arc<SessionStore>,
    resolver: AirportResolver<L>,
    dispatcher: D,
    prompt_timeout: Duration,
}

impl<L, D> FlowEngine<L, D>
where
    L: AirportLookup + 'static,
    D: Dispatcher + 'static,
{
    pub fn new(
        store: Arc<SessionStore>,
        lookup: L,
        dispatcher: D,
        prompt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver: AirportResolver::new(lookup),
            dispatcher,
            prompt_timeout,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Process one inbound command
    pub async fn handle(&self, inbound: Inbound) -> Outcome {
        let user_id = inbound.user_id.clone();
        let kind = inbound.event.kind();
        let interaction = inbound.event.is_interaction();

        let Some(_guard) = self.store.try_begin(&user_id) else {
            tracing::info!(user_id = %user_id, event = kind, "Event dropped, another is in flight");
            return Outcome::dropped();
        };

        match self.process(inbound).await {
            Ok(replies) => Outcome::replies(replies),
            Err(EngineError::Transition(e)) => {
                tracing::debug!(user_id = %user_id, event = kind, error = %e, "Transition rejected");
                transition_failed(&e, interaction)
            }
            Err(EngineError::Session(e)) => {
                tracing::error!(user_id = %user_id, event = kind, error = %e, "Session store out of sync");
                self.store.end(&user_id);
                tracing::info!(user_id = %user_id, reason = "failed", "Session ended");
                Outcome::replies(vec![render::notice(Notice::InternalError)])
            }
        }
    }

    /// Post the airline's check-in closed announcement for a dispatched flight
    pub async fn check_in_closed(
        &self,
        airline: Airline,
        flight_number: &str,
    ) -> Result<String, DispatchError> {
        let message = render::check_in_closed(airline, flight_number);
        let channel_id = self.dispatcher.announce(&message).await?;
        tracing::info!(
            airline = %airline,
            flight_number = %flight_number,
            channel_id = %channel_id,
            "Check-in closed announced"
        );
        Ok(channel_id)
    }

    async fn process(&self, inbound: Inbound) -> Result<Vec<OutboundMessage>, EngineError> {
        let context = FlowContext::new(Utc::now(), self.prompt_timeout);
        let user_id = inbound.user_id.clone();
        let channel_id = inbound.channel_id.clone();
        let mut replies = Vec::new();

        // Events generated by effects are processed in the same pass
        let mut events_to_process = vec![inbound];

        while let Some(current) = events_to_process.pop() {
            let internal = matches!(current.event, Event::AirportResolved { .. });
            let session = self.store.get(&user_id);

            let result = match transition(session.as_ref(), &context, current) {
                Ok(r) => r,
                Err(TransitionError::StaleInteraction) if internal => {
                    tracing::debug!(user_id = %user_id, "Discarding airport result for a finished stage");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.apply_change(&user_id, result.change)?;

            for effect in result.effects {
                if let Some(event) = self.execute_effect(&context, effect, &mut replies).await {
                    events_to_process.push(Inbound::new(&user_id, &channel_id, event));
                }
            }
        }

        Ok(replies)
    }

    fn apply_change(&self, user_id: &str, change: SessionChange) -> Result<(), SessionError> {
        match change {
            SessionChange::Unchanged => {}
            SessionChange::Create(session) => {
                tracing::info!(
                    user_id = %user_id,
                    airline = %session.airline,
                    aircraft = %session.aircraft,
                    "Session started"
                );
                self.store.create(*session);
            }
            SessionChange::Update(updates) => {
                for update in updates {
                    self.store.update(user_id, update)?;
                }
                if let Some(session) = self.store.get(user_id) {
                    tracing::debug!(user_id = %user_id, stage = %session.stage, "Session updated");
                }
            }
            SessionChange::End(_) => {
                self.store.end(user_id);
            }
        }
        Ok(())
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(
        &self,
        context: &FlowContext,
        effect: Effect,
        replies: &mut Vec<OutboundMessage>,
    ) -> Option<Event> {
        match effect {
            Effect::Prompt(prompt) => {
                replies.push(match prompt {
                    Prompt::ChooseAirline => render::choose_airline(),
                    Prompt::ChooseAircraft { airline } => render::choose_aircraft(airline),
                    Prompt::Input { session } => render::input_prompt(&session, context.now),
                });
                None
            }

            Effect::ResolveAirport { leg, code } => {
                let info = self.resolver.resolve(&code).await;
                Some(Event::AirportResolved { leg, code, info })
            }

            Effect::RequestConfirmation { session, pending } => {
                replies.push(render::confirmation(&session, &pending));
                None
            }

            Effect::Reject {
                airline,
                stage,
                error,
            } => {
                tracing::info!(
                    airline = ?airline,
                    stage = %stage,
                    error = %error,
                    "Input rejected"
                );
                replies.push(render::rejection(&error));
                None
            }

            Effect::PresentItinerary(itinerary) => {
                replies.push(render::itinerary_preview(&itinerary));
                None
            }

            Effect::Dispatch(itinerary) => {
                match self.dispatcher.dispatch(&itinerary).await {
                    Ok(channel_id) => {
                        tracing::info!(
                            flight_number = %itinerary.flight_number,
                            route = %itinerary.route(),
                            channel_id = %channel_id,
                            "Flight plan dispatched"
                        );
                        replies.push(render::dispatch_sent(&channel_id));
                    }
                    Err(e) => {
                        tracing::warn!(
                            flight_number = %itinerary.flight_number,
                            error = %e,
                            "Flight plan dispatch failed"
                        );
                        replies.push(render::notice(Notice::DispatchFailed));
                    }
                }
                None
            }

            Effect::Notice(notice) => {
                replies.push(render::notice(notice));
                None
            }

            Effect::SessionEnded { user_id, reason } => {
                tracing::info!(user_id = %user_id, reason = reason.as_str(), "Session ended");
                None
            }
        }
    }
}

/// Map a rejected command to what the user sees
fn transition_failed(error: &TransitionError, interaction: bool) -> Outcome {
    match error {
        TransitionError::NotOwner => Outcome::replies(vec![render::notice(Notice::NotOwner)]),
        TransitionError::WrongChannel => Outcome::ignored(),
        TransitionError::NoSession if !interaction => Outcome::ignored(),
        TransitionError::NoSession
        | TransitionError::StaleInteraction
        | TransitionError::InvalidTransition(_) => {
            Outcome::replies(vec![render::notice(Notice::Expired)])
        }
    }
}
