//! Flight planning state machine
//!
//! Pure transitions over a typed session: the engine feeds in inbound
//! commands and executes the effects that come back.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notice, Prompt, ValidationError};
pub use event::{Event, Inbound};
pub use state::{
    Airline, FlowContext, Itinerary, Leg, PendingConfirmation, Proposal, Session, SessionUpdate,
    Stage, DEFAULT_PROMPT_TIMEOUT,
};
pub use transition::{transition, SessionChange, TransitionError};
