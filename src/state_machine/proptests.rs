//! Property-based tests for the state machine
//!
//! These tests drive random command sequences through the transition
//! function and check that the flow's invariants hold throughout.

use super::transition::preview_change;
use super::*;
use crate::airport::known_airport;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

fn context(step: usize) -> FlowContext {
    FlowContext::new(now(), Duration::from_secs(60)).with_prompt_id(format!("prompt-{step}"))
}

/// Confirmed fields only; pending proposal and activity time excluded
fn confirmed(session: &Session) -> Session {
    let mut copy = session.clone();
    copy.pending = None;
    copy.last_activity = session.created_at;
    copy
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Event(Event),
    /// Confirm the current proposal, or a made-up prompt when there is none
    ConfirmCurrent,
    RetryCurrent,
    FromIntruder(Event),
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("SYD"),
        Just("mel"),
        Just("ZZZ"),
        Just("SY1"),
        Just("14:30"),
        Just("2:30 PM"),
        Just("1430PM"),
        Just("tomorrow"),
        Just("today"),
        Just("05/01/26"),
        Just("25 Jan 2027"),
        Just("QF1"),
        Just("1"),
        Just("hello there"),
    ]
    .prop_map(str::to_string)
}

fn arb_airline() -> impl Strategy<Value = Airline> {
    prop_oneof![Just(Airline::Qantas), Just(Airline::Jetstar)]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => Just(Event::StartPlan),
        1 => arb_airline().prop_map(|airline| Event::SelectAirline { airline }),
        2 => (arb_airline(), prop_oneof![Just("Boeing 737-800"), Just("Airbus A320")]).prop_map(
            |(airline, aircraft)| Event::SelectAircraft {
                airline,
                aircraft: aircraft.to_string(),
            }
        ),
        6 => arb_text().prop_map(|content| Event::Text { content }),
        1 => Just(Event::Send),
        1 => Just(Event::Cancel),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => arb_event().prop_map(Step::Event),
        4 => Just(Step::ConfirmCurrent),
        1 => Just(Step::RetryCurrent),
        1 => arb_event().prop_map(Step::FromIntruder),
    ]
}

fn current_prompt(session: Option<&Session>) -> String {
    session
        .and_then(|s| s.pending.as_ref())
        .map_or_else(|| "no-prompt".to_string(), |p| p.prompt_id.clone())
}

/// Run one command, feeding airport lookups back the way the executor does
fn run(
    session: Option<Session>,
    inbound: Inbound,
    step: usize,
) -> (Option<Session>, Result<Vec<Effect>, TransitionError>) {
    let ctx = context(step);
    let result = match transition(session.as_ref(), &ctx, inbound.clone()) {
        Ok(result) => result,
        Err(e) => return (session, Err(e)),
    };
    let mut next = preview_change(session.as_ref(), &result.change);
    let mut effects = result.effects;

    let lookups: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ResolveAirport { leg, code } => Some((*leg, code.clone())),
            _ => None,
        })
        .collect();
    for (leg, code) in lookups {
        let resolved = Inbound::new(&inbound.user_id, &inbound.channel_id, Event::AirportResolved {
            leg,
            info: known_airport(&code),
            code,
        });
        if let Ok(result) = transition(next.as_ref(), &ctx, resolved) {
            next = preview_change(next.as_ref(), &result.change);
            effects.extend(result.effects);
        }
    }
    (next, Ok(effects))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Within one session the stage only moves forward
    #[test]
    fn stage_never_regresses(steps in prop::collection::vec(arb_step(), 1..40)) {
        let mut session: Option<Session> = None;
        for (i, step) in steps.into_iter().enumerate() {
            let inbound = match step {
                Step::Event(event) => Inbound::new("user-1", "chan-1", event),
                Step::ConfirmCurrent => Inbound::new("user-1", "chan-1", Event::Confirm {
                    prompt_id: current_prompt(session.as_ref()),
                }),
                Step::RetryCurrent => Inbound::new("user-1", "chan-1", Event::Retry {
                    prompt_id: current_prompt(session.as_ref()),
                }),
                Step::FromIntruder(event) => {
                    Inbound::new("user-1", "chan-1", event).with_actor("user-2")
                }
            };
            let before = session.clone();
            let (after, _) = run(session, inbound, i);

            if let (Some(before), Some(after)) = (&before, &after) {
                prop_assert!(after.stage >= before.stage);
                prop_assert_eq!(after.airline, before.airline);
            }
            if let Some(after) = &after {
                prop_assert!(after.stage.has_session());
                prop_assert_eq!(after.itinerary.is_some(), after.stage == Stage::AwaitDispatch);
            }
            session = after;
        }
    }

    /// Text input only ever produces a proposal; confirmed fields stay put
    #[test]
    fn text_never_touches_confirmed_fields(
        prefix in prop::collection::vec(arb_step(), 0..20),
        content in arb_text(),
    ) {
        let mut session = Some(Session::new("user-1", "chan-1", Airline::Qantas, "Boeing 737-800", now()));
        for (i, step) in prefix.into_iter().enumerate() {
            let inbound = match step {
                Step::ConfirmCurrent => Inbound::new("user-1", "chan-1", Event::Confirm {
                    prompt_id: current_prompt(session.as_ref()),
                }),
                Step::Event(Event::Text { content }) => {
                    Inbound::new("user-1", "chan-1", Event::Text { content })
                }
                _ => continue,
            };
            session = run(session, inbound, i).0;
        }

        let Some(before) = session else { return Ok(()); };
        let (after, _) = run(
            Some(before.clone()),
            Inbound::new("user-1", "chan-1", Event::Text { content }),
            100,
        );
        let after = after.expect("text never ends a session");
        prop_assert_eq!(confirmed(&after), confirmed(&before));
    }

    /// Retry discards the proposal and nothing else
    #[test]
    fn retry_only_clears_proposal(content in arb_text(), stage_steps in 0usize..6) {
        let mut session = Some(Session::new("user-1", "chan-1", Airline::Jetstar, "Airbus A320", now()));
        let script = ["SYD", "MEL", "14:30", "tomorrow", "JQ30"];
        for (i, input) in script.iter().take(stage_steps).enumerate() {
            session = run(session, Inbound::new("user-1", "chan-1", Event::Text { content: (*input).to_string() }), i * 2).0;
            let prompt_id = current_prompt(session.as_ref());
            session = run(session, Inbound::new("user-1", "chan-1", Event::Confirm { prompt_id }), i * 2 + 1).0;
        }
        let proposed = run(session, Inbound::new("user-1", "chan-1", Event::Text { content }), 50).0;
        let Some(proposed) = proposed else { return Ok(()); };
        let Some(pending) = proposed.pending.clone() else { return Ok(()); };

        let (after, effects) = run(
            Some(proposed.clone()),
            Inbound::new("user-1", "chan-1", Event::Retry { prompt_id: pending.prompt_id }),
            51,
        );
        let after = after.expect("retry keeps the session");
        prop_assert!(effects.is_ok());
        prop_assert!(after.pending.is_none());
        prop_assert_eq!(after.stage, proposed.stage);
        prop_assert_eq!(confirmed(&after), confirmed(&proposed));
    }

    /// Commands from someone other than the owner never change anything
    #[test]
    fn intruders_are_always_rejected(event in arb_event(), at_stage in 0usize..4) {
        let mut session = Some(Session::new("user-1", "chan-1", Airline::Qantas, "Airbus A380", now()));
        let script = ["SYD", "MEL", "14:30"];
        for (i, input) in script.iter().take(at_stage).enumerate() {
            session = run(session, Inbound::new("user-1", "chan-1", Event::Text { content: (*input).to_string() }), i * 2).0;
            let prompt_id = current_prompt(session.as_ref());
            session = run(session, Inbound::new("user-1", "chan-1", Event::Confirm { prompt_id }), i * 2 + 1).0;
        }

        let (after, result) = run(session.clone(), Inbound::new("user-1", "chan-1", event).with_actor("user-2"), 99);
        prop_assert_eq!(result.unwrap_err(), TransitionError::NotOwner);
        prop_assert_eq!(after, session);
    }
}
