//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AddFlightRequest, CheckInClosedRequest, ErrorResponse, FlightAddedResponse,
    InteractionRequest, LeaderboardQuery, LeaderboardResponse, LinkRobloxRequest, MemberResponse,
    MessageRequest, PlanRequest, SignupRequest,
};
use super::AppState;
use crate::db::DbError;
use crate::loyalty::{Cabin, FlightCredit, LeaderboardSort, NewMember};
use crate::render::{self, Action};
use crate::runtime::{accepts_text_message, DispatchError, Outcome};
use crate::state_machine::{Airline, Event, Inbound, Notice, Session};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

const LEADERBOARD_SIZE: usize = 10;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Planning flow
        .route("/api/plan", post(start_plan))
        .route("/api/interactions", post(interact))
        .route("/api/messages", post(receive_message))
        .route("/api/sessions/:user_id", get(get_session))
        // Destination channels
        .route("/api/channels/:channel_id/stream", get(stream_channel))
        .route("/api/flights/check-in-closed", post(check_in_closed))
        // Frequent flyer program
        .route("/api/loyalty/members", post(signup))
        .route("/api/loyalty/members/:user_id", get(member_status))
        .route("/api/loyalty/members/:user_id/roblox", put(link_roblox))
        .route("/api/loyalty/members/:user_id/flights", get(flight_history))
        .route("/api/loyalty/flights", post(add_flight))
        .route("/api/loyalty/leaderboard", get(leaderboard))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Planning Flow
// ============================================================

async fn start_plan(State(state): State<AppState>, Json(req): Json<PlanRequest>) -> Json<Outcome> {
    let inbound = Inbound::new(req.user_id, req.channel_id, Event::StartPlan);
    Json(state.engine.handle(inbound).await)
}

async fn interact(
    State(state): State<AppState>,
    Json(req): Json<InteractionRequest>,
) -> Result<Json<Outcome>, AppError> {
    let owner_id = req.owner_id.unwrap_or_else(|| req.user_id.clone());

    let event = match req.action {
        Action::Airline { airline } => Event::SelectAirline { airline },
        Action::Aircraft { airline, aircraft } => Event::SelectAircraft { airline, aircraft },
        Action::Confirm { prompt_id } => Event::Confirm { prompt_id },
        Action::Retry { prompt_id } => Event::Retry { prompt_id },
        Action::Send => Event::Send,
        Action::Cancel => Event::Cancel,
        Action::CheckInClosed {
            airline,
            flight_number,
        } => {
            let outcome =
                announce_check_in_closed(&state, &req.user_id, &owner_id, airline, &flight_number)
                    .await?;
            return Ok(Json(outcome));
        }
    };

    let mut inbound = Inbound::new(owner_id, req.channel_id, event).with_actor(req.user_id);
    if let Some(stage) = req.expected_stage {
        inbound = inbound.with_expected_stage(stage);
    }
    Ok(Json(state.engine.handle(inbound).await))
}

async fn receive_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Json<Outcome> {
    if !accepts_text_message(&req.content, req.author_is_bot) {
        return Json(Outcome::ignored());
    }
    // Skip the single-flight slot entirely for users who are not planning
    if state.sessions().get(&req.user_id).is_none() {
        return Json(Outcome::ignored());
    }

    let inbound = Inbound::new(
        req.user_id,
        req.channel_id,
        Event::Text {
            content: req.content,
        },
    );
    Json(state.engine.handle(inbound).await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Session>, AppError> {
    state
        .sessions()
        .get(&user_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No active session for user: {user_id}")))
}

// ============================================================
// Destination Channels
// ============================================================

async fn stream_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    // Subscribe before reading history so nothing falls between the two
    let broadcast_rx = state.hub.subscribe(&channel_id).await;
    let recent = state.hub.recent(&channel_id).await;
    sse_stream(channel_id, recent, broadcast_rx)
}

async fn check_in_closed(
    State(state): State<AppState>,
    Json(req): Json<CheckInClosedRequest>,
) -> Result<Json<Outcome>, AppError> {
    let owner_id = req.owner_id.unwrap_or_else(|| req.user_id.clone());
    let outcome =
        announce_check_in_closed(&state, &req.user_id, &owner_id, req.airline, &req.flight_number)
            .await?;
    Ok(Json(outcome))
}

async fn announce_check_in_closed(
    state: &AppState,
    user_id: &str,
    owner_id: &str,
    airline: Airline,
    flight_number: &str,
) -> Result<Outcome, AppError> {
    if user_id != owner_id {
        return Ok(Outcome::replies(vec![render::notice(Notice::NotOwner)]));
    }
    let channel_id = state
        .engine
        .check_in_closed(airline, flight_number)
        .await
        .map_err(|e: DispatchError| AppError::Internal(e.to_string()))?;
    Ok(Outcome::replies(vec![render::check_in_closed_sent(&channel_id)]))
}

// ============================================================
// Frequent Flyer Program
// ============================================================

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    let details = NewMember {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
    };
    let member = state.db.create_member(&req.user_id, &details, Utc::now())?;
    tracing::info!(
        user_id = %member.user_id,
        membership_number = %member.membership_number,
        "Frequent flyer signup"
    );

    Ok(Json(MemberResponse {
        reply: render::loyalty::welcome(&member),
        member,
    }))
}

async fn member_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MemberResponse>, AppError> {
    let member = state.db.get_member(&user_id)?;
    Ok(Json(MemberResponse {
        reply: render::loyalty::status(&member),
        member,
    }))
}

async fn link_roblox(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<LinkRobloxRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    let roblox_id = req.roblox_id.trim();
    if roblox_id.is_empty() {
        return Err(AppError::BadRequest("Roblox ID is required".to_string()));
    }
    let member = state.db.link_roblox(&user_id, roblox_id, Utc::now())?;
    Ok(Json(MemberResponse {
        reply: render::loyalty::roblox_linked(roblox_id),
        member,
    }))
}

async fn flight_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MemberResponse>, AppError> {
    let member = state.db.get_member(&user_id)?;
    Ok(Json(MemberResponse {
        reply: render::loyalty::history(&member),
        member,
    }))
}

async fn add_flight(
    State(state): State<AppState>,
    Json(req): Json<AddFlightRequest>,
) -> Result<Json<FlightAddedResponse>, AppError> {
    if !state.config.is_admin(&req.admin_id) {
        return Err(AppError::Forbidden(
            "Only administrators can add flights".to_string(),
        ));
    }
    let cabin: Cabin = req.cabin.parse().map_err(AppError::BadRequest)?;

    let credit = FlightCredit {
        flight_number: req.flight_number,
        from: req.from,
        to: req.to,
        status_credits: req.status_credits,
        points: req.points,
        cabin,
    };
    let added = state.db.record_flight(&req.user_id, credit, Utc::now())?;
    tracing::info!(
        admin_id = %req.admin_id,
        user_id = %req.user_id,
        flight_number = %added.flight.flight_number,
        "Flight credited"
    );

    Ok(Json(FlightAddedResponse {
        reply: render::loyalty::flight_added(&added),
        upgraded: added.upgraded(),
        member: added.member,
        flight: added.flight,
    }))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let sort = LeaderboardSort::from_param(query.sort.as_deref());
    let members = state.db.leaderboard(sort, LEADERBOARD_SIZE)?;
    Ok(Json(LeaderboardResponse {
        reply: render::loyalty::leaderboard(&members, sort),
        members,
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("flight-planner ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::MemberNotFound(_) => {
                AppError::NotFound("Member is not registered with Qantas Frequent Flyer".to_string())
            }
            DbError::AlreadyRegistered(_) => AppError::BadRequest(
                "You are already registered with Qantas Frequent Flyer".to_string(),
            ),
            DbError::Sqlite(_) | DbError::Corrupt(_) => {
                tracing::error!(error = %e, "Loyalty store error");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::db::Database;
    use crate::runtime::ChannelEvent;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FLIGHT_PLANNER_DISPATCH_CHANNEL", "flight-plans"),
            ("FLIGHT_PLANNER_ADMIN_IDS", "ops-1"),
            // Nothing listens on the discard port
            ("AIRPORT_API_URL", "http://127.0.0.1:9/airports"),
            ("AIRPORT_LOOKUP_TIMEOUT_SECS", "1"),
        ]);
        let config = PlannerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()));
        AppState::new(config, Database::open_in_memory().unwrap()).unwrap()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn interact(app: &Router, user_id: &str, action: Value) -> Value {
        let (status, body) = call(
            app,
            "POST",
            "/api/interactions",
            Some(json!({ "user_id": user_id, "owner_id": "alice", "channel_id": "chan-1", "action": action })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn say(app: &Router, content: &str) -> Value {
        let (status, body) = call(
            app,
            "POST",
            "/api/messages",
            Some(json!({ "user_id": "alice", "channel_id": "chan-1", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    fn button_action(reply: &Value, kind: &str) -> Value {
        reply["replies"][0]["buttons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["action"].clone())
            .find(|a| a["type"] == kind)
            .unwrap()
    }

    async fn start(app: &Router) {
        let (_, plan) = call(
            app,
            "POST",
            "/api/plan",
            Some(json!({ "user_id": "alice", "channel_id": "chan-1" })),
        )
        .await;
        assert_eq!(plan["replies"][0]["buttons"].as_array().unwrap().len(), 2);
        interact(app, "alice", json!({ "type": "airline", "airline": "qantas" })).await;
        let aircraft = interact(
            app,
            "alice",
            json!({ "type": "aircraft", "airline": "qantas", "aircraft": "Airbus A380" }),
        )
        .await;
        assert_eq!(aircraft["replies"][0]["stage"], "departure_iata");
    }

    #[tokio::test]
    async fn test_flow_over_http() {
        let state = test_state();
        let app = create_router(state.clone());
        start(&app).await;

        for input in ["SYD", "MEL", "2:30 PM", "tomorrow", "QF401"] {
            let proposed = say(&app, input).await;
            let confirm = button_action(&proposed, "confirm");
            interact(&app, "alice", confirm).await;
        }

        let (_, session) = call(&app, "GET", "/api/sessions/alice", None).await;
        assert_eq!(session["stage"], "await_dispatch");

        let sent = interact(&app, "alice", json!({ "type": "send" })).await;
        assert_eq!(sent["replies"][0]["title"], "✅ Flight Plan Sent!");

        let posted = state.hub.recent("flight-plans").await;
        assert_eq!(posted.len(), 1);
        assert!(matches!(
            &posted[0],
            ChannelEvent::Itinerary { itinerary, .. } if itinerary.flight_number == "QF401"
        ));

        let (status, _) = call(&app, "GET", "/api/sessions/alice", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_messages_are_filtered() {
        let app = create_router(test_state());
        assert_eq!(say(&app, "SYD").await["ignored"], true);

        start(&app).await;
        assert_eq!(say(&app, "!SYD").await["ignored"], true);

        let (_, bot) = call(
            &app,
            "POST",
            "/api/messages",
            Some(json!({ "user_id": "alice", "channel_id": "chan-1", "content": "SYD", "author_is_bot": true })),
        )
        .await;
        assert_eq!(bot["ignored"], true);
    }

    #[tokio::test]
    async fn test_other_users_cannot_press_buttons() {
        let app = create_router(test_state());
        start(&app).await;

        let outcome = interact(&app, "mallory", json!({ "type": "cancel" })).await;

        assert_eq!(
            outcome["replies"][0]["description"],
            "This isn't your flight planning session!"
        );
        assert_eq!(outcome["replies"][0]["ephemeral"], true);
        let (status, _) = call(&app, "GET", "/api/sessions/alice", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_check_in_closed_posts_announcement() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = call(
            &app,
            "POST",
            "/api/flights/check-in-closed",
            Some(json!({ "user_id": "alice", "airline": "jetstar", "flight_number": "JQ30" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["replies"][0]["title"], "✅ Check-In Closed Message Sent!");
        let posted = state.hub.recent("flight-plans").await;
        assert!(matches!(&posted[0], ChannelEvent::Announcement { .. }));
    }

    #[tokio::test]
    async fn test_loyalty_endpoints() {
        let app = create_router(test_state());
        let signup = json!({
            "user_id": "alice",
            "first_name": "Alice",
            "last_name": "Nguyen",
            "email": "Alice@Example.com"
        });

        let (status, body) = call(&app, "POST", "/api/loyalty/members", Some(signup.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["member"]["email"], "alice@example.com");
        assert_eq!(body["reply"]["title"], "🎉 Welcome to Qantas Frequent Flyer!");

        let (status, _) = call(&app, "POST", "/api/loyalty/members", Some(signup)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let flight = |admin: &str, cabin: &str| {
            json!({
                "admin_id": admin,
                "user_id": "alice",
                "flight_number": "qf7",
                "from": "syd",
                "to": "lax",
                "status_credits": 320,
                "points": 12840,
                "cabin": cabin
            })
        };
        let (status, _) = call(&app, "POST", "/api/loyalty/flights", Some(flight("alice", "Business"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, "POST", "/api/loyalty/flights", Some(flight("ops-1", "Coach"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid cabin class"));

        let (status, body) = call(&app, "POST", "/api/loyalty/flights", Some(flight("ops-1", "Business"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["upgraded"], true);
        assert_eq!(body["flight"]["from"], "SYD");
        assert_eq!(body["member"]["current_tier"], "Silver");

        let (_, history) = call(&app, "GET", "/api/loyalty/members/alice/flights", None).await;
        assert_eq!(history["reply"]["footer"], "Total Flights: 1");

        let (_, board) = call(&app, "GET", "/api/loyalty/leaderboard?sort=points", None).await;
        assert_eq!(board["members"][0]["user_id"], "alice");

        let (status, _) = call(&app, "GET", "/api/loyalty/members/bob", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_link_roblox() {
        let app = create_router(test_state());
        call(
            &app,
            "POST",
            "/api/loyalty/members",
            Some(json!({ "user_id": "alice", "first_name": "Alice", "last_name": "Nguyen", "email": "a@example.com" })),
        )
        .await;

        let (status, body) = call(
            &app,
            "PUT",
            "/api/loyalty/members/alice/roblox",
            Some(json!({ "roblox_id": "123456789" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["member"]["roblox_id"], "123456789");
    }
}
