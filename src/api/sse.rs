//! Server-Sent Events support

use crate::runtime::ChannelEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a channel subscription to an SSE stream, starting with the
/// channel's recent posts
pub fn sse_stream(
    channel_id: String,
    recent: Vec<ChannelEvent>,
    broadcast_rx: tokio::sync::broadcast::Receiver<ChannelEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        let data = json!({
            "type": "init",
            "channel_id": channel_id,
            "recent": recent,
        });
        Ok(Event::default().event("init").data(data.to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(channel_event_to_axum(&event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn channel_event_to_axum(event: &ChannelEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.kind()).data(data)
}
