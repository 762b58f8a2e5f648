//! Server-Sent Events support

use super::types::SessionResponse;
use crate::runtime::{SessionEvent, SessionReply};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// `init` with the current state, then every update until the session closes
pub fn sse_stream(
    current: SessionReply,
    broadcast_rx: broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = stream::once(future::ready(Ok::<_, Infallible>(init_event(current))));

    // A `None` state ends the stream right after the `closed` event
    let events = Some(BroadcastStream::new(broadcast_rx));
    let updates = stream::unfold(events, |events| async move {
        let mut events = events?;
        while let Some(result) = events.next().await {
            // Skip lagged messages
            let Ok(event) = result else { continue };
            let closed = matches!(event, SessionEvent::Closed { .. });
            let item = Ok::<_, Infallible>(session_event_to_axum(event));
            return Some((item, (!closed).then_some(events)));
        }
        None
    });

    Sse::new(init.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(current: SessionReply) -> Event {
    let body = SessionResponse::from(current);
    let data = json!({
        "type": "init",
        "session": body.session,
        "agent_response": body.agent_response,
        "view": body.view,
    });
    Event::default().event("init").data(data.to_string())
}

fn session_event_to_axum(event: SessionEvent) -> Event {
    let (event_type, data) = match event {
        SessionEvent::Updated { reply, outcome } => {
            let body = SessionResponse::from(reply);
            (
                "session_update",
                json!({
                    "type": "session_update",
                    "session": body.session,
                    "agent_response": body.agent_response,
                    "view": body.view,
                    "outcome": outcome,
                }),
            )
        }
        SessionEvent::Closed { reason } => (
            "closed",
            json!({
                "type": "closed",
                "reason": reason,
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
