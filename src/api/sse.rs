//! Server-Sent Events support
//!
//! The page re-renders from every snapshot it receives.

use crate::turn::SessionSnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Initial snapshot, then one `render` event per view refresh
pub fn sse_stream(
    init: SessionSnapshot,
    render_rx: tokio::sync::broadcast::Receiver<SessionSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(snapshot_event("init", &init)) });

    let renders = BroadcastStream::new(render_rx).filter_map(|result| match result {
        Ok(snapshot) => Some(Ok(snapshot_event("render", &snapshot))),
        Err(_) => None, // Skip lagged messages; the next render carries full state
    });

    Sse::new(init.chain(renders)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(event_type: &str, snapshot: &SessionSnapshot) -> Event {
    let data = json!({
        "type": event_type,
        "session": snapshot,
    });
    Event::default().event(event_type).data(data.to_string())
}
