//! Server-sent change notifications.
//!
//! Each notification is an SSE event named `changed` whose data is the
//! collection that changed (`products` or `categories`). Clients re-fetch
//! that collection; the events carry no payload beyond the topic.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Router,
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use reve_essence_catalog::ChangeEvent;

use crate::state::AppState;

/// SSE event name for change notifications.
pub const CHANGED_EVENT: &str = "changed";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/changes", get(changes))
}

fn changed(event: ChangeEvent) -> Event {
    Event::default().event(CHANGED_EVENT).data(event.topic())
}

/// Stream change notifications until the client disconnects.
///
/// A subscriber that falls behind cannot tell which collections it missed,
/// so it is told both changed.
pub async fn changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut events = state.synchronizer().notifier().subscribe();

    let stream = stream! {
        loop {
            match events.recv().await {
                Ok(event) => yield Ok(changed(event)),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Change stream subscriber lagged");
                    yield Ok(changed(ChangeEvent::CategoriesChanged));
                    yield Ok(changed(ChangeEvent::ProductsChanged));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
