use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::Stream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as TokioStreamExt;

use crate::store::Collection;
use crate::AppState;

/// GET /events - SSE feed of storage changes from every context.
///
/// Clients re-read the named collection on each event. `resync` means
/// notifications were dropped and both collections should be re-read.
async fn storage_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.store.subscribe();

    let stream = TokioStreamExt::filter_map(BroadcastStream::new(rx), |result| match result {
        Ok(event) => {
            let event_type = match event.collection {
                Collection::Session => "session_changed",
                Collection::AllUsers => "users_changed",
            };
            match serde_json::to_string(&event) {
                Ok(data) => Some(Ok(Event::default().event(event_type).data(data))),
                Err(_) => None,
            }
        }
        Err(BroadcastStreamRecvError::Lagged(_)) => {
            Some(Ok(Event::default().event("resync").data("{}")))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", get(storage_events))
        .with_state(state)
}
