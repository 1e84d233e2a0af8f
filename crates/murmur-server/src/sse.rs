//! Server-sent event framing for bus subscriptions.
//!
//! Each [`StreamEvent`] becomes `event: <kind>\ndata: <json>\n\n` where kind is
//! `connect`, `stream`, `done`, or `error`.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use murmur_core::StreamEvent;
use murmur_runtime::Subscription;
use tracing::warn;

/// Convert one bus event to an SSE frame.
pub fn to_sse_event(event: &StreamEvent) -> Event {
    let name = event.kind.sse_name();
    match event.data_json() {
        Ok(json) => Event::default().event(name).data(json),
        Err(e) => {
            warn!(event = name, error = %e, "failed to serialize stream event");
            Event::default().event(name).data("{}")
        }
    }
}

/// SSE frames for a subscription. Ends when the subscriber is disconnected.
pub fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    subscription.map(|event| Ok(to_sse_event(&event)))
}
