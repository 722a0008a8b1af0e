use chrono::SecondsFormat;

use crate::models::Event;

/// Destination for accepted events.
///
/// Shared by every in-flight request, so `record` must be safe to call concurrently.
/// No ordering is promised between events from different requests.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &Event) {
        // Exactly one line per accepted event.
        tracing::info!(
            id = %event.id,
            event_type = %event.event_type,
            source = %event.source,
            timestamp = %event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            "event accepted"
        );
    }
}
