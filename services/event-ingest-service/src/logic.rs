use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::models::{Event, IncomingEvent};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

pub fn validate(event: &Event) -> Result<(), ValidationError> {
    // First blank field wins; the timestamp is not inspected.
    let required = [
        ("id", event.id.as_str()),
        ("type", event.event_type.as_str()),
        ("source", event.source.as_str()),
    ];

    match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(ValidationError::MissingField(field)),
        None => Ok(()),
    }
}

/// `0001-01-01T00:00:00Z`, the value clients send for "no time".
pub fn is_zero_time(timestamp: &DateTime<Utc>) -> bool {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single().as_ref() == Some(timestamp)
}

pub fn apply_default_timestamp(incoming: IncomingEvent, now: DateTime<Utc>) -> Event {
    let timestamp = incoming
        .timestamp
        .filter(|timestamp| !is_zero_time(timestamp))
        .unwrap_or(now);

    Event {
        id: incoming.id,
        event_type: incoming.event_type,
        source: incoming.source,
        timestamp,
        payload: incoming.payload,
    }
}

pub fn decode_event(body: &[u8]) -> Result<IncomingEvent, IngestError> {
    // Read one JSON object first; derived struct decoding would also take arrays.
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let object = Map::<String, Value>::deserialize(&mut deserializer).map_err(IngestError::Decode)?;
    deserializer.end().map_err(IngestError::TrailingContent)?;
    IncomingEvent::deserialize(Value::Object(object)).map_err(IngestError::Decode)
}

/// Decode, default and validate a request body.
pub fn ingest(body: &[u8], now: DateTime<Utc>) -> Result<Event, IngestError> {
    let event = apply_default_timestamp(decode_event(body)?, now);
    validate(&event)?;
    Ok(event)
}
