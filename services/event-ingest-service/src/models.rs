use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Envelope as decoded from a request body, before defaulting.
///
/// Missing string fields decode as empty so that validation reports them, while
/// unknown keys and wrongly typed values are rejected by the decoder.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncomingEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "rfc3339_utc")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn rfc3339_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_rfc3339(&raw)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// Strict RFC3339: the date and time must be separated by `T`.
fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    if raw.as_bytes().get(10) != Some(&b'T') {
        return Err(format!("timestamp {raw:?} is not RFC3339"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("timestamp {raw:?} is not RFC3339: {err}"))
}

/// Envelope with a concrete UTC timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}
