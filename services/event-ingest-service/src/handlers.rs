use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{StatusCode, Uri},
    Json,
};
use chrono::Utc;

use crate::error::IngestError;
use crate::logic::ingest;
use crate::models::{AcceptedResponse, ErrorResponse};
use crate::state::AppState;

/// Liveness only; no dependency checks.
pub async fn health() -> &'static str {
    "ok"
}

pub async fn post_event(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), IngestError> {
    let body = body.map_err(|rejection| body_error(rejection, state.max_body_bytes))?;

    let event = ingest(&body, Utc::now()).inspect_err(|err| {
        tracing::debug!(error = %err, details = %err.details(), "event rejected");
    })?;

    state.sink.record(&event);

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            id: event.id,
        }),
    ))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".to_string(),
            details: format!("no route for {}", uri.path()),
        }),
    )
}

fn body_error(rejection: BytesRejection, limit: usize) -> IngestError {
    // The limited reader aborts as soon as the ceiling is crossed.
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::PayloadTooLarge { limit }
    } else {
        IngestError::Body(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_router;
    use crate::config::DEFAULT_MAX_BODY_BYTES;
    use crate::models::Event;
    use crate::sink::EventSink;
    use crate::state::AppState;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl EventSink for RecordingSink {
        fn record(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn router() -> (Router, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(sink.clone(), DEFAULT_MAX_BODY_BYTES);
        (build_router(state), sink)
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn assert_error_envelope(body: &[u8]) -> Value {
        let value: Value = serde_json::from_slice(body).unwrap();
        assert!(value["error"].is_string());
        assert!(value["details"].is_string());
        value
    }

    #[tokio::test]
    async fn accepts_valid_event() {
        let (app, sink) = router();
        let before = Utc::now();
        let (status, body) = send(&app, post(r#"{"id":"e1","type":"click","source":"web"}"#)).await;
        let after = Utc::now();

        assert_eq!(status, StatusCode::ACCEPTED);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"status": "accepted", "id": "e1"}));

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "click");
        assert!(events[0].timestamp >= before && events[0].timestamp <= after);
    }

    #[tokio::test]
    async fn missing_id_is_rejected() {
        let (app, sink) = router();
        let (status, body) = send(&app, post(r#"{"type":"click","source":"web"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value = assert_error_envelope(&body);
        assert!(value["details"].as_str().unwrap().contains("id"));
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_field_is_rejected() {
        let (app, _) = router();
        let (status, body) = send(
            &app,
            post(r#"{"id":"e1","type":"click","source":"web","bogus":true}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value = assert_error_envelope(&body);
        assert!(value["details"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn array_body_is_rejected() {
        let (app, sink) = router();
        for body in [
            r#"["e1","click","web"]"#,
            r#"["e1","click","web","2024-01-01T00:00:00Z",{"k":1}]"#,
        ] {
            let (status, response) = send(&app, post(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let value = assert_error_envelope(&response);
            assert_eq!(value["error"], "invalid JSON body");
        }
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_rfc3339_timestamp_is_rejected() {
        let (app, sink) = router();
        let (status, body) = send(
            &app,
            post(r#"{"id":"e1","type":"click","source":"web","timestamp":"2024-03-10 14:30:00Z"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_envelope(&body);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concatenated_objects_are_rejected() {
        let (app, sink) = router();
        let (status, body) = send(
            &app,
            post(r#"{"id":"e1","type":"click","source":"web"}{"id":"e2","type":"click","source":"web"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_envelope(&body);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (app, sink) = router();
        let padding = "a".repeat(2 * 1024 * 1024);
        let body = format!(r#"{{"id":"e1","type":"click","source":"web","payload":"{padding}"}}"#);
        let (status, body) = send(&app, post(body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_error_envelope(&body);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_is_ok_regardless_of_history() {
        let (app, _) = router();
        let _ = send(&app, post("not json")).await;
        let _ = send(&app, post(r#"{"id":"e1","type":"click","source":"web"}"#)).await;

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn unknown_route_uses_error_envelope() {
        let (app, _) = router();
        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_error_envelope(&body);
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let (app, _) = router();
        let request = Request::builder()
            .uri("/events")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
