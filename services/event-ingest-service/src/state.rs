use std::sync::Arc;

use crate::sink::EventSink;

#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn EventSink>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(sink: Arc<dyn EventSink>, max_body_bytes: usize) -> Self {
        Self {
            sink,
            max_body_bytes,
        }
    }
}
