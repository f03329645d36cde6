use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fleet_model::Topic;
use fleet_transport::{DispatchHandler, Transport, TransportError};
use serde_json::Value;

/// Transport that records every health payload.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Topic, Value)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(Topic, Value)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn start(&self, _handler: Arc<dyn DispatchHandler>) -> Result<(), TransportError> {
        Ok(())
    }

    fn stop(&self) {}

    async fn send_to_health_manager(&self, topic: Topic, payload: &Value) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((topic, payload.clone()));
        Ok(())
    }
}
