//! Shared harnesses for the integration flows.

use serde_json::Value;
use shared_bus::{
    duplex, ChannelConfig, EnvelopeReceiver, EnvelopeSender, MemoryReceiver, MemorySender,
};
use shared_types::{ControlMessage, ProcessingId, RequestEnvelope, ResponseEnvelope, TransferBuffer};
use std::time::Duration;
use sw_controller::{Controller, ControllerConfig};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Upper bound for any single wait in a flow.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Executor side driven by hand, so a test decides exactly which responses
/// arrive and in what order.
pub struct ScriptedPeer {
    control: MemoryReceiver<ControlMessage>,
    responses: MemorySender<ResponseEnvelope>,
}

impl ScriptedPeer {
    /// Next control message from the controller.
    pub async fn next_control(&mut self) -> ControlMessage {
        timeout(STEP_TIMEOUT, self.control.recv())
            .await
            .expect("timed out waiting for a control message")
            .expect("control direction closed")
    }

    /// Next request; panics if a cancel arrives instead.
    pub async fn next_request(&mut self) -> RequestEnvelope {
        match self.next_control().await {
            ControlMessage::Request(request) => request,
            other => panic!("expected a request, got {other:?}"),
        }
    }

    pub async fn continuing(&self, id: u64, payload: Value) {
        self.respond(ResponseEnvelope::continuing(ProcessingId::new(id), payload, Vec::new()))
            .await;
    }

    pub async fn complete(&self, id: u64, payload: Value) {
        self.respond(ResponseEnvelope::complete(ProcessingId::new(id), payload, Vec::new()))
            .await;
    }

    pub async fn complete_with(&self, id: u64, payload: Value, buffers: Vec<TransferBuffer>) {
        self.respond(ResponseEnvelope::complete(ProcessingId::new(id), payload, buffers))
            .await;
    }

    pub async fn respond(&self, response: ResponseEnvelope) {
        self.responses.send(response).await.expect("response direction closed");
    }

    /// Drop the response sender so the controller sees the channel end.
    pub fn close_responses(self) -> MemoryReceiver<ControlMessage> {
        self.control
    }
}

/// A controller wired to a [`ScriptedPeer`] over a fresh in-memory duplex.
pub fn scripted() -> (Controller, JoinHandle<()>, ScriptedPeer) {
    let (controller_end, executor_end) = duplex(&ChannelConfig::default());
    let (responses, control) = executor_end.split();
    let (tx, rx) = controller_end.split();
    let (controller, reader) =
        Controller::start(tx, rx, ControllerConfig::default()).expect("default config is valid");
    (controller, reader, ScriptedPeer { control, responses })
}
