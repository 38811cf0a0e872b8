use super::inference::InferenceService;
use crate::error::InferenceError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

/// Scripted outcome for one `generate` call
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    ServiceError { status: u16, body: String },
    /// Never returns; exercises the bounded wait
    Hang,
}

/// Inference service that replays scripted replies.
///
/// With an empty script every call returns a fixed, schema-valid reply.
pub struct MockInference {
    script: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    mime_types: Mutex<Vec<String>>,
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            mime_types: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            ..Self::new()
        }
    }

    /// Hold every call until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// MIME types received so far, in call order
    pub fn mime_types(&self) -> Vec<String> {
        match self.mime_types.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn next_reply(&self) -> Option<MockReply> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceService for MockInference {
    async fn generate(
        &self,
        _prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, InferenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.mime_types.lock() {
            seen.push(mime_type.to_string());
        }
        debug!("Mock inference call #{} ({} bytes)", call, image.len());

        let reply = self.next_reply();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::ServiceError { status, body }) => {
                Err(InferenceError::Api { status, body })
            }
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err(InferenceError::Aborted {
                    details: "unreachable".to_string(),
                })
            }
            None => Ok(SAMPLE_REPLY.to_string()),
        }
    }

    fn model(&self) -> &str {
        "mock-vision"
    }
}

/// Schema-valid reply used when no script is given
pub const SAMPLE_REPLY: &str = "```json\n{\"component_summary\":\"Total 3 components (1 chip, 1 motor, 1 wire)\",\"component_distribution\":{\"Reuse\":[\"chip\"],\"Repair\":[\"motor\"],\"Recycle\":[\"wire\"]},\"swarm_action\":\"Collector bots will extract the chip and motor and deliver them to the Sorter bot.\",\"sorter_decision\":\"Sorter will place components into 3 bins accordingly.\",\"reasoning\":\"The chip is intact, the motor housing is cracked, the wire is burned.\"}\n```";
