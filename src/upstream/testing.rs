//! Scripted transport for driving the client without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ChatTransport, TransportError, TransportResponse};
use crate::config::ApiKey;
use crate::models::ChatRequest;

pub(crate) enum Step {
    Reply(u16, String),
    Network(String),
    // never completes; only the caller's timeout ends it
    Hang,
}

pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ChatRequest>>,
    times: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            times: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn post(
        &self,
        request: &ChatRequest,
        _api_key: &ApiKey,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.times.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Reply(status, body)) => Ok(TransportResponse { status, body }),
            Some(Step::Network(message)) => Err(TransportError(message)),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending never resolves")
            }
            None => panic!("scripted transport ran out of steps"),
        }
    }
}

/// A 2xx chat-completion body carrying `content`.
pub(crate) fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}
