//! In-crate fakes for the completion and reply ports.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    domain::OutboundReply,
    errors::Error,
    messaging::ReplyPort,
    Result,
};

/// Completion fake that answers every request with the same script.
pub struct ScriptedCompletion {
    answer: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().await.last().cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        self.requests.lock().await.push(req);
        self.answer
            .clone()
            .ok_or_else(|| Error::Completion("scripted failure".to_string()))
    }
}

/// Reply fake that records sends and fails for selected reply tokens.
#[derive(Default)]
pub struct RecordingReplier {
    fail_tokens: HashSet<String>,
    sent: Mutex<Vec<OutboundReply>>,
}

impl RecordingReplier {
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            fail_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn sent(&self) -> Vec<OutboundReply> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ReplyPort for RecordingReplier {
    async fn reply(&self, reply: &OutboundReply) -> Result<()> {
        if self.fail_tokens.contains(&reply.reply_token.0) {
            return Err(Error::Messaging("simulated send failure".to_string()));
        }
        self.sent.lock().await.push(reply.clone());
        Ok(())
    }
}
