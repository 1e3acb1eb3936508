use async_trait::async_trait;

use crate::Result;

/// One request to the completion capability.
///
/// `system` is the fixed instruction, `context` carries auxiliary system facts and
/// `prompt` is the user turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub context: Vec<String>,
    pub prompt: String,
    pub max_output_tokens: u32,
}

/// Hexagonal port for a text completion backend (OpenAI today).
///
/// Implementations return the raw output text; callers own trimming and fallbacks.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<String>;
}
