//! Reply generation with a deterministic fallback.

use std::sync::Arc;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    errors::Error,
    persona::Persona,
    Result,
};

/// Composer output. Both variants carry text ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Composed {
    Generated(String),
    Fallback(String),
}

impl Composed {
    pub fn text(&self) -> &str {
        match self {
            Composed::Generated(t) | Composed::Fallback(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Composed::Generated(t) | Composed::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Composed::Fallback(_))
    }
}

/// Known facts about the conversation attached to a reply.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplyContext {
    pub streak_count: Option<u32>,
}

pub struct ReplyComposer {
    persona: Arc<Persona>,
    completion: Arc<dyn CompletionClient>,
    max_output_tokens: u32,
}

impl ReplyComposer {
    pub fn new(
        persona: Arc<Persona>,
        completion: Arc<dyn CompletionClient>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            persona,
            completion,
            max_output_tokens,
        }
    }

    pub async fn compose(&self, text: &str, ctx: ReplyContext) -> Composed {
        match self.generate(text, ctx).await {
            Ok(reply) => Composed::Generated(reply),
            Err(e) => {
                tracing::warn!(error = %e, "reply generation failed, using fallback");
                Composed::Fallback(self.persona.fallback_text(ctx.streak_count))
            }
        }
    }

    async fn generate(&self, text: &str, ctx: ReplyContext) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::Completion("nothing to reply to".to_string()));
        }

        let context = ctx
            .streak_count
            .map(|n| vec![self.persona.streak_context(n)])
            .unwrap_or_default();

        let req = CompletionRequest {
            system: self.persona.reply_instruction(),
            context,
            prompt: text.to_string(),
            max_output_tokens: self.max_output_tokens,
        };

        let raw = self.completion.complete(req).await?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Completion("empty reply".to_string()));
        }

        Ok(match &self.persona.suffix {
            Some(suffix) => ensure_suffix(trimmed, suffix),
            None => trimmed.to_string(),
        })
    }
}

/// Append `suffix` unless the text already ends with it.
pub fn ensure_suffix(text: &str, suffix: &str) -> String {
    if text.ends_with(suffix) {
        text.to_string()
    } else {
        format!("{text}{suffix}")
    }
}
