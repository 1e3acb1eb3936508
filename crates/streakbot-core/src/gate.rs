//! Response gate: decides whether an inbound message gets a reply at all.

use std::sync::Arc;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    domain::ConversationId,
    persona::Persona,
    utils::{squash_whitespace, truncate_text},
};

/// How the gate reached its answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateVerdict {
    /// One-to-one chats are always answered.
    Individual,
    /// The text mentions the persona.
    Mention,
    /// The classifier answered YES/NO.
    Classifier(bool),
    /// Classification failed or was ambiguous; mention heuristic applied.
    Fallback(bool),
}

impl GateVerdict {
    pub fn should_respond(self) -> bool {
        match self {
            GateVerdict::Individual | GateVerdict::Mention => true,
            GateVerdict::Classifier(v) | GateVerdict::Fallback(v) => v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateDecision {
    pub verdict: GateVerdict,
    /// Text handed to the composer, with the persona mention removed.
    pub text: String,
}

impl GateDecision {
    pub fn should_respond(&self) -> bool {
        self.verdict.should_respond()
    }
}

pub struct ResponseGate {
    persona: Arc<Persona>,
    completion: Arc<dyn CompletionClient>,
    max_output_tokens: u32,
}

impl ResponseGate {
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

    /// Decide for one message. Never fails: every error path lands on a verdict.
    pub async fn decide(&self, conversation: &ConversationId, text: &str) -> GateDecision {
        let (mentioned, cleaned) = strip_mention(text, &self.persona.mention);

        let verdict = if conversation.is_individual() {
            GateVerdict::Individual
        } else if mentioned {
            GateVerdict::Mention
        } else {
            self.classify(text).await
        };

        GateDecision {
            verdict,
            text: cleaned,
        }
    }

    async fn classify(&self, text: &str) -> GateVerdict {
        let req = CompletionRequest {
            system: self.persona.classify_instruction(),
            context: Vec::new(),
            prompt: self.persona.classify_prompt(text),
            max_output_tokens: self.max_output_tokens,
        };

        match self.completion.complete(req).await {
            Ok(answer) => match parse_verdict(&answer) {
                Some(v) => GateVerdict::Classifier(v),
                None => {
                    tracing::warn!(
                        answer = %truncate_text(answer.trim(), 40),
                        "ambiguous classification answer, using mention heuristic"
                    );
                    self.fallback(text)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "classification failed, using mention heuristic");
                self.fallback(text)
            }
        }
    }

    fn fallback(&self, text: &str) -> GateVerdict {
        let mention = self.persona.mention.as_str();
        GateVerdict::Fallback(!mention.is_empty() && text.contains(mention))
    }
}

/// Parse the classifier output: `YES`/`NO` (trimmed, any case); anything else is `None`.
pub fn parse_verdict(answer: &str) -> Option<bool> {
    let a = answer.trim();
    if a.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if a.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

/// Remove every occurrence of `mention` from `text`.
///
/// Returns whether the mention was present and the cleaned text, which is empty when
/// the message was nothing but the mention.
pub fn strip_mention(text: &str, mention: &str) -> (bool, String) {
    if mention.is_empty() || !text.contains(mention) {
        return (false, text.trim().to_string());
    }
    (true, squash_whitespace(&text.replace(mention, " ")))
}
