//! LINE Messaging API webhook payload.
//!
//! Only the fields the pipeline needs are modelled; everything else is ignored.

use serde::Deserialize;

use streakbot_core::domain::{InboundEvent, MessageKind, ReplyToken, SourceDescriptor};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<WebhookSource>,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSource {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookBody {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn into_events(self) -> Vec<InboundEvent> {
        self.events.into_iter().map(InboundEvent::from).collect()
    }
}

impl From<WebhookSource> for SourceDescriptor {
    fn from(s: WebhookSource) -> Self {
        SourceDescriptor {
            kind: s.kind,
            user_id: s.user_id,
            group_id: s.group_id,
            room_id: s.room_id,
        }
    }
}

impl From<WebhookEvent> for InboundEvent {
    fn from(ev: WebhookEvent) -> Self {
        let message = ev.message.map(|m| match (m.kind.as_str(), m.text) {
            ("text", Some(text)) => MessageKind::Text(text),
            _ => MessageKind::Other(m.kind),
        });
        InboundEvent {
            event_type: ev.event_type,
            message,
            reply_token: ev.reply_token.filter(|t| !t.is_empty()).map(ReplyToken),
            source: ev.source.map(SourceDescriptor::from).unwrap_or_default(),
        }
    }
}
