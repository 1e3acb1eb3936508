/// Raw source descriptor as delivered by the platform (`type` + id).
///
/// Kept loosely typed on purpose: resolution into a [`ConversationId`] happens in
/// [`crate::conversation::resolve`], which never fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub kind: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

impl SourceDescriptor {
    pub fn individual(user_id: impl Into<String>) -> Self {
        Self {
            kind: "user".to_string(),
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            kind: "group".to_string(),
            group_id: Some(group_id.into()),
            ..Self::default()
        }
    }

    pub fn room(room_id: impl Into<String>) -> Self {
        Self {
            kind: "room".to_string(),
            room_id: Some(room_id.into()),
            ..Self::default()
        }
    }
}

/// Namespaced conversation identity used as the streak lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Individual(String),
    Group(String),
    Room(String),
    Unknown,
}

impl ConversationId {
    /// Individual chats are answered unconditionally; everything else goes through the gate.
    pub fn is_individual(&self) -> bool {
        matches!(self, ConversationId::Individual(_))
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationId::Individual(id) => write!(f, "user:{id}"),
            ConversationId::Group(id) => write!(f, "group:{id}"),
            ConversationId::Room(id) => write!(f, "room:{id}"),
            ConversationId::Unknown => f.write_str("unknown"),
        }
    }
}

/// Platform reply-correlation token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplyToken(pub String);

/// Message payload kind of an inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    /// Sticker, image, audio, ... (carried by name, never answered).
    Other(String),
}

/// One notification of a webhook delivery.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    /// Platform event type (`message`, `follow`, `join`, ...).
    pub event_type: String,
    pub message: Option<MessageKind>,
    pub reply_token: Option<ReplyToken>,
    pub source: SourceDescriptor,
}

impl InboundEvent {
    /// Convenience constructor for a text message event.
    pub fn text(source: SourceDescriptor, reply_token: &str, text: &str) -> Self {
        Self {
            event_type: "message".to_string(),
            message: Some(MessageKind::Text(text.to_string())),
            reply_token: Some(ReplyToken(reply_token.to_string())),
            source,
        }
    }

    /// Text body if this is a text message event.
    pub fn text_body(&self) -> Option<&str> {
        if self.event_type != "message" {
            return None;
        }
        match &self.message {
            Some(MessageKind::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }
}

/// A single text reply bound to the inbound event's reply token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundReply {
    pub reply_token: ReplyToken,
    pub text: String,
}
