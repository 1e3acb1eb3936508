//! Conversation key resolution.

use crate::domain::{ConversationId, SourceDescriptor};

/// Derive the conversation identity for an event source.
///
/// Unrecognized kinds, or a recognized kind missing its id, resolve to
/// [`ConversationId::Unknown`] so a malformed source never stops the pipeline.
pub fn resolve(source: &SourceDescriptor) -> ConversationId {
    let non_empty = |id: &Option<String>| id.clone().filter(|s| !s.trim().is_empty());

    let id = match source.kind.trim() {
        "user" | "individual" => non_empty(&source.user_id).map(ConversationId::Individual),
        "group" => non_empty(&source.group_id).map(ConversationId::Group),
        "room" => non_empty(&source.room_id).map(ConversationId::Room),
        _ => None,
    };
    id.unwrap_or(ConversationId::Unknown)
}
