use async_trait::async_trait;

use crate::{domain::OutboundReply, Result};

/// Outbound port of the messaging platform (LINE today).
///
/// One call sends one reply bound to its reply token.
#[async_trait]
pub trait ReplyPort: Send + Sync {
    async fn reply(&self, reply: &OutboundReply) -> Result<()>;
}
