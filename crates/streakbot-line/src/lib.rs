//! LINE adapter.
//!
//! Implements the `streakbot-core` ReplyPort over the LINE Messaging API and serves the
//! webhook endpoint that feeds the event dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

pub mod payload;
pub mod router;

use streakbot_core::{
    domain::OutboundReply, errors::Error, messaging::ReplyPort, utils::truncate_text, Result,
};

/// LINE rejects text messages longer than this (characters).
pub const LINE_TEXT_LIMIT: usize = 5000;

const LINE_API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct LineMessenger {
    access_token: String,
    base_url: String,
    http: reqwest::Client,
}

impl LineMessenger {
    pub fn new(access_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LINE_API_TIMEOUT)
            .build()
            .map_err(|e| Error::External(format!("line http client build failed: {e}")))?;
        Ok(Self {
            access_token: access_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl ReplyPort for LineMessenger {
    async fn reply(&self, reply: &OutboundReply) -> Result<()> {
        let text = if reply.text.chars().count() > LINE_TEXT_LIMIT {
            truncate_text(&reply.text, LINE_TEXT_LIMIT - 3)
        } else {
            reply.text.clone()
        };
        let body = json!({
            "replyToken": reply.reply_token.0,
            "messages": [{ "type": "text", "text": text }],
        });

        let resp = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("line request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Messaging(format!(
                "line reply failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }
}
