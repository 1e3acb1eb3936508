//! Per-delivery fan-out over inbound events.
//!
//! Every event runs Gate -> Tracker -> Composer -> reply on its own. All events of a
//! delivery are polled together and the call returns once each has settled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::{
    composer::{ReplyComposer, ReplyContext},
    conversation::resolve,
    domain::{ConversationId, InboundEvent, OutboundReply},
    gate::ResponseGate,
    messaging::ReplyPort,
    streak::StreakStore,
    utils::truncate_text,
};

const LOG_PREVIEW_CHARS: usize = 80;

/// What happened to one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a text message, or nothing to reply to.
    Ignored,
    /// The gate decided not to answer.
    Declined,
    Replied { fallback: bool },
    /// A reply was composed but sending it failed.
    SendFailed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub received: usize,
    pub ignored: usize,
    pub declined: usize,
    pub replied: usize,
    pub fallbacks: usize,
    pub send_failures: usize,
}

impl DeliverySummary {
    fn record(&mut self, outcome: EventOutcome) {
        self.received += 1;
        match outcome {
            EventOutcome::Ignored => self.ignored += 1,
            EventOutcome::Declined => self.declined += 1,
            EventOutcome::Replied { fallback } => {
                self.replied += 1;
                if fallback {
                    self.fallbacks += 1;
                }
            }
            EventOutcome::SendFailed => self.send_failures += 1,
        }
    }
}

pub struct EventDispatcher {
    gate: ResponseGate,
    composer: ReplyComposer,
    streaks: Arc<dyn StreakStore>,
    replier: Arc<dyn ReplyPort>,
}

impl EventDispatcher {
    pub fn new(
        gate: ResponseGate,
        composer: ReplyComposer,
        streaks: Arc<dyn StreakStore>,
        replier: Arc<dyn ReplyPort>,
    ) -> Self {
        Self {
            gate,
            composer,
            streaks,
            replier,
        }
    }

    pub async fn handle_delivery(&self, events: &[InboundEvent]) -> DeliverySummary {
        self.handle_delivery_at(events, Utc::now()).await
    }

    /// Same as [`Self::handle_delivery`] with an explicit clock for streak dates.
    pub async fn handle_delivery_at(
        &self,
        events: &[InboundEvent],
        now: DateTime<Utc>,
    ) -> DeliverySummary {
        let outcomes = join_all(events.iter().map(|ev| self.handle_event(ev, now))).await;

        let mut summary = DeliverySummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        tracing::info!(
            received = summary.received,
            replied = summary.replied,
            declined = summary.declined,
            ignored = summary.ignored,
            fallbacks = summary.fallbacks,
            send_failures = summary.send_failures,
            "delivery handled"
        );
        summary
    }

    async fn handle_event(&self, event: &InboundEvent, now: DateTime<Utc>) -> EventOutcome {
        let Some(text) = event.text_body() else {
            tracing::debug!(event_type = %event.event_type, "ignoring non-text event");
            return EventOutcome::Ignored;
        };
        let Some(reply_token) = event.reply_token.clone() else {
            tracing::warn!("text event without reply token, skipping");
            return EventOutcome::Ignored;
        };

        let conversation = resolve(&event.source);
        tracing::info!(
            %conversation,
            text = %truncate_text(text, LOG_PREVIEW_CHARS),
            "message received"
        );

        let decision = self.gate.decide(&conversation, text).await;
        if !decision.should_respond() {
            tracing::info!(%conversation, verdict = ?decision.verdict, "no reply needed");
            return EventOutcome::Declined;
        }

        // unresolvable sources would all share one record
        let streak_count = match conversation {
            ConversationId::Unknown => None,
            _ => Some(self.streaks.touch(&conversation, now).await.streak_count),
        };
        let composed = self
            .composer
            .compose(&decision.text, ReplyContext { streak_count })
            .await;
        let fallback = composed.is_fallback();

        let reply = OutboundReply {
            reply_token,
            text: composed.into_text(),
        };
        tracing::info!(
            %conversation,
            verdict = ?decision.verdict,
            streak = ?streak_count,
            fallback,
            reply = %truncate_text(&reply.text, LOG_PREVIEW_CHARS),
            "sending reply"
        );

        match self.replier.reply(&reply).await {
            Ok(()) => EventOutcome::Replied { fallback },
            Err(e) => {
                tracing::error!(%conversation, error = %e, "reply send failed");
                EventOutcome::SendFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageKind, ReplyToken, SourceDescriptor},
        persona::Persona,
        streak::InMemoryStreakStore,
        test_support::{RecordingReplier, ScriptedCompletion},
    };
    use chrono::TimeZone;

    struct Harness {
        dispatcher: EventDispatcher,
        completion: Arc<ScriptedCompletion>,
        replier: Arc<RecordingReplier>,
        streaks: Arc<InMemoryStreakStore>,
    }

    fn harness(completion: ScriptedCompletion, replier: RecordingReplier) -> Harness {
        let persona = Arc::new(Persona {
            mention: "@Persona".to_string(),
            ..Persona::default()
        });
        let completion = Arc::new(completion);
        let replier = Arc::new(replier);
        let streaks = Arc::new(InMemoryStreakStore::unbounded());
        let dispatcher = EventDispatcher::new(
            ResponseGate::new(persona.clone(), completion.clone(), 10),
            ReplyComposer::new(persona, completion.clone(), 200),
            streaks.clone(),
            replier.clone(),
        );
        Harness {
            dispatcher,
            completion,
            replier,
            streaks,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 1, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn one_failed_send_does_not_affect_siblings() {
        let h = harness(
            ScriptedCompletion::failing(),
            RecordingReplier::failing_for(&["t2"]),
        );
        let events = vec![
            InboundEvent::text(SourceDescriptor::individual("u1"), "t1", "hi"),
            InboundEvent::text(SourceDescriptor::individual("u2"), "t2", "hi"),
            InboundEvent::text(SourceDescriptor::individual("u3"), "t3", "hi"),
        ];

        let summary = h.dispatcher.handle_delivery_at(&events, day(1)).await;
        assert_eq!(summary.received, 3);
        assert_eq!(summary.replied, 2);
        assert_eq!(summary.send_failures, 1);

        let mut tokens: Vec<String> = h
            .replier
            .sent()
            .await
            .into_iter()
            .map(|r| r.reply_token.0)
            .collect();
        tokens.sort();
        assert_eq!(tokens, vec!["t1".to_string(), "t3".to_string()]);
    }

    #[tokio::test]
    async fn non_text_events_are_ignored() {
        let h = harness(ScriptedCompletion::answering("ok"), RecordingReplier::default());
        let sticker = InboundEvent {
            event_type: "message".to_string(),
            message: Some(MessageKind::Other("sticker".to_string())),
            reply_token: Some(ReplyToken("t1".to_string())),
            source: SourceDescriptor::individual("u1"),
        };
        let follow = InboundEvent {
            event_type: "follow".to_string(),
            message: None,
            reply_token: Some(ReplyToken("t2".to_string())),
            source: SourceDescriptor::individual("u1"),
        };
        let no_token = InboundEvent {
            reply_token: None,
            ..InboundEvent::text(SourceDescriptor::individual("u1"), "t3", "hi")
        };

        let summary = h
            .dispatcher
            .handle_delivery_at(&[sticker, follow, no_token], day(1))
            .await;
        assert_eq!(summary.ignored, 3);
        assert!(h.replier.sent().await.is_empty());
        assert_eq!(h.completion.calls().await, 0);
        assert!(h.streaks.is_empty().await);
    }

    #[tokio::test]
    async fn declined_group_message_touches_nothing() {
        let h = harness(ScriptedCompletion::failing(), RecordingReplier::default());
        let ev = InboundEvent::text(SourceDescriptor::group("C1"), "t1", "lunch?");

        let summary = h.dispatcher.handle_delivery_at(&[ev], day(1)).await;
        assert_eq!(summary.declined, 1);
        assert!(h.replier.sent().await.is_empty());
        assert!(h.streaks.is_empty().await);
    }

    #[tokio::test]
    async fn mentioned_group_message_gets_cleaned_text_and_streak() {
        let h = harness(
            ScriptedCompletion::answering("えらい！"),
            RecordingReplier::default(),
        );
        let ev = InboundEvent::text(SourceDescriptor::group("C1"), "t1", "@Persona good job");

        let summary = h.dispatcher.handle_delivery_at(&[ev], day(1)).await;
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.fallbacks, 0);

        // mention path skips classification, so the only call is generation
        assert_eq!(h.completion.calls().await, 1);
        let req = h.completion.last_request().await.unwrap();
        assert_eq!(req.prompt, "good job");
        assert_eq!(req.context, vec!["この会話の連続報告日数: 1日".to_string()]);

        let sent = h.replier.sent().await;
        assert_eq!(sent[0].text, "えらい！にゃん");
        assert_eq!(sent[0].reply_token, ReplyToken("t1".to_string()));
    }

    #[tokio::test]
    async fn streak_grows_across_deliveries() {
        let h = harness(ScriptedCompletion::failing(), RecordingReplier::default());
        let ev = || InboundEvent::text(SourceDescriptor::individual("u1"), "t", "done");

        h.dispatcher.handle_delivery_at(&[ev()], day(1)).await;
        h.dispatcher.handle_delivery_at(&[ev()], day(2)).await;
        h.dispatcher.handle_delivery_at(&[ev()], day(2)).await;

        let record = h
            .streaks
            .get(&ConversationId::Individual("u1".to_string()))
            .await
            .unwrap();
        assert_eq!(record.streak_count, 2);

        let sent = h.replier.sent().await;
        assert_eq!(sent[0].text, "はい！どうしたの？にゃん");
        assert_eq!(sent[1].text, "2日連続だね！はい！どうしたの？にゃん");
    }

    #[tokio::test]
    async fn mention_only_group_message_gets_fallback_without_the_mention() {
        let h = harness(ScriptedCompletion::answering("x"), RecordingReplier::default());
        let ev = InboundEvent::text(SourceDescriptor::group("C1"), "t1", "  @Persona  ");

        let summary = h.dispatcher.handle_delivery_at(&[ev], day(1)).await;
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(h.completion.calls().await, 0);

        let sent = h.replier.sent().await;
        assert_eq!(sent[0].text, "はい！どうしたの？にゃん");
        assert!(!sent[0].text.contains("@Persona"));
        assert!(h
            .streaks
            .get(&ConversationId::Group("C1".to_string()))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn unknown_sources_are_answered_without_streak() {
        let h = harness(
            ScriptedCompletion::answering("えらい！"),
            RecordingReplier::default(),
        );
        let channel = SourceDescriptor {
            kind: "channel".to_string(),
            ..SourceDescriptor::default()
        };
        let no_id = SourceDescriptor {
            kind: "group".to_string(),
            ..SourceDescriptor::default()
        };
        let events = vec![
            InboundEvent::text(channel, "t1", "@Persona ran 5km"),
            InboundEvent::text(no_id, "t2", "@Persona pushups"),
        ];

        let summary = h.dispatcher.handle_delivery_at(&events, day(1)).await;
        assert_eq!(summary.replied, 2);
        assert!(h.streaks.is_empty().await);

        let req = h.completion.last_request().await.unwrap();
        assert!(req.context.is_empty());
    }
}
