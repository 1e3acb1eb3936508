//! Daily reporting streaks per conversation.
//!
//! Days are counted in a fixed UTC+9 offset (no DST). The transition itself is the pure
//! [`advance`] function; stores only hold the result.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::domain::ConversationId;

/// Offset of the reporting calendar from UTC.
pub const REPORT_UTC_OFFSET_HOURS: i64 = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakRecord {
    pub streak_count: u32,
    pub last_report_date: NaiveDate,
}

/// Calendar date of `now` in the reporting offset.
pub fn report_date(now: DateTime<Utc>) -> NaiveDate {
    (now.naive_utc() + Duration::hours(REPORT_UTC_OFFSET_HOURS)).date()
}

/// Next record for a conversation reporting at `now`.
///
/// Same day keeps the record, the following day extends it, anything else restarts at 1.
pub fn advance(prior: Option<&StreakRecord>, now: DateTime<Utc>) -> StreakRecord {
    let today = report_date(now);
    let yesterday = today.pred_opt();

    match prior {
        Some(r) if r.last_report_date == today => *r,
        Some(r) if Some(r.last_report_date) == yesterday => StreakRecord {
            streak_count: r.streak_count.saturating_add(1),
            last_report_date: today,
        },
        _ => StreakRecord {
            streak_count: 1,
            last_report_date: today,
        },
    }
}

/// Owner of streak state. `touch` must be an atomic read-modify-write per key.
#[async_trait]
pub trait StreakStore: Send + Sync {
    async fn touch(&self, id: &ConversationId, now: DateTime<Utc>) -> StreakRecord;

    async fn get(&self, id: &ConversationId) -> Option<StreakRecord>;
}

#[derive(Debug)]
struct Slot {
    record: StreakRecord,
    seq: u64,
}

#[derive(Debug, Default)]
struct StreakMap {
    slots: HashMap<ConversationId, Slot>,
    // touch sequence -> key, oldest first
    recency: BTreeMap<u64, ConversationId>,
    next_seq: u64,
}

/// In-process streak store with optional capacity and least-recently-touched eviction.
#[derive(Debug)]
pub struct InMemoryStreakStore {
    capacity: Option<usize>,
    inner: Mutex<StreakMap>,
}

impl InMemoryStreakStore {
    /// `capacity == 0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: (capacity > 0).then_some(capacity),
            inner: Mutex::new(StreakMap::default()),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryStreakStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl StreakStore for InMemoryStreakStore {
    async fn touch(&self, id: &ConversationId, now: DateTime<Utc>) -> StreakRecord {
        let mut map = self.inner.lock().await;
        let seq = map.next_seq;
        map.next_seq += 1;

        let prior = map.slots.remove(id);
        if let Some(old) = &prior {
            map.recency.remove(&old.seq);
        } else if let Some(cap) = self.capacity {
            while map.slots.len() >= cap {
                let Some((_, oldest)) = map.recency.pop_first() else {
                    break;
                };
                map.slots.remove(&oldest);
                tracing::debug!(conversation = %oldest, "evicted streak record");
            }
        }

        let record = advance(prior.as_ref().map(|s| &s.record), now);
        map.slots.insert(id.clone(), Slot { record, seq });
        map.recency.insert(seq, id.clone());
        record
    }

    async fn get(&self, id: &ConversationId) -> Option<StreakRecord> {
        self.inner.lock().await.slots.get(id).map(|s| s.record)
    }
}
