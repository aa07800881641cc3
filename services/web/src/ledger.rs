//! Day-scoped domain operations over the event store
//!
//! The ledger owns the three user-facing operations: append an event,
//! list a local day, and clear a local day. Day windows always come
//! from `time_window`, so the listed set and the deleted set are
//! derived identically. Every operation is single-attempt; failures
//! surface to the caller and nothing is retried.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Event, EventType, NewEvent};
use crate::repositories::EventStore;
use crate::time_window::{format_local, window_for};

/// One local day of events, partitioned by type, rendered for display
#[derive(Debug, Clone, serde::Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub sleep_entries: Vec<String>,
    pub wake_entries: Vec<String>,
}

/// Outcome of clearing one local day
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ClearOutcome {
    pub requested: usize,
    pub deleted: usize,
}

/// Event ledger over an injected store
#[derive(Clone)]
pub struct EventLedger<S: EventStore> {
    store: S,
}

impl<S: EventStore> EventLedger<S> {
    /// Create a new ledger over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert one event for the user
    pub async fn append(
        &self,
        user_id: Uuid,
        event_type: EventType,
        event_time: DateTime<Utc>,
    ) -> AppResult<Event> {
        let new = NewEvent {
            user_id,
            event_type,
            event_time,
        };

        Ok(self.store.insert(&new).await?)
    }

    /// Fetch one local day of events, ordered by time and partitioned
    /// by type
    ///
    /// Sleep entries carry a quick-entry suffix when the gap between
    /// `event_time` and `created_at` lands in one of the tolerance
    /// bands; wake entries are bare times.
    pub async fn list_for_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<DaySummary> {
        let (start, end) = window_for(date);
        let events = self.store.events_in_window(user_id, start, end).await?;

        let mut sleep_entries = Vec::new();
        let mut wake_entries = Vec::new();

        for event in &events {
            match event.event_type {
                EventType::Sleep => sleep_entries.push(format!(
                    "{}{}",
                    format_local(event.event_time),
                    sleep_suffix(event.event_time, event.created_at)
                )),
                EventType::Wake => wake_entries.push(format_local(event.event_time)),
            }
        }

        Ok(DaySummary {
            date,
            sleep_entries,
            wake_entries,
        })
    }

    /// Delete the events of one local day
    ///
    /// Fetches the id set for the window, then deletes exactly that id
    /// set. The two steps are deliberately not transactional: an event
    /// inserted into the window in between is left alone. A delete
    /// count below the request count is reported as a distinct
    /// partial-delete error carrying both counts.
    pub async fn clear_day(&self, user_id: Uuid, date: NaiveDate) -> AppResult<ClearOutcome> {
        let (start, end) = window_for(date);
        let ids = self.store.ids_in_window(user_id, start, end).await?;

        if ids.is_empty() {
            return Ok(ClearOutcome {
                requested: 0,
                deleted: 0,
            });
        }

        let deleted = self.store.delete_by_ids(user_id, &ids).await?;

        if deleted.len() != ids.len() {
            return Err(AppError::PartialDelete {
                requested: ids.len(),
                deleted: deleted.len(),
            });
        }

        Ok(ClearOutcome {
            requested: ids.len(),
            deleted: deleted.len(),
        })
    }
}

/// Quick-entry suffix for a sleep entry
///
/// A gap of 14 to 16 minutes inclusive reads as the +15m button, 29 to
/// 31 as +30m; the bands absorb clock and processing jitter around the
/// two offsets. Anything else, including zero, gets no suffix.
fn sleep_suffix(event_time: DateTime<Utc>, created_at: DateTime<Utc>) -> &'static str {
    let gap_seconds = (event_time - created_at).num_seconds();
    match gap_seconds {
        s if (14 * 60..=16 * 60).contains(&s) => " (+15m)",
        s if (29 * 60..=31 * 60).contains(&s) => " (+30m)",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::error::DatabaseResult;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store double; `refused` ids survive deletes, the way
    /// a row-level policy silently refuses rows.
    #[derive(Default)]
    struct MemoryStore {
        events: Mutex<Vec<Event>>,
        refused: Vec<Uuid>,
        delete_calls: AtomicUsize,
    }

    impl MemoryStore {
        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl EventStore for &MemoryStore {
        async fn insert(&self, new: &NewEvent) -> DatabaseResult<Event> {
            let event = Event {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                event_type: new.event_type,
                event_time: new.event_time,
                created_at: Utc::now(),
            };
            self.push(event.clone());
            Ok(event)
        }

        async fn events_in_window(
            &self,
            user_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> DatabaseResult<Vec<Event>> {
            let mut events: Vec<Event> = self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.user_id == user_id && e.event_time >= start && e.event_time < end)
                .cloned()
                .collect();
            events.sort_by_key(|e| e.event_time);
            Ok(events)
        }

        async fn ids_in_window(
            &self,
            user_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> DatabaseResult<Vec<Uuid>> {
            Ok(self
                .events_in_window(user_id, start, end)
                .await?
                .into_iter()
                .map(|e| e.id)
                .collect())
        }

        async fn delete_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> DatabaseResult<Vec<Uuid>> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            let mut events = self.events.lock().unwrap();
            let mut removed = Vec::new();
            events.retain(|e| {
                let target = e.user_id == user_id
                    && ids.contains(&e.id)
                    && !self.refused.contains(&e.id);
                if target {
                    removed.push(e.id);
                }
                !target
            });
            Ok(removed)
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn event_at(user_id: Uuid, event_type: EventType, offset_minutes: i64) -> Event {
        // Local midnight of `day()` plus the offset, expressed in UTC.
        let (start, _) = window_for(day());
        let event_time = start + Duration::minutes(offset_minutes);
        Event {
            id: Uuid::new_v4(),
            user_id,
            event_type,
            event_time,
            created_at: event_time,
        }
    }

    #[tokio::test]
    async fn test_append_stores_event() {
        let store = MemoryStore::default();
        let ledger = EventLedger::new(&store);
        let user_id = Uuid::new_v4();
        let event_time = Utc.with_ymd_and_hms(2025, 3, 10, 1, 30, 0).unwrap();

        let event = ledger
            .append(user_id, EventType::Sleep, event_time)
            .await
            .expect("append should succeed");

        assert_eq!(event.user_id, user_id);
        assert_eq!(event.event_type, EventType::Sleep);
        assert_eq!(event.event_time, event_time);
        assert_eq!(store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_partitions_and_orders() {
        let store = MemoryStore::default();
        let user_id = Uuid::new_v4();
        store.push(event_at(user_id, EventType::Wake, 8 * 60));
        store.push(event_at(user_id, EventType::Sleep, 23 * 60));
        store.push(event_at(user_id, EventType::Sleep, 60));
        // Outside the window and for another user; neither may appear.
        store.push(event_at(user_id, EventType::Sleep, 25 * 60));
        store.push(event_at(Uuid::new_v4(), EventType::Wake, 9 * 60));

        let ledger = EventLedger::new(&store);
        let summary = ledger.list_for_day(user_id, day()).await.unwrap();

        assert_eq!(summary.sleep_entries, vec!["01:00", "23:00"]);
        assert_eq!(summary.wake_entries, vec!["08:00"]);
    }

    #[tokio::test]
    async fn test_clear_day_empty_is_noop() {
        let store = MemoryStore::default();
        let ledger = EventLedger::new(&store);

        let outcome = ledger.clear_day(Uuid::new_v4(), day()).await.unwrap();

        assert_eq!(outcome.requested, 0);
        assert_eq!(outcome.deleted, 0);
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_day_deletes_fetched_set() {
        let store = MemoryStore::default();
        let user_id = Uuid::new_v4();
        for minutes in [60, 120, 180] {
            store.push(event_at(user_id, EventType::Sleep, minutes));
        }

        let ledger = EventLedger::new(&store);
        let outcome = ledger.clear_day(user_id, day()).await.unwrap();

        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.deleted, 3);
        let summary = ledger.list_for_day(user_id, day()).await.unwrap();
        assert!(summary.sleep_entries.is_empty());
    }

    #[tokio::test]
    async fn test_clear_day_reports_partial_delete() {
        let mut store = MemoryStore::default();
        let user_id = Uuid::new_v4();
        let mut survivors = Vec::new();
        for minutes in [60, 120, 180, 240, 300] {
            let event = event_at(user_id, EventType::Sleep, minutes);
            if minutes <= 120 {
                survivors.push(event.id);
            }
            store.push(event);
        }
        store.refused = survivors;

        let ledger = EventLedger::new(&store);
        let err = ledger.clear_day(user_id, day()).await.unwrap_err();

        match err {
            AppError::PartialDelete { requested, deleted } => {
                assert_eq!(requested, 5);
                assert_eq!(deleted, 3);
            }
            other => panic!("expected PartialDelete, got {:?}", other),
        }

        // The refused rows are still listable afterwards.
        let summary = ledger.list_for_day(user_id, day()).await.unwrap();
        assert_eq!(summary.sleep_entries.len(), 2);
    }

    #[test]
    fn test_sleep_suffix_bands() {
        let created = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let suffix = |gap: Duration| sleep_suffix(created + gap, created);

        assert_eq!(suffix(Duration::minutes(15)), " (+15m)");
        assert_eq!(suffix(Duration::minutes(14)), " (+15m)");
        assert_eq!(suffix(Duration::minutes(16)), " (+15m)");
        assert_eq!(suffix(Duration::seconds(13 * 60 + 59)), "");
        assert_eq!(suffix(Duration::seconds(16 * 60 + 1)), "");
        assert_eq!(suffix(Duration::minutes(30)), " (+30m)");
        assert_eq!(suffix(Duration::seconds(28 * 60 + 59)), "");
        assert_eq!(suffix(Duration::seconds(31 * 60 + 1)), "");
        assert_eq!(suffix(Duration::zero()), "");
    }
}
