//! In-memory `ProfileStore` implementation.
//!
//! Inserts and compare-and-swap updates happen under one lock, so the
//! adapter gives the same uniqueness guarantees a keyed table would. Tests
//! can take the store offline or slow individual writes down.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{InsertOutcome, ProfileStore, ProfileStoreError, ProfileUpdate};
use crate::domain::{AccountId, Profile};

/// Process-local profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<AccountId, Profile>>,
    offline: AtomicBool,
    write_delays: Mutex<VecDeque<Duration>>,
}

impl InMemoryProfileStore {
    /// Create an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a connection error while `false`.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Delay the next update that has not yet started by `delay`.
    ///
    /// Delays are consumed in the order updates arrive and are slept before
    /// the write is applied.
    pub fn push_write_delay(&self, delay: Duration) {
        self.write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(delay);
    }

    /// Stored record for `account_id`, bypassing availability checks.
    #[must_use]
    pub fn record(&self, account_id: &AccountId) -> Option<Profile> {
        self.lock_records().get(account_id).cloned()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_records().is_empty()
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<AccountId, Profile>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), ProfileStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::connection("profile store is offline"));
        }
        Ok(())
    }

    fn next_write_delay(&self) -> Option<Duration> {
        self.write_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn insert_if_absent(
        &self,
        profile: &Profile,
    ) -> Result<InsertOutcome, ProfileStoreError> {
        self.ensure_available()?;
        match self.lock_records().entry(profile.account_id.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(InsertOutcome::Created)
            }
        }
    }

    async fn get(&self, account_id: &AccountId) -> Result<Option<Profile>, ProfileStoreError> {
        self.ensure_available()?;
        Ok(self.record(account_id))
    }

    async fn update(
        &self,
        account_id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<Profile, ProfileStoreError> {
        self.ensure_available()?;
        if let Some(delay) = self.next_write_delay() {
            debug!(%account_id, ?delay, "delaying profile write");
            tokio::time::sleep(delay).await;
        }

        let mut records = self.lock_records();
        let stored = records
            .get_mut(account_id)
            .ok_or_else(|| ProfileStoreError::missing(account_id.as_ref()))?;
        if update
            .expected_updated_at
            .is_some_and(|expected| expected != stored.updated_at)
        {
            return Err(ProfileStoreError::stale_write(account_id.as_ref()));
        }
        *stored = stored.with_changes(&update.changes, update.updated_at);
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{DisplayName, ProfilePatch};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn profile(now: DateTime<Utc>) -> Profile {
        Profile::provisioned(
            AccountId::new("u42").expect("account id"),
            Some(DisplayName::new("Ana").expect("display name")),
            None,
            now,
        )
    }

    fn rename(to: &str, expected: Option<DateTime<Utc>>, at: DateTime<Utc>) -> ProfileUpdate {
        ProfileUpdate {
            changes: ProfilePatch::display_name(to).validate().expect("valid patch"),
            updated_at: at,
            expected_updated_at: expected,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn second_insert_reports_existing_record(profile: Profile) {
        let store = InMemoryProfileStore::new();
        let first = store.insert_if_absent(&profile).await.expect("insert");
        let second = store.insert_if_absent(&profile).await.expect("insert");

        assert_eq!(first, InsertOutcome::Created);
        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_inserts_create_one_record(profile: Profile) {
        let store = Arc::new(InMemoryProfileStore::new());
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let profile = profile.clone();
                tokio::spawn(async move { store.insert_if_absent(&profile).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.expect("join").expect("insert") == InsertOutcome::Created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn update_rejects_stale_expectations(profile: Profile, now: DateTime<Utc>) {
        let store = InMemoryProfileStore::new();
        store.insert_if_absent(&profile).await.expect("insert");
        let later = now + TimeDelta::seconds(1);
        store
            .update(&profile.account_id, &rename("Ana M.", Some(now), later))
            .await
            .expect("first update");

        let error = store
            .update(&profile.account_id, &rename("Ana B.", Some(now), later))
            .await
            .expect_err("stale update");

        assert!(matches!(error, ProfileStoreError::StaleWrite { .. }));
        let stored = store.record(&profile.account_id).expect("record");
        assert_eq!(stored.display_name.as_ref().map(AsRef::as_ref), Some("Ana M."));
    }

    #[rstest]
    #[tokio::test]
    async fn update_of_unknown_account_is_missing(now: DateTime<Utc>) {
        let store = InMemoryProfileStore::new();
        let error = store
            .update(
                &AccountId::new("ghost").expect("account id"),
                &rename("Ana", None, now),
            )
            .await
            .expect_err("missing record");
        assert!(matches!(error, ProfileStoreError::Missing { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn offline_store_refuses_every_call(profile: Profile) {
        let store = InMemoryProfileStore::new();
        store.set_available(false);

        let error = store.insert_if_absent(&profile).await.expect_err("offline");
        assert!(matches!(error, ProfileStoreError::Connection { .. }));
        assert!(store.is_empty());

        store.set_available(true);
        store.insert_if_absent(&profile).await.expect("back online");
    }
}
