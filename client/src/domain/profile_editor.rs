//! Profile reads and validated, serialised profile edits.
//!
//! Edits for one account run strictly in submission order through a fair
//! per-account queue, and each write carries the `updated_at` it was based
//! on so the store rejects anything that raced past the queue. The cached
//! snapshot only changes after the store accepts a write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde_json::json;
use tokio::sync::Mutex as EditQueue;
use tracing::{debug, info, warn};

use crate::domain::ports::{ProfileStore, ProfileStoreError, ProfileUpdate};
use crate::domain::{AccountId, Error, Profile, ProfileCache, ProfileChanges, ProfilePatch};

type QueueMap = HashMap<AccountId, Arc<EditQueue<()>>>;

/// Sole writer of profile fields.
pub struct ProfileEditor {
    store: Arc<dyn ProfileStore>,
    cache: ProfileCache,
    clock: Arc<dyn Clock>,
    queues: Mutex<QueueMap>,
}

impl ProfileEditor {
    /// Create an editor that writes to `store` and refreshes `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>, cache: ProfileCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache,
            clock,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the stored profile for `account_id`.
    ///
    /// # Errors
    ///
    /// `not_found` when no record exists; `provider_unavailable` or
    /// `internal_error` when the store fails.
    pub async fn fetch(&self, account_id: &AccountId) -> Result<Profile, Error> {
        self.store
            .get(account_id)
            .await
            .map_err(|err| map_read_error(&err))?
            .ok_or_else(|| missing_profile(account_id))
    }

    /// Edit the signed-in account's profile.
    ///
    /// # Errors
    ///
    /// `unauthenticated` when nobody is signed in, otherwise as
    /// [`ProfileEditor::apply_edit`].
    pub async fn edit_profile(&self, patch: &ProfilePatch) -> Result<Profile, Error> {
        let account_id = self
            .cache
            .current_account()
            .ok_or_else(|| Error::unauthenticated("no user signed in"))?;
        self.apply_edit(&account_id, patch).await
    }

    /// Validate and persist `patch`, then refresh the cached snapshot.
    ///
    /// # Errors
    ///
    /// - `validation_failed` before any store call when the patch is invalid.
    /// - `not_found` when the account has no profile.
    /// - `persist_failed` when the write is rejected; the cache is unchanged.
    pub async fn apply_edit(
        &self,
        account_id: &AccountId,
        patch: &ProfilePatch,
    ) -> Result<Profile, Error> {
        let changes = patch.validate().map_err(|err| {
            debug!(%account_id, error = %err, "rejecting invalid profile edit");
            Error::from(err)
        })?;

        let queue = self.queue_for(account_id);
        let result = {
            let _turn = queue.lock().await;
            let persisted = self.persist(account_id, changes).await;
            if let Ok(profile) = &persisted {
                self.cache.store_edited(profile.clone());
            }
            persisted
        };
        drop(queue);
        self.prune_queue(account_id);
        result
    }

    async fn persist(
        &self,
        account_id: &AccountId,
        changes: ProfileChanges,
    ) -> Result<Profile, Error> {
        let current = self.fetch(account_id).await?;
        let update = ProfileUpdate {
            changes,
            updated_at: next_timestamp(current.updated_at, self.clock.utc()),
            expected_updated_at: Some(current.updated_at),
        };

        let stored = self
            .store
            .update(account_id, &update)
            .await
            .map_err(|err| {
                warn!(%account_id, error = %err, "profile edit was not persisted");
                Error::persist_failed(format!("could not save profile: {err}"))
                    .with_details(json!({ "accountId": account_id.as_ref() }))
            })?;
        info!(%account_id, "profile updated");
        Ok(stored)
    }

    fn lock_queues(&self) -> MutexGuard<'_, QueueMap> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue_for(&self, account_id: &AccountId) -> Arc<EditQueue<()>> {
        Arc::clone(self.lock_queues().entry(account_id.clone()).or_default())
    }

    fn prune_queue(&self, account_id: &AccountId) {
        let mut queues = self.lock_queues();
        if queues
            .get(account_id)
            .is_some_and(|queue| Arc::strong_count(queue) == 1)
        {
            queues.remove(account_id);
        }
    }
}

/// Strictly later than `previous`, even when the clock has not moved.
fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous
        .checked_add_signed(TimeDelta::microseconds(1))
        .map_or(now, |floor| now.max(floor))
}

fn missing_profile(account_id: &AccountId) -> Error {
    Error::not_found(format!("no profile for account {account_id}"))
        .with_details(json!({ "accountId": account_id.as_ref() }))
}

/// Map profile store read failures onto the domain taxonomy.
pub(crate) fn map_read_error(error: &ProfileStoreError) -> Error {
    match error {
        ProfileStoreError::Connection { message } => {
            Error::provider_unavailable(format!("profile store unavailable: {message}"))
        }
        ProfileStoreError::Missing { account_id } => {
            Error::not_found(format!("no profile for account {account_id}"))
        }
        ProfileStoreError::Query { .. } | ProfileStoreError::StaleWrite { .. } => {
            Error::internal(format!("profile store error: {error}"))
        }
    }
}
