//! Port for profile persistence.
//!
//! The [`ProfileStore`] trait is the authoritative home of profile records.
//! Uniqueness on the account id is the store's concurrency primitive for
//! provisioning; `updated_at` doubles as the compare-and-swap token for
//! edits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AccountId, Profile, ProfileChanges};

use super::define_port_error;

define_port_error! {
    /// Errors raised by profile store adapters.
    pub enum ProfileStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "profile store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "profile store query failed: {message}",
        /// No record exists for the account.
        Missing { account_id: String } =>
            "no profile stored for account {account_id}",
        /// The record changed since the caller last read it.
        StaleWrite { account_id: String } =>
            "profile for account {account_id} was modified concurrently",
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Created,
    /// A record for the account already existed and was left untouched.
    AlreadyExists,
}

/// Field update submitted to [`ProfileStore::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Validated field changes.
    pub changes: ProfileChanges,
    /// New modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// When set, the write only succeeds if the stored `updated_at` matches.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Port for profile storage and retrieval.
///
/// # Concurrency
///
/// - [`ProfileStore::insert_if_absent`] is a single atomic conditional
///   operation. Implementations must never read then write.
/// - [`ProfileStore::update`] with `expected_updated_at` fails with
///   [`ProfileStoreError::StaleWrite`] when the stored timestamp differs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert `profile` unless a record for its account already exists.
    async fn insert_if_absent(&self, profile: &Profile)
    -> Result<InsertOutcome, ProfileStoreError>;

    /// Fetch the profile for an account; `None` when no record exists.
    async fn get(&self, account_id: &AccountId) -> Result<Option<Profile>, ProfileStoreError>;

    /// Apply `update` and return the stored record.
    async fn update(
        &self,
        account_id: &AccountId,
        update: &ProfileUpdate,
    ) -> Result<Profile, ProfileStoreError>;
}
