//! First-time profile creation for new accounts.
//!
//! Provisioning is driven by at-least-once delivery of `account-created`
//! events, so it must tolerate duplicates. The conditional insert on the
//! profile store is the only guard; there is no read-before-write.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info};

use crate::domain::ports::{InsertOutcome, ProfileStore, ProfileStoreError};
use crate::domain::{AccountId, AvatarRef, DisplayName, Error, Profile, SeedMetadata};

/// Result of [`ProfileProvisioner::create_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new profile was stored.
    Created,
    /// A profile already existed; nothing was written.
    AlreadyExists,
}

impl From<InsertOutcome> for ProvisionOutcome {
    fn from(value: InsertOutcome) -> Self {
        match value {
            InsertOutcome::Created => Self::Created,
            InsertOutcome::AlreadyExists => Self::AlreadyExists,
        }
    }
}

/// Creates the initial profile for an account exactly once.
#[derive(Clone)]
pub struct ProfileProvisioner {
    store: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileProvisioner {
    /// Create a provisioner writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Insert a zero-balance profile for `account_id` unless one exists.
    ///
    /// Seed fields that fail validation are dropped; the profile is still
    /// created with those fields empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with code `provisioning_failed` when the store
    /// cannot be reached or rejects the insert.
    pub async fn create_if_absent(
        &self,
        account_id: &AccountId,
        seed: &SeedMetadata,
    ) -> Result<ProvisionOutcome, Error> {
        let profile = Profile::provisioned(
            account_id.clone(),
            seed_display_name(account_id, seed),
            seed_avatar_ref(account_id, seed),
            self.clock.utc(),
        );

        let outcome = self
            .store
            .insert_if_absent(&profile)
            .await
            .map(ProvisionOutcome::from)
            .map_err(|err| Self::map_store_error(account_id, &err))?;

        match outcome {
            ProvisionOutcome::Created => info!(%account_id, "provisioned profile"),
            ProvisionOutcome::AlreadyExists => {
                debug!(%account_id, "profile already provisioned");
            }
        }
        Ok(outcome)
    }

    fn map_store_error(account_id: &AccountId, err: &ProfileStoreError) -> Error {
        error!(%account_id, error = %err, "profile provisioning failed");
        Error::provisioning_failed(format!("could not create profile: {err}"))
            .with_details(json!({ "accountId": account_id.as_ref() }))
    }
}

fn seed_display_name(account_id: &AccountId, seed: &SeedMetadata) -> Option<DisplayName> {
    let raw = seed.display_name.as_deref()?;
    DisplayName::new(raw)
        .inspect_err(|err| debug!(%account_id, error = %err, "ignoring seed display name"))
        .ok()
}

fn seed_avatar_ref(account_id: &AccountId, seed: &SeedMetadata) -> Option<AvatarRef> {
    let raw = seed.avatar_ref.as_deref()?;
    AvatarRef::new(raw)
        .inspect_err(|err| debug!(%account_id, error = %err, "ignoring seed avatar"))
        .ok()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockProfileStore;
    use crate::test_support::MutableClock;
    use rstest::{fixture, rstest};

    #[fixture]
    fn account() -> AccountId {
        AccountId::new("u42").expect("account id")
    }

    fn provisioner(store: MockProfileStore) -> ProfileProvisioner {
        ProfileProvisioner::new(Arc::new(store), Arc::new(MutableClock::fixed()))
    }

    #[rstest]
    #[tokio::test]
    async fn creates_zero_balance_profile_from_seed(account: AccountId) {
        let mut store = MockProfileStore::new();
        store
            .expect_insert_if_absent()
            .withf(|profile| {
                profile.account_id.as_ref() == "u42"
                    && profile.display_name.as_ref().map(AsRef::as_ref) == Some("Ana")
                    && profile.eco_points.value() == 0
                    && profile.created_at == profile.updated_at
            })
            .times(1)
            .return_once(|_| Ok(InsertOutcome::Created));

        let outcome = provisioner(store)
            .create_if_absent(&account, &SeedMetadata::with_display_name("Ana"))
            .await
            .expect("provisioning succeeds");

        assert_eq!(outcome, ProvisionOutcome::Created);
    }

    #[rstest]
    #[tokio::test]
    async fn existing_profile_is_reported_not_failed(account: AccountId) {
        let mut store = MockProfileStore::new();
        store
            .expect_insert_if_absent()
            .return_once(|_| Ok(InsertOutcome::AlreadyExists));

        let outcome = provisioner(store)
            .create_if_absent(&account, &SeedMetadata::default())
            .await
            .expect("duplicate provisioning is not an error");

        assert_eq!(outcome, ProvisionOutcome::AlreadyExists);
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_seed_fields_are_dropped(account: AccountId) {
        let mut store = MockProfileStore::new();
        store
            .expect_insert_if_absent()
            .withf(|profile| profile.display_name.is_none() && profile.avatar_ref.is_none())
            .return_once(|_| Ok(InsertOutcome::Created));
        let seed = SeedMetadata {
            display_name: Some("   ".to_owned()),
            avatar_ref: Some("ftp://example.org/a.png".to_owned()),
        };

        provisioner(store)
            .create_if_absent(&account, &seed)
            .await
            .expect("provisioning succeeds with dropped seed");
    }

    #[rstest]
    #[case(ProfileStoreError::connection("refused"))]
    #[case(ProfileStoreError::query("constraint violated"))]
    #[tokio::test]
    async fn store_failures_become_provisioning_failures(
        account: AccountId,
        #[case] failure: ProfileStoreError,
    ) {
        let mut store = MockProfileStore::new();
        store
            .expect_insert_if_absent()
            .return_once(move |_| Err(failure));

        let error = provisioner(store)
            .create_if_absent(&account, &SeedMetadata::default())
            .await
            .expect_err("store failure surfaces");

        assert_eq!(error.code(), ErrorCode::ProvisioningFailed);
        assert_eq!(error.details(), Some(&json!({ "accountId": "u42" })));
    }
}
