//! Shared wiring for session core integration tests.

use std::sync::Arc;

use horizon_client::domain::{
    AccountId, ProfileEditor, SessionStatus, SessionStore, SessionStorePorts,
};
use horizon_client::outbound::{InMemoryIdentityProvider, InMemoryProfileStore};
use horizon_client::test_support::MutableClock;

/// In-memory collaborators shared by a store and its editor.
pub struct Backends {
    pub provider: Arc<InMemoryIdentityProvider>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub clock: Arc<MutableClock>,
}

impl Backends {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(InMemoryIdentityProvider::new()),
            profiles: Arc::new(InMemoryProfileStore::new()),
            clock: Arc::new(MutableClock::fixed()),
        }
    }

    /// Initialise a store and an editor bound to its cache.
    pub fn start(&self) -> (SessionStore, ProfileEditor) {
        let store = SessionStore::initialize(SessionStorePorts {
            provider: self.provider.clone(),
            profiles: self.profiles.clone(),
            clock: self.clock.clone(),
        })
        .expect("store initialises inside a runtime");
        let editor = ProfileEditor::new(
            self.profiles.clone(),
            store.profile_cache(),
            self.clock.clone(),
        );
        (store, editor)
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).expect("valid account id")
}

pub fn status(store: &SessionStore) -> SessionStatus {
    store.session().status()
}

pub fn cached_display_name(store: &SessionStore) -> Option<String> {
    store
        .snapshot()
        .profile()
        .profile()
        .and_then(|profile| profile.display_name.as_ref())
        .map(ToString::to_string)
}

pub fn stored_display_name(backends: &Backends, account_id: &AccountId) -> Option<String> {
    backends
        .profiles
        .record(account_id)
        .and_then(|profile| profile.display_name)
        .map(String::from)
}
