//! Process-wide authentication state.
//!
//! [`SessionStore`] is the single writer of [`Session`] state. It enters
//! `loading` synchronously on construction, resolves the provider's existing
//! session in the background, and applies provider events in arrival order.
//!
//! Every event that changes identity bumps a sequence number. Background
//! work captures the sequence (or the profile epoch for profile loads) when
//! it starts and its result is dropped if the counter has moved on by the
//! time it finishes. Teardown flips a flag under the same lock, so nothing
//! lands after it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use mockable::Clock;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AuthEventListener, IdentityProvider, IdentityProviderError, ProfileStore, Subscription,
};
use crate::domain::profile_editor::map_read_error;
use crate::domain::{
    AccountId, Error, ErrorCode, LoginCredentials, Profile, ProfileProvisioner, ProviderEvent,
    Registration, SeedMetadata, Session,
};

/// Collaborators the session store is wired to.
#[derive(Clone)]
pub struct SessionStorePorts {
    /// Identity provider supplying sessions and lifecycle events.
    pub provider: Arc<dyn IdentityProvider>,
    /// Authoritative profile store.
    pub profiles: Arc<dyn ProfileStore>,
    /// Time source for provisioning timestamps.
    pub clock: Arc<dyn Clock>,
}

/// Cached profile and its load status.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileState {
    profile: Option<Profile>,
    loading: bool,
    error: Option<Error>,
    degraded: bool,
}

impl ProfileState {
    /// Cached profile for the signed-in account.
    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Whether a profile load or provisioning attempt is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last profile failure, cleared by the next success.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether the account is signed in without a usable profile because
    /// provisioning failed.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn start_loading(&mut self) {
        self.loading = true;
    }

    fn resolve(&mut self, result: Result<Profile, Error>) {
        self.loading = false;
        match result {
            Ok(profile) => {
                self.error = None;
                self.degraded = false;
                self.keep_newest(profile);
            }
            Err(err) => {
                self.degraded = self.profile.is_none()
                    && matches!(
                        err.code(),
                        ErrorCode::ProvisioningFailed | ErrorCode::NotFound
                    );
                self.error = Some(err);
            }
        }
    }

    fn keep_newest(&mut self, profile: Profile) -> bool {
        let stale = self
            .profile
            .as_ref()
            .is_some_and(|cached| cached.updated_at > profile.updated_at);
        if !stale {
            self.profile = Some(profile);
        }
        !stale
    }
}

/// Point-in-time copy of everything the store publishes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    session: Session,
    profile: ProfileState,
    provider_error: Option<Error>,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self {
            session: Session::loading(),
            ..Self::default()
        }
    }

    /// Current session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Cached profile state.
    #[must_use]
    pub const fn profile(&self) -> &ProfileState {
        &self.profile
    }

    /// Last identity provider failure, cleared by the next provider event.
    #[must_use]
    pub const fn provider_error(&self) -> Option<&Error> {
        self.provider_error.as_ref()
    }
}

#[derive(Debug)]
struct StoreState {
    snapshot: SessionSnapshot,
    sequence: u64,
    profile_epoch: u64,
    torn_down: bool,
}

#[derive(Debug)]
struct ProfileRequest {
    account_id: AccountId,
    epoch: u64,
    seed: Option<SeedMetadata>,
}

struct Shared {
    state: Mutex<StoreState>,
    snapshots: watch::Sender<SessionSnapshot>,
    inflight: watch::Sender<usize>,
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    provisioner: ProfileProvisioner,
    runtime: Handle,
}

/// Owner of the session state machine.
///
/// Create one per process with [`SessionStore::initialize`] and hand out
/// references. Dropping the store tears it down.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use horizon_client::domain::{SessionStatus, SessionStore, SessionStorePorts};
/// use horizon_client::outbound::{InMemoryIdentityProvider, InMemoryProfileStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), horizon_client::domain::Error> {
/// let store = SessionStore::initialize(SessionStorePorts {
///     provider: Arc::new(InMemoryIdentityProvider::new()),
///     profiles: Arc::new(InMemoryProfileStore::new()),
///     clock: Arc::new(mockable::DefaultClock),
/// })?;
/// assert_eq!(store.session().status(), SessionStatus::Loading);
///
/// store.wait_until_idle().await;
/// assert_eq!(store.session().status(), SessionStatus::Unauthenticated);
/// # Ok(())
/// # }
/// ```
pub struct SessionStore {
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionStore {
    /// Enter `loading`, register the provider listener, and start resolving
    /// the existing session.
    ///
    /// # Errors
    ///
    /// Returns an `internal_error` when called outside a Tokio runtime.
    pub fn initialize(ports: SessionStorePorts) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|err| {
            Error::internal(format!("session store requires a tokio runtime: {err}"))
        })?;
        let SessionStorePorts {
            provider,
            profiles,
            clock,
        } = ports;

        let initial = SessionSnapshot::loading();
        let (snapshots, _) = watch::channel(initial.clone());
        let (inflight, _) = watch::channel(0_usize);
        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState {
                snapshot: initial,
                sequence: 0,
                profile_epoch: 0,
                torn_down: false,
            }),
            snapshots,
            inflight,
            provisioner: ProfileProvisioner::new(Arc::clone(&profiles), clock),
            provider,
            profiles,
            runtime,
        });

        let listener = Arc::new(StoreListener {
            shared: Arc::downgrade(&shared),
        });
        let subscription = shared.provider.subscribe(listener);
        shared.spawn_initial_lookup();
        info!("session store initialised");

        Ok(Self {
            shared,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock_state().snapshot.clone()
    }

    /// Current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.shared.lock_state().snapshot.session.clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Write access to the cached profile for [`crate::domain::ProfileEditor`].
    #[must_use]
    pub fn profile_cache(&self) -> ProfileCache {
        ProfileCache {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Sign in with email and password.
    ///
    /// The session changes once the provider delivers `signed-in`.
    ///
    /// # Errors
    ///
    /// `provider_unavailable` when the provider cannot be reached and
    /// `unauthenticated` when it rejects the credentials.
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> Result<(), Error> {
        let result = self.shared.provider.sign_in_with_password(credentials).await;
        self.shared.provider_result(result)
    }

    /// Create an account.
    ///
    /// The session changes once the provider delivers `account-created`.
    ///
    /// # Errors
    ///
    /// `provider_unavailable` when the provider cannot be reached and
    /// `unauthenticated` when it rejects the registration.
    pub async fn sign_up(&self, registration: &Registration) -> Result<(), Error> {
        let result = self.shared.provider.sign_up(registration).await;
        self.shared.provider_result(result)
    }

    /// Sign the current account out.
    ///
    /// # Errors
    ///
    /// `provider_unavailable` when the provider cannot be reached; the
    /// session keeps its last known state.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let result = self.shared.provider.sign_out().await;
        self.shared.provider_result(result)
    }

    /// Wait until every background lookup, provisioning attempt, and profile
    /// load started so far has finished.
    pub async fn wait_until_idle(&self) {
        let mut inflight = self.shared.inflight.subscribe();
        if inflight.wait_for(|count| *count == 0).await.is_err() {
            debug!("in-flight counter closed while waiting for idle");
        }
    }

    /// Release the provider subscription and stop applying results.
    ///
    /// Safe to call more than once and before the initial lookup resolves.
    /// In-flight work is left to finish; its results are discarded.
    pub fn teardown(&self) {
        self.shared.lock_state().torn_down = true;
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.release();
            info!("session store torn down");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Handle through which profile edits reach the cached snapshot.
#[derive(Clone)]
pub struct ProfileCache {
    shared: Weak<Shared>,
}

impl ProfileCache {
    /// Account the store currently considers signed in.
    #[must_use]
    pub fn current_account(&self) -> Option<AccountId> {
        let shared = self.shared.upgrade()?;
        let state = shared.lock_state();
        state.snapshot.session.account_id().cloned()
    }

    /// Replace the cached profile with a freshly persisted one.
    ///
    /// Ignored after teardown, when another account is signed in, or when
    /// the cache already holds a newer record. Returns whether the cache
    /// changed.
    pub(crate) fn store_edited(&self, profile: Profile) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut state = shared.lock_state();
        if state.torn_down || state.snapshot.session.account_id() != Some(&profile.account_id) {
            debug!(account_id = %profile.account_id, "discarding edit for inactive account");
            return false;
        }
        let changed = state.snapshot.profile.keep_newest(profile);
        if changed {
            state.snapshot.profile.error = None;
            state.snapshot.profile.degraded = false;
            shared.publish(&state);
        }
        changed
    }
}

struct StoreListener {
    shared: Weak<Shared>,
}

impl AuthEventListener for StoreListener {
    fn on_event(&self, event: ProviderEvent) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_event(event);
        }
    }
}

struct InflightGuard {
    inflight: watch::Sender<usize>,
}

impl InflightGuard {
    fn enter(inflight: &watch::Sender<usize>) -> Self {
        inflight.send_modify(|count| *count = count.saturating_add(1));
        Self {
            inflight: inflight.clone(),
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &StoreState) {
        self.snapshots.send_replace(state.snapshot.clone());
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InflightGuard::enter(&self.inflight);
        self.runtime.spawn(async move {
            task.await;
            drop(guard);
        });
    }

    fn spawn_initial_lookup(self: &Arc<Self>) {
        let sequence = self.lock_state().sequence;
        let shared = Arc::clone(self);
        self.spawn(async move { shared.resolve_initial_session(sequence).await });
    }

    async fn resolve_initial_session(self: Arc<Self>, sequence: u64) {
        let result = self.provider.current_session().await;
        let request = {
            let mut state = self.lock_state();
            if state.torn_down || state.sequence != sequence {
                debug!(
                    sequence,
                    latest = state.sequence,
                    "discarding superseded session lookup"
                );
                return;
            }
            match result {
                Ok(Some(existing)) => self.enter(&mut state, Session::from(existing), None),
                Ok(None) => self.enter(&mut state, Session::unauthenticated(), None),
                Err(err) => {
                    warn!(error = %err, "initial session lookup failed");
                    state.snapshot.provider_error = Some(map_provider_error(err));
                    self.enter(&mut state, Session::unauthenticated(), None)
                }
            }
        };
        if let Some(request) = request {
            self.spawn_profile_sync(request);
        }
    }

    fn handle_event(self: &Arc<Self>, event: ProviderEvent) {
        let request = {
            let mut state = self.lock_state();
            if state.torn_down {
                debug!(event = event.name(), "ignoring event after teardown");
                return;
            }
            debug!(event = event.name(), sequence = state.sequence, "applying provider event");
            match event {
                ProviderEvent::TokenRefreshed => None,
                ProviderEvent::SignedIn {
                    account_id,
                    email_hint,
                } => {
                    Self::advance(&mut state);
                    self.enter(
                        &mut state,
                        Session::authenticated(account_id, email_hint),
                        None,
                    )
                }
                ProviderEvent::SignedOut => {
                    Self::advance(&mut state);
                    self.enter(&mut state, Session::unauthenticated(), None)
                }
                ProviderEvent::AccountCreated {
                    account_id,
                    email_hint,
                    seed,
                } => {
                    Self::advance(&mut state);
                    self.enter(
                        &mut state,
                        Session::authenticated(account_id, email_hint),
                        Some(seed),
                    )
                }
            }
        };
        if let Some(request) = request {
            self.spawn_profile_sync(request);
        }
    }

    fn advance(state: &mut StoreState) {
        state.sequence = state.sequence.saturating_add(1);
        state.snapshot.provider_error = None;
    }

    /// Install `session` and decide whether the profile needs loading.
    fn enter(
        &self,
        state: &mut StoreState,
        session: Session,
        seed: Option<SeedMetadata>,
    ) -> Option<ProfileRequest> {
        let account_changed = state.snapshot.session.account_id() != session.account_id();
        let next_account = session.account_id().cloned();
        info!(status = %session.status(), "session state changed");
        state.snapshot.session = session;

        if account_changed {
            state.profile_epoch = state.profile_epoch.saturating_add(1);
            state.snapshot.profile = ProfileState::default();
        }

        let request = next_account.and_then(|account_id| {
            let profile = &state.snapshot.profile;
            let needs_load =
                seed.is_some() || (profile.profile.is_none() && !profile.loading);
            needs_load.then(|| ProfileRequest {
                account_id,
                epoch: state.profile_epoch,
                seed,
            })
        });
        if request.is_some() {
            state.snapshot.profile.start_loading();
        }
        self.publish(state);
        request
    }

    fn spawn_profile_sync(self: &Arc<Self>, request: ProfileRequest) {
        let shared = Arc::clone(self);
        self.spawn(async move {
            let result = shared.sync_profile(&request).await;
            shared.apply_profile_result(&request, result);
        });
    }

    /// Provision if asked, then fetch. A missing record triggers one
    /// idempotent provisioning retry before giving up.
    async fn sync_profile(&self, request: &ProfileRequest) -> Result<Profile, Error> {
        let account_id = &request.account_id;
        if let Some(seed) = &request.seed {
            self.provisioner.create_if_absent(account_id, seed).await?;
        }
        if let Some(profile) = self.fetch(account_id).await? {
            return Ok(profile);
        }

        info!(%account_id, "profile missing; retrying provisioning");
        let seed = request.seed.clone().unwrap_or_default();
        self.provisioner.create_if_absent(account_id, &seed).await?;
        self.fetch(account_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no profile for account {account_id}")))
    }

    async fn fetch(&self, account_id: &AccountId) -> Result<Option<Profile>, Error> {
        self.profiles
            .get(account_id)
            .await
            .map_err(|err| map_read_error(&err))
    }

    fn apply_profile_result(&self, request: &ProfileRequest, result: Result<Profile, Error>) {
        let mut state = self.lock_state();
        if state.torn_down || state.profile_epoch != request.epoch {
            debug!(account_id = %request.account_id, "discarding superseded profile load");
            return;
        }
        if let Err(err) = &result {
            warn!(account_id = %request.account_id, error = %err, "profile unavailable");
        }
        state.snapshot.profile.resolve(result);
        self.publish(&state);
    }

    fn provider_result(&self, result: Result<(), IdentityProviderError>) -> Result<(), Error> {
        result.map_err(|err| {
            let mapped = map_provider_error(err);
            if mapped.code() == ErrorCode::ProviderUnavailable {
                let mut state = self.lock_state();
                if !state.torn_down {
                    state.snapshot.provider_error = Some(mapped.clone());
                    self.publish(&state);
                }
            }
            mapped
        })
    }
}

fn map_provider_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::Unavailable { message } => {
            Error::provider_unavailable(format!("identity provider unavailable: {message}"))
        }
        IdentityProviderError::Rejected { message } => {
            Error::unauthenticated(format!("identity provider rejected the request: {message}"))
        }
    }
}

#[cfg(test)]
#[path = "session_store_tests.rs"]
mod tests;
