//! In-memory `IdentityProvider` implementation.
//!
//! Accounts live in a map keyed by email. Lifecycle events are delivered
//! synchronously to every registered listener after the adapter's own lock is
//! released. The existing-session lookup can be held open and resolved later,
//! which lets callers reproduce slow providers deterministically.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::{
    AuthEventListener, IdentityProvider, IdentityProviderError, Subscription,
};
use crate::domain::{AccountId, LoginCredentials, ProviderEvent, ProviderSession, Registration};

struct StoredAccount {
    account_id: AccountId,
    password: Zeroizing<String>,
}

#[derive(Default)]
struct ProviderState {
    listeners: BTreeMap<u64, Arc<dyn AuthEventListener>>,
    next_listener: u64,
    accounts: HashMap<String, StoredAccount>,
    current: Option<ProviderSession>,
    held_lookup: Option<oneshot::Receiver<Option<ProviderSession>>>,
    offline: bool,
}

/// Scriptable identity provider.
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
}

/// Pending answer for a held session lookup.
#[derive(Debug)]
pub struct PendingSession {
    sender: oneshot::Sender<Option<ProviderSession>>,
}

impl PendingSession {
    /// Complete the held lookup with `session`.
    pub fn resolve(self, session: Option<ProviderSession>) {
        if self.sender.send(session).is_err() {
            debug!("held session lookup was abandoned before it resolved");
        }
    }
}

impl InMemoryIdentityProvider {
    /// Create a provider with no accounts and no active session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, ProviderState> {
        lock(&self.state)
    }

    /// Set the session the next lookup reports, without notifying listeners.
    pub fn set_current_session(&self, session: Option<ProviderSession>) {
        self.lock_state().current = session;
    }

    /// Make the next existing-session lookup wait until the returned handle
    /// resolves it.
    #[must_use]
    pub fn hold_current_session(&self) -> PendingSession {
        let (sender, receiver) = oneshot::channel();
        self.lock_state().held_lookup = Some(receiver);
        PendingSession { sender }
    }

    /// Make every call fail as unreachable while `false`.
    pub fn set_available(&self, available: bool) {
        self.lock_state().offline = !available;
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock_state().listeners.len()
    }

    /// Record the event's effect on the current session and deliver it to
    /// every listener in registration order.
    pub fn emit(&self, event: ProviderEvent) {
        let listeners: Vec<_> = {
            let mut state = self.lock_state();
            match &event {
                ProviderEvent::SignedIn {
                    account_id,
                    email_hint,
                }
                | ProviderEvent::AccountCreated {
                    account_id,
                    email_hint,
                    ..
                } => {
                    state.current = Some(ProviderSession {
                        account_id: account_id.clone(),
                        email_hint: email_hint.clone(),
                    });
                }
                ProviderEvent::SignedOut => state.current = None,
                ProviderEvent::TokenRefreshed => {}
            }
            state.listeners.values().cloned().collect()
        };
        debug!(event = event.name(), listeners = listeners.len(), "emitting provider event");
        for listener in listeners {
            listener.on_event(event.clone());
        }
    }

    fn ensure_available(&self) -> Result<(), IdentityProviderError> {
        if self.lock_state().offline {
            return Err(IdentityProviderError::unavailable(
                "identity provider is offline",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for InMemoryIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("InMemoryIdentityProvider")
            .field("listeners", &state.listeners.len())
            .field("accounts", &state.accounts.len())
            .field("current", &state.current)
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<ProviderState>) -> MutexGuard<'_, ProviderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unregister(state: &Weak<Mutex<ProviderState>>, id: u64) {
    if let Some(state) = state.upgrade() {
        lock(&state).listeners.remove(&id);
        debug!(listener = id, "listener released");
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_session(&self) -> Result<Option<ProviderSession>, IdentityProviderError> {
        self.ensure_available()?;
        let held = self.lock_state().held_lookup.take();
        match held {
            Some(receiver) => receiver.await.map_err(|_| {
                IdentityProviderError::unavailable("session lookup was abandoned")
            }),
            None => Ok(self.lock_state().current.clone()),
        }
    }

    fn subscribe(&self, listener: Arc<dyn AuthEventListener>) -> Subscription {
        let id = {
            let mut state = self.lock_state();
            let id = state.next_listener;
            state.next_listener = id.saturating_add(1);
            state.listeners.insert(id, listener);
            id
        };
        debug!(listener = id, "listener registered");
        let state = Arc::downgrade(&self.state);
        Subscription::new(move || unregister(&state, id))
    }

    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<(), IdentityProviderError> {
        self.ensure_available()?;
        let account_id = {
            let state = self.lock_state();
            state
                .accounts
                .get(credentials.email())
                .filter(|account| account.password.as_str() == credentials.password())
                .map(|account| account.account_id.clone())
                .ok_or_else(|| IdentityProviderError::rejected("invalid login credentials"))?
        };
        self.emit(ProviderEvent::SignedIn {
            account_id,
            email_hint: Some(credentials.email().to_owned()),
        });
        Ok(())
    }

    async fn sign_up(&self, registration: &Registration) -> Result<(), IdentityProviderError> {
        self.ensure_available()?;
        let credentials = registration.credentials();
        let account_id = {
            let mut state = self.lock_state();
            if state.accounts.contains_key(credentials.email()) {
                return Err(IdentityProviderError::rejected("user already registered"));
            }
            let account_id = AccountId::random();
            state.accounts.insert(
                credentials.email().to_owned(),
                StoredAccount {
                    account_id: account_id.clone(),
                    password: Zeroizing::new(credentials.password().to_owned()),
                },
            );
            account_id
        };
        self.emit(ProviderEvent::AccountCreated {
            account_id,
            email_hint: Some(credentials.email().to_owned()),
            seed: registration.seed_metadata(),
        });
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        self.ensure_available()?;
        self.emit(ProviderEvent::SignedOut);
        Ok(())
    }
}
