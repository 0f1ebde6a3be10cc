//! Port abstraction for the external identity provider.
//!
//! The provider authenticates credentials, answers a one-shot "is anyone
//! signed in?" lookup, and pushes lifecycle events to registered listeners.
//! Listener registration hands back a [`Subscription`] whose release closure
//! runs exactly once, either explicitly or when the handle is dropped.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{LoginCredentials, ProviderEvent, ProviderSession, Registration};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
        /// The provider refused the request (bad credentials, duplicate sign-up).
        Rejected { message: String } => "identity provider rejected the request: {message}",
    }
}

/// Receiver for provider lifecycle events.
///
/// Implementations must return quickly; the provider calls them inline.
pub trait AuthEventListener: Send + Sync {
    /// Handle one event in arrival order.
    fn on_event(&self, event: ProviderEvent);
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for one registered listener.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use horizon_client::domain::ports::Subscription;
///
/// let releases = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&releases);
/// let subscription = Subscription::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
/// subscription.release();
/// assert_eq!(releases.load(Ordering::SeqCst), 1);
/// ```
pub struct Subscription {
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Wrap the closure that unregisters the listener.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unregister the listener.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Identity provider contract consumed by the session store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Report the session that already exists, if any.
    async fn current_session(&self) -> Result<Option<ProviderSession>, IdentityProviderError>;

    /// Register `listener` for lifecycle events until the returned handle is
    /// released.
    fn subscribe(&self, listener: Arc<dyn AuthEventListener>) -> Subscription;

    /// Authenticate with email and password. The resulting state change is
    /// delivered as a `signed-in` event.
    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<(), IdentityProviderError>;

    /// Create an account. The resulting state change is delivered as an
    /// `account-created` event.
    async fn sign_up(&self, registration: &Registration) -> Result<(), IdentityProviderError>;

    /// End the current session. The resulting state change is delivered as a
    /// `signed-out` event.
    async fn sign_out(&self) -> Result<(), IdentityProviderError>;
}
