//! Navigation decisions derived from the current session.
//!
//! [`AccessGate`] is a pure function of a [`Session`] value. [`RouteGuard`]
//! wraps it with the configured login and home paths so UI routers get a
//! concrete navigation instruction.

use serde::Serialize;

use crate::config::ClientSettings;
use crate::domain::{Session, SessionStatus};

/// Outcome for a route that requires a signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Render the protected view.
    Allow,
    /// Send the visitor to the login page.
    RedirectToLogin,
    /// The session is still resolving; show a placeholder.
    ShowLoadingPlaceholder,
}

/// Outcome for a route only meant for signed-out visitors, such as login or
/// sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestGateDecision {
    /// Render the guest view.
    Allow,
    /// Someone is already signed in; send them home.
    RedirectHome,
    /// The session is still resolving; show a placeholder.
    ShowLoadingPlaceholder,
}

/// Stateless gate over session status.
///
/// # Examples
/// ```
/// use horizon_client::domain::{AccessGate, AccountId, GateDecision, Session};
///
/// let session = Session::authenticated(AccountId::new("u1").unwrap(), None);
/// assert_eq!(AccessGate::decide(&session), GateDecision::Allow);
/// assert_eq!(AccessGate::decide(&Session::unauthenticated()), GateDecision::RedirectToLogin);
/// assert_eq!(AccessGate::decide(&Session::loading()), GateDecision::ShowLoadingPlaceholder);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Decide whether a protected view may render.
    #[must_use]
    pub const fn decide(session: &Session) -> GateDecision {
        match session.status() {
            SessionStatus::Uninitialized | SessionStatus::Loading => {
                GateDecision::ShowLoadingPlaceholder
            }
            SessionStatus::Unauthenticated => GateDecision::RedirectToLogin,
            SessionStatus::Authenticated => GateDecision::Allow,
        }
    }

    /// Decide whether a guest-only view may render.
    #[must_use]
    pub const fn decide_guest_only(session: &Session) -> GuestGateDecision {
        match session.status() {
            SessionStatus::Uninitialized | SessionStatus::Loading => {
                GuestGateDecision::ShowLoadingPlaceholder
            }
            SessionStatus::Unauthenticated => GuestGateDecision::Allow,
            SessionStatus::Authenticated => GuestGateDecision::RedirectHome,
        }
    }
}

/// What the router should do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    /// Render the requested view.
    Render,
    /// Render a loading placeholder.
    Placeholder,
    /// Navigate elsewhere.
    Redirect {
        /// Target path.
        to: String,
        /// Replace the current history entry instead of pushing one.
        replace: bool,
    },
}

/// [`AccessGate`] bound to concrete redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
}

impl RouteGuard {
    /// Guard redirecting to `login_path` and `home_path`.
    #[must_use]
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    /// Guard using the configured paths.
    #[must_use]
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(settings.login_path(), settings.home_path())
    }

    /// Navigation for a protected route. Redirects replace the history entry
    /// so "back" does not return to the gated page.
    #[must_use]
    pub fn protected(&self, session: &Session) -> Navigation {
        match AccessGate::decide(session) {
            GateDecision::Allow => Navigation::Render,
            GateDecision::ShowLoadingPlaceholder => Navigation::Placeholder,
            GateDecision::RedirectToLogin => Navigation::Redirect {
                to: self.login_path.clone(),
                replace: true,
            },
        }
    }

    /// Navigation for a guest-only route.
    #[must_use]
    pub fn guest_only(&self, session: &Session) -> Navigation {
        match AccessGate::decide_guest_only(session) {
            GuestGateDecision::Allow => Navigation::Render,
            GuestGateDecision::ShowLoadingPlaceholder => Navigation::Placeholder,
            GuestGateDecision::RedirectHome => Navigation::Redirect {
                to: self.home_path.clone(),
                replace: false,
            },
        }
    }
}
