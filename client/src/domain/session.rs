//! Session value, provider session lookups, and provider lifecycle events.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::account::AccountId;

/// Authentication status tracked by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Process start, before the store has been initialised.
    #[default]
    Uninitialized,
    /// Waiting for the identity provider to report an existing session.
    Loading,
    /// An account is signed in.
    Authenticated,
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionStatus {
    /// Stable string form used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current authentication status.
///
/// ## Invariants
/// - `account_id` is present if and only if `status` is
///   [`SessionStatus::Authenticated`]. The constructors are the only way to
///   build a value, so the invariant cannot be broken from outside.
///
/// # Examples
/// ```
/// use horizon_client::domain::{AccountId, Session, SessionStatus};
///
/// let session = Session::authenticated(AccountId::new("u1").unwrap(), None);
/// assert_eq!(session.status(), SessionStatus::Authenticated);
/// assert!(Session::unauthenticated().account_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    status: SessionStatus,
    account_id: Option<AccountId>,
    email_hint: Option<String>,
}

impl Session {
    /// Session before initialisation.
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self::anonymous(SessionStatus::Uninitialized)
    }

    /// Session while the initial lookup is in flight.
    #[must_use]
    pub const fn loading() -> Self {
        Self::anonymous(SessionStatus::Loading)
    }

    /// Signed-out session.
    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self::anonymous(SessionStatus::Unauthenticated)
    }

    /// Signed-in session for `account_id`.
    #[must_use]
    pub fn authenticated(account_id: AccountId, email_hint: Option<String>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            account_id: Some(account_id),
            email_hint,
        }
    }

    const fn anonymous(status: SessionStatus) -> Self {
        Self {
            status,
            account_id: None,
            email_hint: None,
        }
    }

    /// Authentication status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Signed-in account, if any.
    #[must_use]
    pub const fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Email address reported by the provider, for display only.
    #[must_use]
    pub fn email_hint(&self) -> Option<&str> {
        self.email_hint.as_deref()
    }

    /// Whether an account is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

impl From<ProviderSession> for Session {
    fn from(value: ProviderSession) -> Self {
        Self::authenticated(value.account_id, value.email_hint)
    }
}

/// Existing session reported by the identity provider's one-shot lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSession {
    /// Signed-in account.
    pub account_id: AccountId,
    /// Email address for display.
    #[serde(default)]
    pub email_hint: Option<String>,
}

/// Metadata captured at sign-up, used to seed the first profile.
///
/// Values are raw provider input; the provisioner drops anything that fails
/// profile validation rather than refusing to create the profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMetadata {
    /// Requested display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Requested avatar URL.
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

impl SeedMetadata {
    /// Seed carrying only a display name.
    #[must_use]
    pub fn with_display_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            avatar_ref: None,
        }
    }
}

/// Lifecycle events pushed by the identity provider.
///
/// # Examples
/// ```
/// use horizon_client::domain::ProviderEvent;
///
/// let event: ProviderEvent = serde_json::from_str(
///     r#"{"type":"account-created","accountId":"u42","emailHint":"a@b.com","seed":{"displayName":"Ana"}}"#,
/// )
/// .unwrap();
/// assert_eq!(event.name(), "account-created");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProviderEvent {
    /// An existing account signed in.
    SignedIn {
        /// Signed-in account.
        account_id: AccountId,
        /// Email address for display.
        #[serde(default)]
        email_hint: Option<String>,
    },
    /// The current account signed out.
    SignedOut,
    /// A new account was created and is now signed in.
    AccountCreated {
        /// New account.
        account_id: AccountId,
        /// Email address for display.
        #[serde(default)]
        email_hint: Option<String>,
        /// Sign-up metadata used to seed the profile.
        #[serde(default)]
        seed: SeedMetadata,
    },
    /// Credentials were refreshed; session identity is unchanged.
    TokenRefreshed,
}

impl ProviderEvent {
    /// Event name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed-in",
            Self::SignedOut => "signed-out",
            Self::AccountCreated { .. } => "account-created",
            Self::TokenRefreshed => "token-refreshed",
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).expect("valid account id")
    }

    #[rstest]
    #[case(Session::uninitialized(), SessionStatus::Uninitialized)]
    #[case(Session::loading(), SessionStatus::Loading)]
    #[case(Session::unauthenticated(), SessionStatus::Unauthenticated)]
    fn anonymous_sessions_carry_no_account(
        #[case] session: Session,
        #[case] status: SessionStatus,
    ) {
        assert_eq!(session.status(), status);
        assert!(session.account_id().is_none());
        assert!(session.email_hint().is_none());
        assert!(!session.is_authenticated());
    }

    #[rstest]
    fn authenticated_sessions_carry_account() {
        let session = Session::authenticated(account("u1"), Some("a@b.com".to_owned()));
        assert!(session.is_authenticated());
        assert_eq!(session.account_id(), Some(&account("u1")));
        assert_eq!(session.email_hint(), Some("a@b.com"));
    }

    #[rstest]
    fn default_session_is_uninitialized() {
        assert_eq!(Session::default(), Session::uninitialized());
    }

    #[rstest]
    fn session_serialises_in_camel_case() {
        let session = Session::authenticated(account("u1"), None);
        assert_eq!(
            serde_json::to_value(&session).expect("serialise session"),
            json!({ "status": "authenticated", "accountId": "u1", "emailHint": null })
        );
    }

    #[rstest]
    #[case(json!({ "type": "signed-out" }), ProviderEvent::SignedOut)]
    #[case(json!({ "type": "token-refreshed" }), ProviderEvent::TokenRefreshed)]
    #[case(
        json!({ "type": "signed-in", "accountId": "u1" }),
        ProviderEvent::SignedIn { account_id: account("u1"), email_hint: None }
    )]
    #[case(
        json!({ "type": "account-created", "accountId": "u42", "emailHint": "a@b.com" }),
        ProviderEvent::AccountCreated {
            account_id: account("u42"),
            email_hint: Some("a@b.com".to_owned()),
            seed: SeedMetadata::default(),
        }
    )]
    fn decodes_provider_events(#[case] raw: serde_json::Value, #[case] expected: ProviderEvent) {
        let event: ProviderEvent = serde_json::from_value(raw).expect("decode event");
        assert_eq!(event, expected);
    }

    #[rstest]
    fn rejects_events_with_invalid_account_ids() {
        let result: Result<ProviderEvent, _> =
            serde_json::from_value(json!({ "type": "signed-in", "accountId": "" }));
        assert!(result.is_err());
    }
}
