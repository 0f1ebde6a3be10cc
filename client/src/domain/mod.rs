//! Domain primitives, services, and ports for the session core.
//!
//! Purpose: Define the strongly typed session and profile model together with
//! the services that coordinate identity, profile consistency, and route
//! gating. Nothing in this module knows which identity provider or profile
//! store backs it; adapters plug in through [`ports`].
//!
//! Public surface:
//! - [`SessionStore`] — single writer of session state, subscribed to the
//!   identity provider.
//! - [`ProfileProvisioner`] — idempotent first-time profile creation.
//! - [`ProfileEditor`] — validated, serialised profile mutations.
//! - [`AccessGate`] / [`RouteGuard`] — navigation decisions.
//! - [`views`] — read-only projections for display.
//! - [`Error`] / [`ErrorCode`] — transport agnostic failure taxonomy.

pub mod access_gate;
pub mod account;
pub mod credentials;
pub mod error;
pub mod ports;
pub mod profile;
pub mod profile_editor;
pub mod provisioner;
pub mod session;
pub mod session_store;
pub mod views;

pub use self::access_gate::{AccessGate, GateDecision, GuestGateDecision, Navigation, RouteGuard};
pub use self::account::{
    AccountId, AvatarRef, DISPLAY_NAME_MAX, DISPLAY_NAME_MIN, DisplayName, ProfileValidationError,
};
pub use self::credentials::{
    CredentialsValidationError, LoginCredentials, PASSWORD_MIN, Registration,
};
pub use self::error::{DomainError, DomainError as Error, ErrorCode, ErrorValidationError};
pub use self::profile::{EcoPoints, Profile, ProfileChanges, ProfilePatch};
pub use self::profile_editor::ProfileEditor;
pub use self::provisioner::{ProfileProvisioner, ProvisionOutcome};
pub use self::session::{ProviderEvent, ProviderSession, SeedMetadata, Session, SessionStatus};
pub use self::session_store::{
    ProfileCache, ProfileState, SessionSnapshot, SessionStore, SessionStorePorts,
};
pub use self::views::{AccountSummary, Achievement, AuthAffordance, ProfileView, SessionView};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use horizon_client::domain::{DomainResult, Error};
///
/// fn edit() -> DomainResult<()> {
///     Err(Error::unauthenticated("no user signed in"))
/// }
/// assert!(edit().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
