//! Session and profile lifecycle core for the Green Horizon client shell.
//!
//! The crate tracks whether a visitor is signed in, reacts to identity
//! provider events, provisions one profile record per account, gates
//! protected views, and keeps a cached profile consistent with the profile
//! store while it is edited.
//!
//! Layout follows a hexagonal split:
//! - [`domain`] holds the state machine, services, and port traits.
//! - [`outbound`] holds in-memory adapters for the identity provider and the
//!   profile store.
//! - [`config`] and [`telemetry`] carry settings and log bootstrap.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::ClientSettings;
