//! Driven ports the session core depends on.
//!
//! The identity provider authenticates and pushes lifecycle events; the
//! profile store persists one profile per account. Adapters live in
//! `crate::outbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_provider;
mod profile_store;

#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    AuthEventListener, IdentityProvider, IdentityProviderError, Subscription,
};
#[cfg(test)]
pub use profile_store::MockProfileStore;
pub use profile_store::{InsertOutcome, ProfileStore, ProfileStoreError, ProfileUpdate};
