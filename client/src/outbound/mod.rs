//! Outbound adapters implementing the domain ports.
//!
//! - **memory_identity_provider**: scriptable identity provider that holds
//!   accounts in memory and pushes lifecycle events to listeners.
//! - **memory_profile_store**: process-local profile store with atomic
//!   conditional inserts, compare-and-swap updates, and fault injection.
//!
//! Adapters are thin translators. They contain no session logic.

pub mod memory_identity_provider;
pub mod memory_profile_store;

pub use memory_identity_provider::{InMemoryIdentityProvider, PendingSession};
pub use memory_profile_store::InMemoryProfileStore;
