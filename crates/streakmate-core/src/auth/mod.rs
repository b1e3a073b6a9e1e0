//! Authentication module: session lifecycle and credential storage.
//!
//! This module provides:
//! - `CredentialStore`: token and snapshot storage across two scopes
//! - `SessionState` and the startup session restore sequence
//! - `AuthManager`: the facade that owns the session state
//!
//! Tokens are opaque bearer credentials; the durable scope persists as a
//! JSON file while the ephemeral scope lives and dies with the process.

pub mod manager;
pub mod session;
pub mod store;

pub use manager::AuthManager;
pub use session::SessionState;
pub use store::{CredentialStore, StorageScope, StoredCredentials, TokenPair, SCOPE_PROBE_ORDER};
