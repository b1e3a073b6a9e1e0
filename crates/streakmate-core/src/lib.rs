//! Core library for streakmate, a daily streak-tracking client.
//!
//! The heart of this crate is the session and token lifecycle: acquiring
//! credentials at login, persisting them in a durable or ephemeral scope,
//! validating or refreshing them at startup, transparently retrying
//! requests once when an access token expires, and exposing one consistent
//! [`SessionState`] to the rest of the application.
//!
//! View code lives elsewhere; nothing in this crate renders anything.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiClient, ApiError, AuthApi, SessionSignal};
pub use auth::{AuthManager, CredentialStore, SessionState, StorageScope, TokenPair};
pub use config::Config;
