//! REST API client module for the streakmate backend.
//!
//! The backend uses bearer token authentication; the transport layer
//! attaches the stored access token to every request and transparently
//! performs a single refresh-and-retry when it has expired.

pub mod backend;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use backend::AuthApi;
pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{Interceptor, SessionSignal};
