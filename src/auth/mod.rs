//! Authentication module
//!
//! Supports: API Key, Basic, Bearer
//!
//! The `Authenticator` applies credentials to every request sent to the
//! search backend. None of the supported schemes need token refresh, so
//! applying them is synchronous.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;

#[cfg(test)]
mod tests;
