//! Shared primitives for the wallet bridge workspace.
//!
//! Everything here is dependency-light so that both the bridge core and the
//! host binary can use it without pulling in the async stack.
//!
//! ## Architecture
//!
//! - **common** (this crate): error locations, secret wrappers
//! - **bridge-core**: envelope, transports, RPC client, adapter, confirmations
//! - **wallet-host**: binary wiring everything together

pub mod error;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;

#[cfg(test)]
mod tests;
