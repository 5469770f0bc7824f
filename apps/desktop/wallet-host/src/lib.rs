//! Headless wallet host: serves the bridge to UI contexts over a local WebSocket.

pub mod error;
pub mod host;
pub mod logger;
