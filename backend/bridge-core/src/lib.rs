pub mod adapter;
pub mod backend;
pub mod config;
pub mod confirmation;
pub mod envelope;
pub mod error;
pub mod ipc;
pub mod page;
pub mod rpc;
pub mod transport;

#[cfg(test)]
mod tests;

pub const BRIDGE_HOSTNAME: &str = "127.0.0.1";
pub const DEFAULT_IPC_PORT: u16 = 19_480;
pub const BRIDGE_WS_BASE_URL: &str = const_format::concatcp!("ws://", BRIDGE_HOSTNAME);

/// Capacity of the per-link envelope channels on both sides of a connection.
pub const LINK_CHANNEL_CAPACITY: usize = 256;
