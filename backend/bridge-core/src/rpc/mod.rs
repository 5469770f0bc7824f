pub mod client;
pub mod connection_state;
pub mod pending;
pub mod subscribers;

pub use client::{RpcClient, RpcClientConfig};
pub use connection_state::ConnectionState;
pub use subscribers::{Subscribers, Subscription};
