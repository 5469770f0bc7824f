//! Bridge between untrusted web pages and the wallet host.
//!
//! Pages post [`protocol::PageMessage`] requests on a shared [`bus::PageBus`];
//! the [`host::PageHost`] answers each one with a response or error response
//! echoing the request's `reqId`.

pub mod bus;
pub mod client;
pub mod errors;
pub mod host;
pub mod protocol;

pub use bus::PageBus;
pub use client::{PageClient, PageSettings, Permission, PollerHandle};
pub use host::PageHost;
