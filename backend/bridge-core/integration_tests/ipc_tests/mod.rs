mod helpers;
mod ipc;
mod page_bridge;
mod reconnect;
