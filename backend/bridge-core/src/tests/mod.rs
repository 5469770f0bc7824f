mod adapter;
mod config;
mod confirmation;
mod envelope;
mod error;
mod rpc;
