//! Client for Pusher-compatible broadcast services.

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod heartbeat;
mod payloads;
mod state;

pub use client::{BroadcastClient, BroadcastClientConfig};
pub(crate) use constants::socket_url;
