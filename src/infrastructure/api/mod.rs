//! Marketplace REST API client.

mod client;
mod dto;

pub use client::{HttpNotificationApi, map_status};
