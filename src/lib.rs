//! Marquee - live notification feeds for a talent-booking marketplace.
//!
//! Combines the notification REST API with a Pusher-compatible broadcast
//! channel into a duplicate-free feed with an accurate unread count.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the feed services and payload parsing.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer rendering the feed as text.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "marquee";
