//! Presentation layer rendering the feed for the terminal.

/// Text formatting of records, summaries and toasts.
pub mod console;

pub use console::ConsoleView;
