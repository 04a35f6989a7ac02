//! Domain error types.

mod api_error;
mod broadcast_error;
mod payload_error;

pub use api_error::ApiError;
pub use broadcast_error::{BroadcastError, BroadcastResult};
pub use payload_error::PayloadError;
