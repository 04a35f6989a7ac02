use serde::{Deserialize, Serialize};

/// Error body returned by the API on non-success responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Request body of the broadcast channel authorisation endpoint.
#[derive(Debug, Serialize)]
pub struct ChannelAuthRequest<'a> {
    pub socket_id: &'a str,
    pub channel_name: &'a str,
}

/// Signature returned for a private channel subscription.
#[derive(Debug, Deserialize)]
pub struct ChannelAuthResponse {
    pub auth: String,
}
