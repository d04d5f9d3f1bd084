#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("WebSocket error: {}", .0)]
    WebSocket(#[from] tungstenite::Error),

    #[error("Mixer handshake failed: {}", .0)]
    Handshake(String),

    #[error("Mixer requires authentication but no password is configured")]
    PasswordRequired,

    #[error("Mixer connection closed")]
    Disconnected,

    #[error("Request {request} failed: {comment}")]
    Request { request: String, comment: String },

    #[error("Malformed mixer payload: {}", .0)]
    Payload(#[from] serde_json::Error),
}
