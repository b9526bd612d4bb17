use eventbridge_core::{Address, FrameError, UnknownAddress};

/// Failure of the underlying connection. Always recoverable.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] FrameError),
    #[error("connection closed")]
    Closed,
}

/// A single inbound frame that could not be delivered.
///
/// Never fatal to the tunnel: the frame is reported and the connection
/// stays up.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("frame has no address")]
    MissingAddress,
    #[error(transparent)]
    UnknownAddress(#[from] UnknownAddress),
    #[error("failed to decode {address} body: {reason}")]
    Decode { address: Address, reason: String },
    #[error("server error: {message}")]
    Server { message: String },
}

impl From<FrameError> for DispatchError {
    fn from(err: FrameError) -> Self {
        DispatchError::Malformed(err.to_string())
    }
}

/// Errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
