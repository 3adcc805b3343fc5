use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept peer connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Bridge already started")]
    AlreadyStarted,

    #[error("Not subscribed to symbol: {0}")]
    NotSubscribed(String),

    #[error("No active connection to peer")]
    NoActiveConnection,

    #[error("Failed to send to peer: {0}")]
    Send(#[source] std::io::Error),
}
