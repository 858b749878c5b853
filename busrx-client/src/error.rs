//! Error types for the busrx-client crate.

/// Errors that can occur in a broker client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The addressed queue, topic, or subscription does not exist
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// An entity with this name already exists
    #[error("Entity already exists: {0}")]
    EntityExists(String),

    /// The receiver has already been closed
    #[error("Receiver closed: {0}")]
    ReceiverClosed(String),

    /// A push handler was already registered on this receiver
    #[error("Push handler already registered: {0}")]
    HandlerAlreadyRegistered(String),

    /// A connection-level failure occurred
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Convenience type alias for Results using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
