//! Error types for the busrx crate.

use std::sync::Arc;

use busrx_client::ClientError;

/// Errors surfaced by a message stream or its configuration.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Invalid configuration, rejected before any broker activity
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The broker client failed while constructing or closing a receiver
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// A handler fault delivered as the stream's terminal error
    #[error("Handler fault: {0}")]
    Handler(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A handler observed cancellation while processing a message
    #[error("Handler observed cancellation")]
    Cancelled,
}

/// Convenience type alias for Results using StreamError.
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let error = StreamError::Configuration("max_concurrent_calls must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: max_concurrent_calls must be positive"
        );

        let error = StreamError::Client(ClientError::EntityNotFound("orders".to_string()));
        assert_eq!(error.to_string(), "Client error: Entity not found: orders");

        let cause: Arc<dyn std::error::Error + Send + Sync> =
            Arc::from(Box::<dyn std::error::Error + Send + Sync>::from("Test"));
        let error = StreamError::Handler(cause);
        assert_eq!(error.to_string(), "Handler fault: Test");

        let error = StreamError::Cancelled;
        assert_eq!(error.to_string(), "Handler observed cancellation");
    }

    #[test]
    fn test_client_error_conversion() {
        let client_error = ClientError::ReceiverClosed("orders".to_string());
        let error: StreamError = client_error.into();
        assert!(matches!(error, StreamError::Client(_)));
    }
}
