//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `start` was called before `configure`.
    #[error("store connection not configured")]
    NotConfigured,

    /// The configuration request lists no products.
    #[error("configuration catalog is empty")]
    EmptyCatalog,

    /// The connection has not completed its handshake.
    #[error("store connection not ready")]
    NotReady,

    /// The transaction channel has no receiver.
    #[error("transaction channel closed")]
    ChannelClosed,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
