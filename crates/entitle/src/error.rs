//! Error types for the entitlement manager.

use entitle_core::{ProductId, TransitionError};
use entitle_store::StoreError;
use thiserror::Error;

/// Errors that can occur during entitlement operations.
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// Store connection error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// State machine violation.
    #[error("state error: {0}")]
    Transition(#[from] TransitionError),

    /// A purchase precondition did not hold; nothing reached the store.
    #[error("purchase rejected: {0}")]
    Rejected(PurchaseRejection),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `run` is already driving this manager.
    #[error("entitlement manager already running")]
    AlreadyRunning,
}

/// Why `purchase` returned without contacting the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseRejection {
    #[error("store connection not ready")]
    NotReady,

    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("product not purchasable: {0}")]
    NotPurchasable(ProductId),

    #[error("already owned: {0}")]
    AlreadyOwned(ProductId),
}

impl From<PurchaseRejection> for EntitlementError {
    fn from(rejection: PurchaseRejection) -> Self {
        EntitlementError::Rejected(rejection)
    }
}

/// Result type for entitlement operations.
pub type Result<T> = std::result::Result<T, EntitlementError>;
