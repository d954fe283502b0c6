//! # Entitle Core
//!
//! Pure primitives for entitle: store products, transaction outcomes,
//! and the entitlement state machine.
//!
//! This crate contains no I/O, no async runtime, no store SDK. It is the
//! vocabulary shared by the store connection and the entitlement manager.
//!
//! ## Key Types
//!
//! - [`ProductId`] - Store-assigned product identifier
//! - [`Product`] - Catalog record returned by the store after initialization
//! - [`TransactionEvent`] - Completion or failure of a purchase
//! - [`EntitlementEvent`] - Notification delivered to consumers
//! - [`EntitlementPhase`] - The manager's lifecycle state machine
//! - [`EntitlementCache`] - In-memory owned/not-owned cache

pub mod error;
pub mod event;
pub mod product;
pub mod state;
pub mod types;

pub use error::TransitionError;
pub use event::{EntitlementEvent, GrantSource, TransactionEvent};
pub use product::{
    InitFailureReason, Product, ProductDefinition, ProductKind, PurchaseFailureReason,
};
pub use state::{EntitlementCache, EntitlementPhase};
pub use types::ProductId;
