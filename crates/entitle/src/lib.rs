//! # Entitle
//!
//! A single "remove ads" entitlement sold through a platform commerce store.
//!
//! ## Overview
//!
//! The crate manages one non-consumable entitlement end to end:
//!
//! - **Connection**: connect to the store backend exactly once per process
//! - **Readiness**: nothing queries entitlement state before the connection exists
//! - **Startup check**: an existing receipt grants the entitlement before any ad is shown
//! - **Purchase**: local precondition checks, then an asynchronous store transaction
//! - **Notification**: consumers (ad display, feature gating) hear about every change
//!
//! ## Key Concepts
//!
//! - **Receipt**: store-held proof of purchase. Queried, never stored locally.
//! - **Fail-safe**: ownership is never reported before the store confirms it.
//! - **Owned is terminal**: a non-consumable, once owned, stays owned.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use entitle::{AdGate, EntitlementConfig, EntitlementManager};
//! use entitle::store::MemoryBackend;
//!
//! async fn example() {
//!     // One manager per process, created at startup
//!     let manager = EntitlementManager::init(MemoryBackend::new(), EntitlementConfig::default())
//!         .unwrap();
//!
//!     // Consumers register before the startup check runs
//!     let ads = Arc::new(AdGate::new());
//!     manager.subscribe(ads.clone());
//!
//!     // Drive readiness, the startup check and purchase outcomes
//!     tokio::spawn(manager.clone().run());
//!
//!     // Later, from the "remove ads" button
//!     let _ = manager.purchase(manager.config().entitlement_id.clone());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `entitle::core` - Products, events, state machine
//! - `entitle::store` - Store backend trait and connection

pub mod error;
pub mod listener;
pub mod manager;

// Re-export component crates
pub use entitle_core as core;
pub use entitle_store as store;

// Re-export main types for convenience
pub use error::{EntitlementError, PurchaseRejection, Result};
pub use listener::{AdGate, EntitlementListener};
pub use manager::{EntitlementConfig, EntitlementManager, DEFAULT_ENTITLEMENT_ID};

// Re-export commonly used core types
pub use entitle_core::{
    EntitlementEvent, EntitlementPhase, GrantSource, InitFailureReason, Product,
    ProductDefinition, ProductId, ProductKind, PurchaseFailureReason, TransactionEvent,
};
pub use entitle_store::{ConnectionState, StoreBackend};
