//! # Entitle Store
//!
//! The connection to a platform commerce store. Provides a trait-based
//! interface for the store backend, the connection lifecycle built on top
//! of it, and an in-memory backend for tests.
//!
//! ## Overview
//!
//! [`StoreConnection`] owns the handshake with the backend and the product
//! catalog it returns. It moves through
//! `Uninitialized → Initializing → Ready | Failed` and publishes every
//! change on a watch channel, so dependents can wait for readiness without
//! polling.
//!
//! ## Key Types
//!
//! - [`StoreBackend`] - The async trait a store SDK adapter implements
//! - [`TransactionSink`] - Channel the backend reports purchase outcomes on
//! - [`StoreConnection`] - Connection lifecycle and catalog owner
//! - [`ConnectionState`] - Lifecycle state of the connection
//! - [`MemoryBackend`] - Scriptable in-memory backend
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use entitle_core::ProductDefinition;
//! use entitle_store::{MemoryBackend, StoreConnection};
//!
//! async fn example() {
//!     let connection = Arc::new(StoreConnection::new(MemoryBackend::new(), 64));
//!     connection
//!         .configure(vec![ProductDefinition::non_consumable("com.vendor.app.noad")])
//!         .unwrap();
//!     connection.start().unwrap();
//!
//!     let mut ready = connection.subscribe();
//!     ready.wait_for(|state| state.is_ready()).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No automatic retry**: a failed handshake stays `Failed` until the host
//!   explicitly starts a new attempt
//! - **Exactly one outcome**: each purchase request yields one
//!   [`TransactionEvent`](entitle_core::TransactionEvent)
//! - **Unsolicited outcomes**: the backend may report restored purchases on
//!   the same sink at any time

pub mod backend;
pub mod connection;
pub mod error;
pub mod memory;

pub use backend::{ConfigurationRequest, StoreBackend, TransactionSink};
pub use connection::{ConnectionState, StoreConnection};
pub use error::{Result, StoreError};
pub use memory::{InitBehavior, MemoryBackend};
