//! # Entitle Testkit
//!
//! Testing utilities for entitle.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a manager wired to a [`MemoryBackend`](entitle_store::MemoryBackend)
//!   with a recording listener and an ad gate
//! - **Generators**: proptest strategies for consumer call sequences
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use entitle_store::MemoryBackend;
//! use entitle_testkit::fixtures::{TestFixture, NOAD};
//!
//! async fn example() {
//!     let fixture = TestFixture::start(MemoryBackend::new().with_receipt(NOAD));
//!     fixture.listener.wait_for_events(1).await;
//!     assert!(fixture.manager.has_entitlement(NOAD));
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{wait_until, RecordingListener, TestFixture, NOAD};
pub use generators::{call, call_sequence, failure_reason, product_id, Call};
