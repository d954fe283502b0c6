//! In-memory implementation of the StoreBackend trait.
//!
//! This is primarily for testing. Every behavior a real store can show is
//! scriptable: slow, failing or hanging handshakes, pre-existing receipts,
//! unavailable products, failing purchases, and restored purchases pushed
//! without a request.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::Notify;

use entitle_core::{
    InitFailureReason, Product, ProductId, PurchaseFailureReason, TransactionEvent,
};

use crate::backend::{ConfigurationRequest, StoreBackend, TransactionSink};
use crate::error::{Result, StoreError};

/// How the next handshake behaves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitBehavior {
    /// Succeed immediately.
    #[default]
    Succeed,
    /// Fail immediately with the given reason.
    Fail(InitFailureReason),
    /// Never respond.
    Never,
    /// Succeed once [`MemoryBackend::release_initialization`] is called.
    Gated,
}

/// In-memory store backend.
///
/// Thread-safe via RwLock. No lock is held across an await point.
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
    release: Notify,
}

#[derive(Default)]
struct MemoryBackendInner {
    init: InitBehavior,

    /// Products the account owns.
    receipts: HashSet<ProductId>,

    /// Products the store refuses to sell.
    unavailable: HashSet<ProductId>,

    /// Scripted purchase failures.
    purchase_failures: HashMap<ProductId, PurchaseFailureReason>,

    /// Sink handed over by the last successful handshake.
    sink: Option<TransactionSink>,

    /// Number of handshakes started.
    init_attempts: usize,

    /// Purchase requests, in arrival order.
    purchase_requests: Vec<ProductId>,

    /// Acknowledged completions.
    finished: Vec<ProductId>,
}

impl MemoryBackend {
    /// Create a backend that initializes successfully with no receipts.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner::default()),
            release: Notify::new(),
        }
    }

    /// Set the handshake behavior.
    pub fn with_init(self, behavior: InitBehavior) -> Self {
        self.set_init(behavior);
        self
    }

    /// Start with a receipt for a product.
    pub fn with_receipt(self, product_id: impl Into<ProductId>) -> Self {
        self.write().receipts.insert(product_id.into());
        self
    }

    /// Mark a product as not purchasable.
    pub fn with_unavailable(self, product_id: impl Into<ProductId>) -> Self {
        self.write().unavailable.insert(product_id.into());
        self
    }

    /// Make purchases of a product fail.
    pub fn with_purchase_failure(
        self,
        product_id: impl Into<ProductId>,
        reason: PurchaseFailureReason,
    ) -> Self {
        self.write()
            .purchase_failures
            .insert(product_id.into(), reason);
        self
    }

    /// Change the handshake behavior for later attempts.
    pub fn set_init(&self, behavior: InitBehavior) {
        self.write().init = behavior;
    }

    /// Let a [`InitBehavior::Gated`] handshake finish.
    pub fn release_initialization(&self) {
        self.release.notify_one();
    }

    /// Push a completed purchase the application did not request.
    ///
    /// Fails with [`StoreError::NotReady`] before a successful handshake,
    /// leaving the receipts untouched.
    pub async fn restore(&self, product_id: impl Into<ProductId>) -> Result<()> {
        let product_id = product_id.into();
        let sink = {
            let mut inner = self.write();
            let sink = inner.sink.clone().ok_or(StoreError::NotReady)?;
            inner.receipts.insert(product_id.clone());
            sink
        };

        let product = Product {
            definition: entitle_core::ProductDefinition::non_consumable(product_id),
            available_to_purchase: true,
            has_receipt: true,
        };
        sink.completed(product).await
    }

    /// Number of handshakes started.
    pub fn init_attempts(&self) -> usize {
        self.read().init_attempts
    }

    /// Purchase requests received, in order.
    pub fn purchase_requests(&self) -> Vec<ProductId> {
        self.read().purchase_requests.clone()
    }

    /// Completions acknowledged through `finish_transaction`.
    pub fn finished_transactions(&self) -> Vec<ProductId> {
        self.read().finished.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryBackendInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryBackendInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn catalog_for(&self, request: &ConfigurationRequest) -> Vec<Product> {
        let inner = self.read();
        request
            .products
            .iter()
            .map(|definition| Product {
                definition: definition.clone(),
                available_to_purchase: !inner.unavailable.contains(&definition.id),
                has_receipt: inner.receipts.contains(&definition.id),
            })
            .collect()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn initialize(
        &self,
        request: &ConfigurationRequest,
        sink: TransactionSink,
    ) -> std::result::Result<Vec<Product>, InitFailureReason> {
        let behavior = {
            let mut inner = self.write();
            inner.init_attempts += 1;
            inner.init.clone()
        };

        match behavior {
            InitBehavior::Succeed => {}
            InitBehavior::Fail(reason) => return Err(reason),
            InitBehavior::Never => std::future::pending::<()>().await,
            InitBehavior::Gated => self.release.notified().await,
        }

        if request.products.is_empty() {
            return Err(InitFailureReason::NoProductsAvailable);
        }

        self.write().sink = Some(sink);
        Ok(self.catalog_for(request))
    }

    async fn purchase(&self, product: &Product) -> TransactionEvent {
        let mut inner = self.write();
        inner.purchase_requests.push(product.id().clone());

        if let Some(reason) = inner.purchase_failures.get(product.id()).cloned() {
            return TransactionEvent::Failed {
                product: product.clone(),
                reason,
            };
        }

        inner.receipts.insert(product.id().clone());
        TransactionEvent::Completed(product.clone().with_receipt(true))
    }

    async fn finish_transaction(&self, product_id: &ProductId) -> Result<()> {
        self.write().finished.push(product_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitle_core::ProductDefinition;
    use tokio::sync::mpsc;

    fn request() -> ConfigurationRequest {
        ConfigurationRequest::new(vec![
            ProductDefinition::non_consumable("noad"),
            ProductDefinition::non_consumable("theme"),
        ])
    }

    #[tokio::test]
    async fn test_memory_backend_catalog() {
        let backend = MemoryBackend::new()
            .with_receipt("noad")
            .with_unavailable("theme");
        let (tx, _rx) = mpsc::channel(4);

        let products = backend
            .initialize(&request(), TransactionSink::new(tx))
            .await
            .unwrap();

        assert_eq!(products.len(), 2);
        assert!(products[0].has_receipt);
        assert!(products[0].available_to_purchase);
        assert!(!products[1].has_receipt);
        assert!(!products[1].available_to_purchase);
    }

    #[tokio::test]
    async fn test_memory_backend_scripted_failure() {
        let backend = MemoryBackend::new()
            .with_init(InitBehavior::Fail(InitFailureReason::PurchasingUnavailable));
        let (tx, _rx) = mpsc::channel(4);

        let err = backend
            .initialize(&request(), TransactionSink::new(tx))
            .await
            .unwrap_err();
        assert_eq!(err, InitFailureReason::PurchasingUnavailable);
        assert_eq!(backend.init_attempts(), 1);
    }

    #[tokio::test]
    async fn test_memory_backend_restore_needs_handshake() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.restore("noad").await,
            Err(StoreError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_memory_backend_rejected_restore_grants_nothing() {
        let backend = MemoryBackend::new();
        assert!(backend.restore("noad").await.is_err());

        let (tx, mut rx) = mpsc::channel(4);
        let products = backend
            .initialize(&request(), TransactionSink::new(tx))
            .await
            .unwrap();

        assert!(products.iter().all(|p| !p.has_receipt));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_restore_pushes_completion() {
        let backend = MemoryBackend::new();
        let (tx, mut rx) = mpsc::channel(4);
        backend
            .initialize(&request(), TransactionSink::new(tx))
            .await
            .unwrap();

        backend.restore("noad").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.is_completed());
        assert_eq!(event.product().id().as_str(), "noad");
        assert!(backend.purchase_requests().is_empty());
    }
}
