//! StoreBackend trait: the contract with the platform commerce store.
//!
//! This trait keeps the connection independent of any particular store SDK.
//! An adapter implements the four message shapes of the backend contract:
//! configuration request, initialization response, purchase request, and
//! purchase response. Receipt presence travels on the returned [`Product`]
//! records.

use std::sync::Arc;

use async_trait::async_trait;
use entitle_core::{
    InitFailureReason, Product, ProductDefinition, ProductId, PurchaseFailureReason,
    TransactionEvent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Result, StoreError};

/// The catalog sent to the store when initializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    /// Products the application wants to sell.
    pub products: Vec<ProductDefinition>,
}

impl ConfigurationRequest {
    /// Build a request from a catalog.
    pub fn new(products: Vec<ProductDefinition>) -> Self {
        Self { products }
    }
}

/// Where the backend reports transaction outcomes.
///
/// Cloneable. The backend receives one at initialization and may keep it to
/// report purchases it learns about on its own (restores, deferred payments).
#[derive(Debug, Clone)]
pub struct TransactionSink {
    tx: mpsc::Sender<TransactionEvent>,
}

impl TransactionSink {
    pub(crate) fn new(tx: mpsc::Sender<TransactionEvent>) -> Self {
        Self { tx }
    }

    /// Deliver an outcome.
    pub async fn deliver(&self, event: TransactionEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| StoreError::ChannelClosed)
    }

    /// Report a completed purchase.
    pub async fn completed(&self, product: Product) -> Result<()> {
        self.deliver(TransactionEvent::Completed(product)).await
    }

    /// Report a failed purchase.
    pub async fn failed(&self, product: Product, reason: PurchaseFailureReason) -> Result<()> {
        self.deliver(TransactionEvent::Failed { product, reason }).await
    }
}

/// The StoreBackend trait: async interface to a platform store.
///
/// # Design Notes
///
/// - **One handshake per attempt**: `initialize` is called once per explicit
///   start; the connection never calls it again on its own.
/// - **One outcome per purchase**: `purchase` resolves to exactly one
///   [`TransactionEvent`]. Cancellation is not supported.
/// - **Acknowledgement**: after a completion has been applied,
///   `finish_transaction` tells the store it can stop redelivering it.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Perform the initialization handshake.
    ///
    /// On success returns the store's records for the requested products.
    async fn initialize(
        &self,
        request: &ConfigurationRequest,
        sink: TransactionSink,
    ) -> std::result::Result<Vec<Product>, InitFailureReason>;

    /// Run a purchase transaction to completion or failure.
    async fn purchase(&self, product: &Product) -> TransactionEvent;

    /// Acknowledge a processed completion.
    async fn finish_transaction(&self, product_id: &ProductId) -> Result<()>;
}

#[async_trait]
impl<B: StoreBackend> StoreBackend for Arc<B> {
    async fn initialize(
        &self,
        request: &ConfigurationRequest,
        sink: TransactionSink,
    ) -> std::result::Result<Vec<Product>, InitFailureReason> {
        (**self).initialize(request, sink).await
    }

    async fn purchase(&self, product: &Product) -> TransactionEvent {
        (**self).purchase(product).await
    }

    async fn finish_transaction(&self, product_id: &ProductId) -> Result<()> {
        (**self).finish_transaction(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let sink = TransactionSink::new(tx);
        drop(rx);

        let product = Product::available(ProductDefinition::non_consumable("noad"));
        let err = sink.completed(product).await.unwrap_err();
        assert!(matches!(err, StoreError::ChannelClosed));
    }
}
