//! StoreConnection: lifecycle of the link to the platform store.
//!
//! ```text
//! Uninitialized ──start──▶ Initializing ──ok──▶ Ready
//!                               │
//!                               └──error──▶ Failed(reason)
//! ```
//!
//! `Ready` is final. `Failed` is final unless the host explicitly calls
//! [`StoreConnection::start`] again; nothing retries on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use entitle_core::{InitFailureReason, Product, ProductDefinition, ProductId, TransactionEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{ConfigurationRequest, StoreBackend, TransactionSink};
use crate::error::{Result, StoreError};

/// Lifecycle state of the store connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed(InitFailureReason),
}

impl ConnectionState {
    /// Check if the connection can serve catalog, purchase and receipt queries.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if a handshake is running or has succeeded.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Ready)
    }
}

/// The connection to the store backend.
///
/// Owns the connection state and the product catalog. Shared behind an
/// `Arc` because the handshake and purchase requests run on spawned tasks.
pub struct StoreConnection<B: StoreBackend> {
    /// The store adapter.
    backend: Arc<B>,
    /// Lifecycle state, observable through [`StoreConnection::subscribe`].
    state: watch::Sender<ConnectionState>,
    /// Catalog built by the last `configure`.
    request: Mutex<Option<ConfigurationRequest>>,
    /// Product records returned by the handshake.
    catalog: RwLock<HashMap<ProductId, Product>>,
    /// Sending half of the transaction channel.
    sink: TransactionSink,
    /// Receiving half of the transaction channel.
    events: tokio::sync::Mutex<mpsc::Receiver<TransactionEvent>>,
}

impl<B: StoreBackend> StoreConnection<B> {
    /// Create an unconfigured connection.
    ///
    /// `event_capacity` bounds the number of undelivered transaction events.
    pub fn new(backend: B, event_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(event_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Uninitialized);

        Self {
            backend: Arc::new(backend),
            state,
            request: Mutex::new(None),
            catalog: RwLock::new(HashMap::new()),
            sink: TransactionSink::new(tx),
            events: tokio::sync::Mutex::new(rx),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribe to lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// True iff the connection is `Ready`.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Build the configuration request for the given catalog.
    ///
    /// No-op while a handshake is running or has succeeded.
    pub fn configure(&self, catalog: Vec<ProductDefinition>) -> Result<()> {
        if self.state.borrow().is_active() {
            debug!("store connection already active, ignoring configure");
            return Ok(());
        }
        if catalog.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        let mut request = self.request.lock().unwrap_or_else(|e| e.into_inner());
        *request = Some(ConfigurationRequest::new(catalog));
        Ok(())
    }

    /// Issue the asynchronous initialization request.
    ///
    /// Returns immediately. The outcome moves the state to `Ready` or
    /// `Failed`. No-op while a handshake is running or has succeeded; from
    /// `Failed` this starts a fresh attempt.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let request = self
            .request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(StoreError::NotConfigured)?;

        let claimed = self.state.send_if_modified(|state| {
            if state.is_active() {
                false
            } else {
                *state = ConnectionState::Initializing;
                true
            }
        });
        if !claimed {
            debug!("store connection already active, ignoring start");
            return Ok(());
        }

        info!(products = request.products.len(), "initializing store connection");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.backend.initialize(&request, this.sink.clone()).await;
            this.finish_initialization(result);
        });

        Ok(())
    }

    fn finish_initialization(&self, result: std::result::Result<Vec<Product>, InitFailureReason>) {
        match result {
            Ok(products) => {
                let count = products.len();
                {
                    let mut catalog = self.catalog.write().unwrap_or_else(|e| e.into_inner());
                    catalog.clear();
                    catalog.extend(products.into_iter().map(|p| (p.id().clone(), p)));
                }
                self.state.send_replace(ConnectionState::Ready);
                info!(products = count, "store connection ready");
            }
            Err(reason) => {
                warn!(%reason, "store initialization failed");
                self.state.send_replace(ConnectionState::Failed(reason));
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Catalog record for a product.
    ///
    /// `None` if the connection is not ready or the id is unknown.
    pub fn lookup_product(&self, product_id: &ProductId) -> Option<Product> {
        if !self.is_ready() {
            return None;
        }
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        catalog.get(product_id).cloned()
    }

    /// Whether the store holds a receipt for a product.
    ///
    /// False when not ready or the product is unknown.
    pub fn has_receipt(&self, product_id: &ProductId) -> bool {
        self.lookup_product(product_id)
            .map(|p| p.has_receipt)
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a purchase.
    ///
    /// Returns immediately. Exactly one [`TransactionEvent`] for the product
    /// later arrives through [`StoreConnection::next_event`]. There is no way
    /// to cancel it.
    pub fn initiate_purchase(self: &Arc<Self>, product: Product) -> Result<()> {
        if !self.is_ready() {
            return Err(StoreError::NotReady);
        }

        info!(product = %product.id(), "initiating purchase");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.backend.purchase(&product).await;
            if let Err(e) = this.sink.deliver(outcome).await {
                warn!(product = %product.id(), error = %e, "dropping purchase outcome");
            }
        });

        Ok(())
    }

    /// Wait for the next transaction outcome.
    ///
    /// Completed products are marked as having a receipt in the catalog
    /// before the event is returned. Products outside the configured catalog
    /// are passed through without being added to it. Returns `None` once no
    /// sender remains.
    pub async fn next_event(&self) -> Option<TransactionEvent> {
        let event = self.events.lock().await.recv().await?;

        if let TransactionEvent::Completed(product) = &event {
            let mut catalog = self.catalog.write().unwrap_or_else(|e| e.into_inner());
            match catalog.get_mut(product.id()) {
                Some(entry) => entry.has_receipt = true,
                None => debug!(product = %product.id(), "completion outside catalog"),
            }
        }

        Some(event)
    }

    /// Tell the store a completion has been applied.
    pub async fn finish_transaction(&self, product_id: &ProductId) -> Result<()> {
        self.backend.finish_transaction(product_id).await
    }
}
