//! The EntitlementManager: the single authority on entitlement state.
//!
//! The manager brings the store connection, the entitlement state machine
//! and consumer notification together. The host creates exactly one
//! instance at startup and hands the `Arc` to every consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use entitle_core::{
    EntitlementCache, EntitlementEvent, EntitlementPhase, GrantSource, Product,
    ProductDefinition, ProductId, ProductKind, PurchaseFailureReason, TransactionEvent,
};
use entitle_store::{ConnectionState, StoreBackend, StoreConnection, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EntitlementError, PurchaseRejection, Result};
use crate::listener::EntitlementListener;

/// Default entitlement product.
pub const DEFAULT_ENTITLEMENT_ID: &str = "com.ggulnimstudio.colorjump.noad";

/// Configuration for the EntitlementManager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementConfig {
    /// The tracked non-consumable product.
    pub entitlement_id: ProductId,
    /// Products registered with the store. Must contain the entitlement.
    pub catalog: Vec<ProductDefinition>,
    /// Bound on undelivered transaction events.
    pub event_capacity: usize,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self::for_product(DEFAULT_ENTITLEMENT_ID)
    }
}

impl EntitlementConfig {
    /// Configuration tracking a single non-consumable product.
    pub fn for_product(id: impl Into<ProductId>) -> Self {
        let entitlement_id = id.into();
        Self {
            catalog: vec![ProductDefinition::non_consumable(entitlement_id.clone())],
            entitlement_id,
            event_capacity: 64,
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.entitlement_id.is_empty() {
            return Err(EntitlementError::InvalidConfig(
                "entitlement id is empty".into(),
            ));
        }

        let entry = self
            .catalog
            .iter()
            .find(|p| p.id == self.entitlement_id)
            .ok_or_else(|| {
                EntitlementError::InvalidConfig(format!(
                    "catalog does not list {}",
                    self.entitlement_id
                ))
            })?;

        if entry.kind != ProductKind::NonConsumable {
            return Err(EntitlementError::InvalidConfig(format!(
                "{} must be non-consumable, found {:?}",
                self.entitlement_id, entry.kind
            )));
        }

        Ok(())
    }
}

/// Mutable state guarded by one lock.
#[derive(Debug, Default)]
struct ManagerState {
    phase: EntitlementPhase,
    cache: EntitlementCache,
    last_failure: Option<(ProductId, PurchaseFailureReason)>,
}

/// The main EntitlementManager struct.
///
/// Provides:
/// - A readiness wait that resolves once the store connection is usable
/// - The startup receipt check and its single notification
/// - Purchase initiation with local precondition checks
/// - Handling of purchase outcomes, requested or not
/// - Fail-safe entitlement queries
pub struct EntitlementManager<B: StoreBackend> {
    /// The store connection.
    connection: Arc<StoreConnection<B>>,
    /// Configuration.
    config: EntitlementConfig,
    /// Phase, ownership cache and diagnostics.
    state: Mutex<ManagerState>,
    /// Notification targets.
    listeners: RwLock<Vec<Arc<dyn EntitlementListener>>>,
    /// Set once `run` has been entered.
    running: AtomicBool,
}

impl<B: StoreBackend> EntitlementManager<B> {
    /// Create the manager and start connecting to the store.
    ///
    /// Configures the connection with the catalog and issues the
    /// initialization request. Must be called from within a tokio runtime.
    pub fn init(backend: B, config: EntitlementConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let connection = Arc::new(StoreConnection::new(backend, config.event_capacity));
        connection.configure(config.catalog.clone())?;
        connection.start()?;

        info!(entitlement = %config.entitlement_id, "entitlement manager created");

        Ok(Arc::new(Self {
            connection,
            config,
            state: Mutex::new(ManagerState::default()),
            listeners: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
        }))
    }

    /// Register a consumer.
    ///
    /// Listeners registered after an event was emitted do not see it.
    pub fn subscribe(&self, listener: Arc<dyn EntitlementListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Get the configuration.
    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    /// Get the store connection.
    pub fn connection(&self) -> &Arc<StoreConnection<B>> {
        &self.connection
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> EntitlementPhase {
        self.lock_state().phase
    }

    /// Current store connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The most recent purchase failure reported by the store.
    pub fn last_failure(&self) -> Option<(ProductId, PurchaseFailureReason)> {
        self.lock_state().last_failure.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Readiness & Startup
    // ─────────────────────────────────────────────────────────────────────────

    /// Wait until the store connection is ready.
    ///
    /// Does not block the thread. If initialization failed this never
    /// resolves, unless the host calls [`EntitlementManager::retry_connection`]
    /// and that attempt succeeds.
    pub async fn await_ready(&self) -> Result<()> {
        let mut rx = self.connection.subscribe();
        rx.wait_for(ConnectionState::is_ready)
            .await
            .map(|_| ())
            .map_err(|_| StoreError::ChannelClosed)?;
        Ok(())
    }

    /// Drive the manager for the process lifetime.
    ///
    /// Waits for readiness, runs the startup check once, then applies
    /// transaction outcomes as the store reports them.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EntitlementError::AlreadyRunning);
        }

        self.await_ready().await?;
        self.check_existing_entitlement()?;

        while let Some(event) = self.connection.next_event().await {
            self.handle_transaction(event).await;
        }

        Ok(())
    }

    /// The startup protocol: check the stored receipt, then notify.
    ///
    /// Nothing may enable ads before this has run.
    fn check_existing_entitlement(&self) -> Result<()> {
        let product_id = self.config.entitlement_id.clone();

        let owned = {
            let mut state = self.lock_state();
            state.phase.begin_check()?;
            let owned = state
                .cache
                .get_or_derive(&product_id, || self.connection.has_receipt(&product_id));
            state.phase.resolve(owned)?;
            owned
        };

        if owned {
            info!(product = %product_id, "existing entitlement found");
            self.emit(EntitlementEvent::Granted {
                product_id,
                source: GrantSource::Startup,
            });
        } else {
            info!(product = %product_id, "no existing entitlement");
            self.emit(EntitlementEvent::NoEntitlement { product_id });
        }

        Ok(())
    }

    /// Start a new connection attempt after initialization failed.
    ///
    /// No-op unless the connection is `Failed`.
    pub fn retry_connection(&self) -> Result<()> {
        if !matches!(self.connection.state(), ConnectionState::Failed(_)) {
            return Ok(());
        }
        info!("retrying store connection");
        self.connection.start()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the entitlement for a product is held.
    ///
    /// False until the store connection is ready; ownership is never claimed
    /// without confirmation.
    pub fn has_entitlement(&self, product_id: impl Into<ProductId>) -> bool {
        let product_id = product_id.into();
        if !self.connection.is_ready() {
            return false;
        }
        self.lock_state()
            .cache
            .get_or_derive(&product_id, || self.connection.has_receipt(&product_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Purchases
    // ─────────────────────────────────────────────────────────────────────────

    /// Request a purchase.
    ///
    /// Returns as soon as the preconditions are checked; the outcome arrives
    /// later as a transaction event. A rejected request never reaches the
    /// store. Callers that do not care why can ignore the error.
    pub fn purchase(&self, product_id: impl Into<ProductId>) -> Result<()> {
        let product_id = product_id.into();

        let product = match self.validate_purchase(&product_id) {
            Ok(product) => product,
            Err(rejection) => {
                debug!(product = %product_id, %rejection, "purchase rejected");
                return Err(rejection.into());
            }
        };

        self.connection.initiate_purchase(product)?;
        Ok(())
    }

    fn validate_purchase(&self, product_id: &ProductId) -> std::result::Result<Product, PurchaseRejection> {
        if !self.connection.is_ready() {
            return Err(PurchaseRejection::NotReady);
        }

        let product = self
            .connection
            .lookup_product(product_id)
            .ok_or_else(|| PurchaseRejection::UnknownProduct(product_id.clone()))?;

        if !product.available_to_purchase {
            return Err(PurchaseRejection::NotPurchasable(product_id.clone()));
        }

        if self.has_entitlement(product_id.clone()) {
            return Err(PurchaseRejection::AlreadyOwned(product_id.clone()));
        }

        Ok(product)
    }

    async fn handle_transaction(&self, event: TransactionEvent) {
        match event {
            TransactionEvent::Completed(product) => self.on_purchase_completed(&product).await,
            TransactionEvent::Failed { product, reason } => {
                self.on_purchase_failed(&product, reason)
            }
        }
    }

    /// Apply a completed purchase, requested or restored.
    ///
    /// Grants the tracked entitlement and notifies consumers the first time
    /// only. The completion is acknowledged to the store either way.
    pub async fn on_purchase_completed(&self, product: &Product) {
        let product_id = product.id().clone();

        let newly_granted = {
            let mut state = self.lock_state();
            state.cache.mark_owned(&product_id);

            if product_id == self.config.entitlement_id {
                match state.phase.grant() {
                    Ok(changed) => changed,
                    Err(e) => {
                        // Startup has not resolved yet; the check will see the cache.
                        debug!(product = %product_id, error = %e, "deferring grant to startup check");
                        false
                    }
                }
            } else {
                debug!(product = %product_id, "completion for untracked product");
                false
            }
        };

        if newly_granted {
            info!(product = %product_id, "entitlement purchased");
            self.emit(EntitlementEvent::Granted {
                product_id: product_id.clone(),
                source: GrantSource::Purchase,
            });
        }

        if let Err(e) = self.connection.finish_transaction(&product_id).await {
            warn!(product = %product_id, error = %e, "failed to acknowledge transaction");
        }
    }

    /// Record a failed purchase. State is unchanged and nothing is retried.
    pub fn on_purchase_failed(&self, product: &Product, reason: PurchaseFailureReason) {
        warn!(product = %product.id(), %reason, "purchase failed");
        self.lock_state().last_failure = Some((product.id().clone(), reason));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn emit(&self, event: EntitlementEvent) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener.on_entitlement_event(&event);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitle_store::MemoryBackend;

    #[test]
    fn test_default_config_is_valid() {
        let config = EntitlementConfig::default();
        assert_eq!(config.entitlement_id.as_str(), DEFAULT_ENTITLEMENT_ID);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_rejects_missing_entitlement() {
        let mut config = EntitlementConfig::for_product("noad");
        config.catalog = vec![ProductDefinition::non_consumable("gems")];
        assert!(matches!(
            config.validate(),
            Err(EntitlementError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_rejects_consumable_entitlement() {
        let mut config = EntitlementConfig::for_product("noad");
        config.catalog = vec![ProductDefinition::new("noad", ProductKind::Consumable)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_id() {
        let config = EntitlementConfig::for_product("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config: EntitlementConfig =
            serde_json::from_str(r#"{"event_capacity": 8}"#).unwrap();
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.entitlement_id.as_str(), DEFAULT_ENTITLEMENT_ID);
        assert_eq!(config.catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let mut config = EntitlementConfig::for_product("noad");
        config.catalog.clear();
        assert!(EntitlementManager::init(MemoryBackend::new(), config).is_err());
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let manager =
            EntitlementManager::init(MemoryBackend::new(), EntitlementConfig::default()).unwrap();
        tokio::spawn(manager.clone().run());
        while !manager.phase().is_resolved() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            manager.clone().run().await,
            Err(EntitlementError::AlreadyRunning)
        ));
    }
}
