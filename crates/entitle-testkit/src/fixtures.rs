//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use entitle::{AdGate, EntitlementConfig, EntitlementListener, EntitlementManager};
use entitle_core::EntitlementEvent;
use entitle_store::MemoryBackend;
use tokio::sync::Notify;

/// Product id used by fixtures.
pub const NOAD: &str = "com.vendor.app.noad";

/// How long helpers wait before giving up.
pub const WAIT: Duration = Duration::from_secs(2);

/// A listener that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<EntitlementEvent>>,
    notify: Notify,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<EntitlementEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of `Granted` events received.
    pub fn granted_count(&self) -> usize {
        self.events().iter().filter(|e| e.is_granted()).count()
    }

    /// Number of `NoEntitlement` events received.
    pub fn no_entitlement_count(&self) -> usize {
        self.events().iter().filter(|e| !e.is_granted()).count()
    }

    /// Wait until at least `count` events have arrived.
    ///
    /// Panics after [`WAIT`].
    pub async fn wait_for_events(&self, count: usize) {
        tokio::time::timeout(WAIT, async {
            loop {
                let notified = self.notify.notified();
                if self.events.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {} events", count));
    }
}

impl EntitlementListener for RecordingListener {
    fn on_entitlement_event(&self, event: &EntitlementEvent) {
        self.events.lock().unwrap().push(event.clone());
        self.notify.notify_waiters();
    }
}

/// A running manager over a memory backend.
pub struct TestFixture {
    pub backend: Arc<MemoryBackend>,
    pub manager: Arc<EntitlementManager<Arc<MemoryBackend>>>,
    pub listener: Arc<RecordingListener>,
    pub ads: Arc<AdGate>,
}

impl TestFixture {
    /// Create the manager, register listeners, and spawn its driver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(backend: MemoryBackend) -> Self {
        Self::start_with(backend, EntitlementConfig::for_product(NOAD))
    }

    /// Same as [`TestFixture::start`] with an explicit configuration.
    pub fn start_with(backend: MemoryBackend, config: EntitlementConfig) -> Self {
        let backend = Arc::new(backend);
        let manager = EntitlementManager::init(backend.clone(), config).unwrap();

        let listener = Arc::new(RecordingListener::new());
        let ads = Arc::new(AdGate::new());
        manager.subscribe(listener.clone());
        manager.subscribe(ads.clone());

        tokio::spawn(manager.clone().run());

        Self {
            backend,
            manager,
            listener,
            ads,
        }
    }

    /// Wait for the startup notification.
    pub async fn started(&self) {
        self.listener.wait_for_events(1).await;
    }
}

/// Yield until `condition` holds.
///
/// Panics after [`WAIT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
