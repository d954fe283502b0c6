//! Consumers of entitlement notifications.

use std::sync::atomic::{AtomicBool, Ordering};

use entitle_core::EntitlementEvent;
use tracing::debug;

/// Receives [`EntitlementEvent`]s synchronously, in emission order.
///
/// `Granted` may arrive more than once over a process lifetime and must be
/// treated as "ensure suppressed".
pub trait EntitlementListener: Send + Sync {
    fn on_entitlement_event(&self, event: &EntitlementEvent);
}

impl<F> EntitlementListener for F
where
    F: Fn(&EntitlementEvent) + Send + Sync,
{
    fn on_entitlement_event(&self, event: &EntitlementEvent) {
        self(event)
    }
}

/// Ad display gate driven by entitlement events.
///
/// Holds the global "ads suppressed" flag and whether a banner is showing.
#[derive(Debug, Default)]
pub struct AdGate {
    suppressed: AtomicBool,
    banner_visible: AtomicBool,
}

impl AdGate {
    /// Create a gate with ads allowed and no banner showing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether ads are suppressed for the rest of the process.
    pub fn ads_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Whether a banner ad is currently shown.
    pub fn banner_visible(&self) -> bool {
        self.banner_visible.load(Ordering::SeqCst)
    }
}

impl EntitlementListener for AdGate {
    fn on_entitlement_event(&self, event: &EntitlementEvent) {
        match event {
            EntitlementEvent::Granted { .. } => {
                self.suppressed.store(true, Ordering::SeqCst);
                if self.banner_visible.swap(false, Ordering::SeqCst) {
                    debug!(product = %event.product_id(), "hiding banner ad");
                }
            }
            EntitlementEvent::NoEntitlement { .. } => {
                if !self.ads_suppressed() {
                    self.banner_visible.store(true, Ordering::SeqCst);
                    debug!(product = %event.product_id(), "showing banner ad");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitle_core::{GrantSource, ProductId};

    fn granted() -> EntitlementEvent {
        EntitlementEvent::Granted {
            product_id: ProductId::from("noad"),
            source: GrantSource::Purchase,
        }
    }

    fn no_entitlement() -> EntitlementEvent {
        EntitlementEvent::NoEntitlement {
            product_id: ProductId::from("noad"),
        }
    }

    #[test]
    fn test_ad_gate_shows_then_hides() {
        let gate = AdGate::new();
        gate.on_entitlement_event(&no_entitlement());
        assert!(gate.banner_visible());
        assert!(!gate.ads_suppressed());

        gate.on_entitlement_event(&granted());
        assert!(!gate.banner_visible());
        assert!(gate.ads_suppressed());

        // Repeated grant is harmless.
        gate.on_entitlement_event(&granted());
        assert!(gate.ads_suppressed());
    }

    #[test]
    fn test_ad_gate_stays_suppressed() {
        let gate = AdGate::new();
        gate.on_entitlement_event(&granted());
        gate.on_entitlement_event(&no_entitlement());
        assert!(!gate.banner_visible());
    }

    #[test]
    fn test_closure_listener() {
        let seen = std::sync::Mutex::new(Vec::new());
        let listener = |event: &EntitlementEvent| seen.lock().unwrap().push(event.clone());
        listener.on_entitlement_event(&granted());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
