//! Events crossing the two component boundaries.
//!
//! [`TransactionEvent`] flows from the store into the manager.
//! [`EntitlementEvent`] flows from the manager out to consumers.

use serde::{Deserialize, Serialize};

use crate::product::{Product, PurchaseFailureReason};
use crate::types::ProductId;

/// Outcome of a store transaction.
///
/// Delivered once per purchase request, and also for purchases the store
/// reports on its own (restored transactions). Both are handled the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    /// The store recorded the purchase.
    Completed(Product),
    /// The purchase did not go through.
    Failed {
        product: Product,
        reason: PurchaseFailureReason,
    },
}

impl TransactionEvent {
    /// The product the event refers to.
    pub fn product(&self) -> &Product {
        match self {
            Self::Completed(product) => product,
            Self::Failed { product, .. } => product,
        }
    }

    /// Check if this is a completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Where a grant was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantSource {
    /// Receipt found during the startup check.
    Startup,
    /// Purchase completed during this process.
    Purchase,
}

/// Notification delivered to consumers (ad display, feature gating).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementEvent {
    /// The entitlement is owned: suppress ads and hide any visible ad.
    Granted {
        product_id: ProductId,
        source: GrantSource,
    },
    /// The startup check found no receipt: ads may be shown.
    NoEntitlement { product_id: ProductId },
}

impl EntitlementEvent {
    /// The product the event refers to.
    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::Granted { product_id, .. } => product_id,
            Self::NoEntitlement { product_id } => product_id,
        }
    }

    /// Check if this event grants the entitlement.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}
