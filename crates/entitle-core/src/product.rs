//! Store products and the failure reasons a store can report.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ProductId;

/// How the store treats repeated purchases of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    /// Can be bought repeatedly; each purchase is used up.
    Consumable,
    /// Bought at most once per account; ownership never expires.
    NonConsumable,
    /// Time-bounded recurring purchase.
    Subscription,
}

/// A catalog entry sent to the store in the configuration request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductDefinition {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Product kind.
    pub kind: ProductKind,
}

impl ProductDefinition {
    /// Create a definition.
    pub fn new(id: impl Into<ProductId>, kind: ProductKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Shorthand for a non-consumable entry.
    pub fn non_consumable(id: impl Into<ProductId>) -> Self {
        Self::new(id, ProductKind::NonConsumable)
    }
}

/// A product record as held by the store after initialization.
///
/// `available_to_purchase` comes from the store's catalog data and
/// `has_receipt` from the store's purchase record for this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// The definition this record was built from.
    pub definition: ProductDefinition,
    /// Whether the store will currently sell this product.
    pub available_to_purchase: bool,
    /// Whether the store holds a receipt for this product.
    pub has_receipt: bool,
}

impl Product {
    /// A purchasable product with no receipt.
    pub fn available(definition: ProductDefinition) -> Self {
        Self {
            definition,
            available_to_purchase: true,
            has_receipt: false,
        }
    }

    /// The product id.
    pub fn id(&self) -> &ProductId {
        &self.definition.id
    }

    /// The product kind.
    pub fn kind(&self) -> ProductKind {
        self.definition.kind
    }

    /// Builder-style receipt flag.
    pub fn with_receipt(mut self, has_receipt: bool) -> Self {
        self.has_receipt = has_receipt;
        self
    }

    /// Builder-style purchasability flag.
    pub fn with_availability(mut self, available: bool) -> Self {
        self.available_to_purchase = available;
        self
    }
}

/// Why the store handshake failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitFailureReason {
    /// Purchasing is disabled on this device or account.
    PurchasingUnavailable,
    /// None of the configured products exist in the store catalog.
    NoProductsAvailable,
    /// The store does not recognize this application.
    AppNotKnown,
    /// Backend-specific failure.
    Other(String),
}

impl fmt::Display for InitFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PurchasingUnavailable => f.write_str("purchasing unavailable"),
            Self::NoProductsAvailable => f.write_str("no products available"),
            Self::AppNotKnown => f.write_str("app not known"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Why a purchase did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseFailureReason {
    /// Purchasing is disabled on the device.
    PurchasingUnavailable,
    /// Another purchase is still in flight.
    ExistingPurchasePending,
    /// The store no longer sells the product.
    ProductUnavailable,
    /// The receipt signature did not validate.
    SignatureInvalid,
    /// The user backed out of the payment sheet.
    UserCancelled,
    /// The payment method was declined.
    PaymentDeclined,
    /// The transaction was already processed.
    DuplicateTransaction,
    /// Any reason the store does not classify.
    Unknown(String),
}

impl fmt::Display for PurchaseFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PurchasingUnavailable => f.write_str("purchasing unavailable"),
            Self::ExistingPurchasePending => f.write_str("existing purchase pending"),
            Self::ProductUnavailable => f.write_str("product unavailable"),
            Self::SignatureInvalid => f.write_str("signature invalid"),
            Self::UserCancelled => f.write_str("user cancelled"),
            Self::PaymentDeclined => f.write_str("payment declined"),
            Self::DuplicateTransaction => f.write_str("duplicate transaction"),
            Self::Unknown(msg) => write!(f, "unknown: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_builders() {
        let product = Product::available(ProductDefinition::non_consumable("noad"))
            .with_receipt(true)
            .with_availability(false);

        assert_eq!(product.id().as_str(), "noad");
        assert_eq!(product.kind(), ProductKind::NonConsumable);
        assert!(product.has_receipt);
        assert!(!product.available_to_purchase);
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            InitFailureReason::AppNotKnown.to_string(),
            "app not known"
        );
        assert_eq!(
            PurchaseFailureReason::Unknown("timeout".into()).to_string(),
            "unknown: timeout"
        );
    }
}
