//! Proptest generators for property-based testing.

use proptest::prelude::*;

use entitle_core::{ProductId, PurchaseFailureReason};

use crate::fixtures::NOAD;

/// A consumer- or store-side action against a running manager.
#[derive(Debug, Clone)]
pub enum Call {
    /// `purchase(id)` from the UI.
    Purchase(ProductId),
    /// `has_entitlement(id)` from a consumer.
    HasEntitlement(ProductId),
    /// The store pushes a restored purchase.
    Restore(ProductId),
    /// Let the scheduler run spawned tasks.
    Yield,
}

/// Generate a product id: mostly the tracked one, sometimes a stranger.
pub fn product_id() -> impl Strategy<Value = ProductId> {
    prop_oneof![
        3 => Just(ProductId::from(NOAD)),
        1 => "[a-z]{1,12}".prop_map(ProductId::from),
    ]
}

/// Generate a purchase failure reason.
pub fn failure_reason() -> impl Strategy<Value = PurchaseFailureReason> {
    prop_oneof![
        Just(PurchaseFailureReason::PurchasingUnavailable),
        Just(PurchaseFailureReason::ExistingPurchasePending),
        Just(PurchaseFailureReason::ProductUnavailable),
        Just(PurchaseFailureReason::SignatureInvalid),
        Just(PurchaseFailureReason::UserCancelled),
        Just(PurchaseFailureReason::PaymentDeclined),
        Just(PurchaseFailureReason::DuplicateTransaction),
        "[a-z ]{0,16}".prop_map(PurchaseFailureReason::Unknown),
    ]
}

/// Generate a single call.
pub fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        product_id().prop_map(Call::Purchase),
        product_id().prop_map(Call::HasEntitlement),
        product_id().prop_map(Call::Restore),
        Just(Call::Yield),
    ]
}

/// Generate a sequence of calls.
pub fn call_sequence(max_len: usize) -> impl Strategy<Value = Vec<Call>> {
    prop::collection::vec(call(), 0..=max_len)
}
