//! Entitlement state: the lifecycle phase and the owned-flag cache.
//!
//! ```text
//! AwaitingConnection ──ready──▶ Checking ──receipt──▶ Owned
//!                                   │                   ▲
//!                                   └──no receipt──▶ NotOwned
//!                                                       │
//!                                   purchase completed ─┘
//! ```
//!
//! `Checking` is entered exactly once. `Owned` is terminal: the product is
//! non-consumable, so nothing can take it away during the process lifetime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::types::ProductId;

/// Lifecycle phase of the entitlement manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntitlementPhase {
    /// Store connection not yet usable.
    #[default]
    AwaitingConnection,
    /// Startup receipt check in progress.
    Checking,
    /// Entitlement held.
    Owned,
    /// Startup check found no receipt.
    NotOwned,
}

impl EntitlementPhase {
    /// Whether the startup check has finished.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Owned | Self::NotOwned)
    }

    /// Check if the entitlement is held.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned)
    }

    /// `AwaitingConnection → Checking`.
    pub fn begin_check(&mut self) -> Result<(), TransitionError> {
        self.advance(Self::Checking, |from| from == Self::AwaitingConnection)
    }

    /// `Checking → Owned | NotOwned`.
    pub fn resolve(&mut self, owned: bool) -> Result<(), TransitionError> {
        let to = if owned { Self::Owned } else { Self::NotOwned };
        self.advance(to, |from| from == Self::Checking)
    }

    /// `NotOwned → Owned`. Granting while already `Owned` is allowed and
    /// leaves the phase alone.
    ///
    /// Returns `true` if the phase changed.
    pub fn grant(&mut self) -> Result<bool, TransitionError> {
        match *self {
            Self::Owned => Ok(false),
            Self::NotOwned => {
                *self = Self::Owned;
                Ok(true)
            }
            from => Err(TransitionError {
                from,
                to: Self::Owned,
            }),
        }
    }

    fn advance(
        &mut self,
        to: Self,
        allowed: impl Fn(Self) -> bool,
    ) -> Result<(), TransitionError> {
        if !allowed(*self) {
            return Err(TransitionError { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

/// In-memory cache of derived ownership, keyed by product.
///
/// The store's receipt record is the source of truth. Entries are created
/// lazily on first query, updated in place, and never removed.
#[derive(Debug, Clone, Default)]
pub struct EntitlementCache {
    owned: HashMap<ProductId, bool>,
}

impl EntitlementCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, deriving and storing it on first query.
    pub fn get_or_derive(&mut self, product_id: &ProductId, derive: impl FnOnce() -> bool) -> bool {
        *self
            .owned
            .entry(product_id.clone())
            .or_insert_with(derive)
    }

    /// Record ownership.
    ///
    /// Returns `true` if the product was not already known to be owned.
    pub fn mark_owned(&mut self, product_id: &ProductId) -> bool {
        let entry = self.owned.entry(product_id.clone()).or_insert(false);
        let changed = !*entry;
        *entry = true;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_phase_startup_path() {
        let mut phase = EntitlementPhase::default();
        assert_eq!(phase, EntitlementPhase::AwaitingConnection);

        phase.begin_check().unwrap();
        assert_eq!(phase, EntitlementPhase::Checking);

        phase.resolve(false).unwrap();
        assert_eq!(phase, EntitlementPhase::NotOwned);
        assert!(phase.is_resolved());

        assert!(phase.grant().unwrap());
        assert!(phase.is_owned());
    }

    #[test]
    fn test_phase_check_happens_once() {
        let mut phase = EntitlementPhase::default();
        phase.begin_check().unwrap();
        phase.resolve(true).unwrap();

        let err = phase.begin_check().unwrap_err();
        assert_eq!(err.from, EntitlementPhase::Owned);
        assert_eq!(err.to, EntitlementPhase::Checking);
        assert!(phase.resolve(false).is_err());
    }

    #[test]
    fn test_phase_grant_before_check_rejected() {
        let mut phase = EntitlementPhase::default();
        assert!(phase.grant().is_err());

        phase.begin_check().unwrap();
        assert!(phase.grant().is_err());
        assert_eq!(phase, EntitlementPhase::Checking);
    }

    #[test]
    fn test_phase_grant_idempotent() {
        let mut phase = EntitlementPhase::Owned;
        assert!(!phase.grant().unwrap());
        assert!(!phase.grant().unwrap());
        assert_eq!(phase, EntitlementPhase::Owned);
    }

    #[test]
    fn test_cache_lazy_and_sticky() {
        let mut cache = EntitlementCache::new();
        let id = ProductId::from("noad");

        assert!(!cache.get_or_derive(&id, || false));

        // Derivation does not run again once cached.
        assert!(!cache.get_or_derive(&id, || true));

        assert!(cache.mark_owned(&id));
        assert!(!cache.mark_owned(&id));
        assert!(cache.get_or_derive(&id, || false));
    }

    #[derive(Debug, Clone)]
    enum Op {
        BeginCheck,
        Resolve(bool),
        Grant,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::BeginCheck),
            any::<bool>().prop_map(Op::Resolve),
            Just(Op::Grant),
        ]
    }

    proptest! {
        #[test]
        fn test_owned_is_terminal(ops in prop::collection::vec(op(), 0..32)) {
            let mut phase = EntitlementPhase::default();
            let mut checks = 0;
            let mut seen_owned = false;

            for op in ops {
                let before = phase;
                let result = match op {
                    Op::BeginCheck => phase.begin_check().map(|_| ()),
                    Op::Resolve(owned) => phase.resolve(owned),
                    Op::Grant => phase.grant().map(|_| ()),
                };
                if result.is_err() {
                    prop_assert_eq!(phase, before);
                }
                if phase == EntitlementPhase::Checking && before != EntitlementPhase::Checking {
                    checks += 1;
                }
                if seen_owned {
                    prop_assert_eq!(phase, EntitlementPhase::Owned);
                }
                seen_owned |= phase.is_owned();
            }

            prop_assert!(checks <= 1);
        }
    }
}
