//! Request-scoped context for expense checks.
//!
//! A context is built once per request and dropped with it. Its collective
//! cache must never outlive or be shared across requests.

use std::sync::Arc;

use hostfund_shared::types::CollectiveId;
use moka::sync::Cache;

use crate::expense::error::{ExpenseError, ExpenseResult};
use crate::expense::feature::{ConfiguredFeatureGate, Feature, FeatureGate};
use crate::expense::store::ExpenseStore;
use crate::expense::types::Collective;
use crate::expense::user::RemoteUser;

/// Upper bound on collectives memoized within one request.
const COLLECTIVE_CACHE_CAPACITY: u64 = 64;

/// Everything a permission check or action needs about the current request.
pub struct RequestContext<'a, S, G = ConfiguredFeatureGate> {
    remote_user: Option<RemoteUser>,
    store: &'a S,
    features: &'a G,
    collectives: Cache<CollectiveId, Option<Arc<Collective>>>,
}

impl<'a, S: ExpenseStore, G: FeatureGate> RequestContext<'a, S, G> {
    /// Creates a context for one request.
    #[must_use]
    pub fn new(remote_user: Option<RemoteUser>, store: &'a S, features: &'a G) -> Self {
        Self {
            remote_user,
            store,
            features,
            collectives: Cache::new(COLLECTIVE_CACHE_CAPACITY),
        }
    }

    /// The authenticated user, if any.
    #[must_use]
    pub const fn remote_user(&self) -> Option<&RemoteUser> {
        self.remote_user.as_ref()
    }

    /// The authenticated user, or `Unauthenticated`.
    pub fn require_user(&self) -> ExpenseResult<&RemoteUser> {
        self.remote_user.as_ref().ok_or(ExpenseError::Unauthenticated)
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &'a S {
        self.store
    }

    /// True if the requester is authenticated and may use `feature`.
    #[must_use]
    pub fn can_use_feature(&self, feature: Feature) -> bool {
        self.remote_user
            .as_ref()
            .is_some_and(|user| self.features.can_use_feature(user, feature))
    }

    /// Loads a collective, memoized for the lifetime of this context.
    ///
    /// Absent collectives are memoized as well.
    pub async fn collective(&self, id: CollectiveId) -> ExpenseResult<Option<Arc<Collective>>> {
        if let Some(cached) = self.collectives.get(&id) {
            return Ok(cached);
        }

        let loaded = self.store.find_collective(id).await?.map(Arc::new);
        self.collectives.insert(id, loaded.clone());
        Ok(loaded)
    }
}
