//! Open-session lookup cache using Moka.
//!
//! Maps `(tenant, operator)` to the operator's current open session so
//! that the order/payment path does not list open sessions on every
//! posting. Entries are hints: callers re-check the session before use.

use std::time::Duration;

use caixa_shared::CashRegisterConfig;
use caixa_shared::types::{CashSessionId, TenantId, UserId};
use moka::sync::Cache;

/// Default cache capacity (number of operators).
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Bounded TTL cache of open session IDs keyed by operator.
#[derive(Clone)]
pub struct OpenSessionCache {
    cache: Cache<(TenantId, UserId), CashSessionId>,
}

impl OpenSessionCache {
    /// Creates a cache with default settings.
    ///
    /// Default: 1000 entries max, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom capacity and TTL.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Creates a cache sized from the cash register configuration.
    #[must_use]
    pub fn from_config(config: &CashRegisterConfig) -> Self {
        Self::with_config(config.session_cache_capacity, config.session_cache_ttl_secs)
    }

    /// Returns the cached open session for an operator, if any.
    #[must_use]
    pub fn get(&self, tenant_id: TenantId, operator_id: UserId) -> Option<CashSessionId> {
        self.cache.get(&(tenant_id, operator_id))
    }

    /// Remembers `session_id` as the operator's open session.
    pub fn insert(&self, tenant_id: TenantId, operator_id: UserId, session_id: CashSessionId) {
        self.cache.insert((tenant_id, operator_id), session_id);
    }

    /// Forgets the operator's entry if it still points at `session_id`.
    pub fn invalidate_session(
        &self,
        tenant_id: TenantId,
        operator_id: UserId,
        session_id: CashSessionId,
    ) {
        let key = (tenant_id, operator_id);
        if self.cache.get(&key) == Some(session_id) {
            self.cache.invalidate(&key);
        }
    }
}

impl Default for OpenSessionCache {
    fn default() -> Self {
        Self::new()
    }
}
