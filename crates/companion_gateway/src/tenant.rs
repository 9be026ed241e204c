//! Tenant key verification is a boundary concern: the gateway never owns
//! tenant provisioning, only the lookup used to authenticate a request.

use async_trait::async_trait;
use companion_core::model::TenantContext;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantLookupError {
    NotFound,
    Inactive,
}

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn lookup(&self, api_key: &str) -> Result<TenantContext, TenantLookupError>;
}

struct Entry {
    context: TenantContext,
    active: bool,
}

/// In-process directory seeded at startup. A production deployment would
/// back this with the external tenant/billing service instead.
#[derive(Default)]
pub struct InMemoryTenantDirectory {
    by_key: RwLock<HashMap<String, Entry>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, api_key: impl Into<String>, context: TenantContext, active: bool) {
        self.by_key.write().expect("tenant directory lock poisoned").insert(api_key.into(), Entry { context, active });
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn lookup(&self, api_key: &str) -> Result<TenantContext, TenantLookupError> {
        let guard = self.by_key.read().expect("tenant directory lock poisoned");
        let entry = guard.get(api_key).ok_or(TenantLookupError::NotFound)?;
        if !entry.active {
            return Err(TenantLookupError::Inactive);
        }
        Ok(entry.context.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_core::model::TenantTier;

    fn ctx() -> TenantContext {
        TenantContext {
            tenant_id: "t1".into(),
            tier: TenantTier::Standard,
            daily_budget_usd: 10.0,
            force_generative_off: false,
            language_whitelist: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let dir = InMemoryTenantDirectory::new();
        assert_eq!(dir.lookup("nope").await.unwrap_err(), TenantLookupError::NotFound);
    }

    #[tokio::test]
    async fn inactive_tenant_is_rejected() {
        let dir = InMemoryTenantDirectory::new();
        dir.insert("key1", ctx(), false);
        assert_eq!(dir.lookup("key1").await.unwrap_err(), TenantLookupError::Inactive);
    }

    #[tokio::test]
    async fn active_tenant_resolves() {
        let dir = InMemoryTenantDirectory::new();
        dir.insert("key1", ctx(), true);
        let resolved = dir.lookup("key1").await.unwrap();
        assert_eq!(resolved.tenant_id, "t1");
    }
}
