use super::{FeatureFlags, FlagKey, FlagStore};
use crate::error::FlagStoreResult;
use tokio::sync::RwLock;

/// Process-local flag store. Used when no external settings table is configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryFlagStore {
    flags: RwLock<FeatureFlags>,
}

impl InMemoryFlagStore {
    pub fn new(flags: FeatureFlags) -> Self {
        Self {
            flags: RwLock::new(flags),
        }
    }
}

#[async_trait::async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn snapshot(&self) -> FlagStoreResult<FeatureFlags> {
        Ok(*self.flags.read().await)
    }

    async fn update(
        &self,
        key: FlagKey,
        value: serde_json::Value,
    ) -> FlagStoreResult<FeatureFlags> {
        let mut guard = self.flags.write().await;
        let mut next = *guard;
        next.apply(key, &value)?;
        *guard = next;
        Ok(next)
    }
}
