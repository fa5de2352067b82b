use std::sync::Arc;

use parking_lot::RwLock;

use crate::schema::{PolicyConfig, PolicyUpdate};

/// Source of the policy the engine reads at the start of every decision.
///
/// Implementations swap whole snapshots; a reader holding an `Arc` never sees
/// a half-applied update.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> Arc<PolicyConfig>;
}

/// In-memory provider. Updates are applied to a copy and swapped in.
#[derive(Debug, Default)]
pub struct StaticConfig {
    current: RwLock<Arc<PolicyConfig>>,
}

impl StaticConfig {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Replace the policy wholesale.
    pub fn replace(&self, config: PolicyConfig) {
        *self.current.write() = Arc::new(config);
    }

    /// Merge `update` over the current policy and swap the result in.
    pub fn update(&self, update: &PolicyUpdate) -> Arc<PolicyConfig> {
        let mut guard = self.current.write();
        let next = Arc::new(guard.apply(update));
        *guard = Arc::clone(&next);
        next
    }

    pub fn reset(&self) {
        self.replace(PolicyConfig::default());
    }
}

impl ConfigProvider for StaticConfig {
    fn snapshot(&self) -> Arc<PolicyConfig> {
        self.current.read().clone()
    }
}
