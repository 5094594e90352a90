use std::collections::BTreeMap;

use crate::ability::{AbilityKey, SpawnDescriptor};

/// Resolves ability identifiers to spawn descriptors.
///
/// Asset loading is not the simulation's concern; a failed lookup aborts the
/// cast before anything is created.
pub trait AbilityFactory: Send + Sync {
    fn resolve(&self, key: &AbilityKey) -> Option<SpawnDescriptor>;
}

impl AbilityFactory for BTreeMap<AbilityKey, SpawnDescriptor> {
    fn resolve(&self, key: &AbilityKey) -> Option<SpawnDescriptor> {
        self.get(key).cloned()
    }
}
