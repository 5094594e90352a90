//! Ability catalog: the [`AbilityFactory`] every peer casts from.

use std::collections::BTreeMap;

use arena_core::{AbilityFactory, AbilityKey, CombatError, SpawnDescriptor};

/// Spawn descriptors keyed by ability name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbilityCatalog {
    descriptors: BTreeMap<AbilityKey, SpawnDescriptor>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, returning the one it replaced.
    pub fn insert(&mut self, descriptor: SpawnDescriptor) -> Option<SpawnDescriptor> {
        self.descriptors.insert(descriptor.key.clone(), descriptor)
    }

    pub fn get(&self, key: &AbilityKey) -> Option<&SpawnDescriptor> {
        self.descriptors.get(key)
    }

    pub fn contains(&self, key: &AbilityKey) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AbilityKey> {
        self.descriptors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Reports every value that casting would clamp, for each rank the
    /// descriptor defines. An empty result means the data is clean.
    pub fn audit(&self, min_secs: f32) -> Vec<(AbilityKey, CombatError)> {
        let mut issues = Vec::new();
        for descriptor in self.descriptors.values() {
            let (_, cost_issues) = descriptor.costs();
            issues.extend(
                cost_issues
                    .into_iter()
                    .map(|issue| (descriptor.key.clone(), issue)),
            );
            let ranks = u8::try_from(descriptor.ranks.len().max(1)).unwrap_or(u8::MAX);
            for rank in 1..=ranks {
                let mut config = descriptor.configure(rank, 0.0);
                issues.extend(
                    config
                        .sanitize(min_secs)
                        .into_iter()
                        .map(|issue| (descriptor.key.clone(), issue)),
                );
            }
        }
        issues
    }
}

impl FromIterator<SpawnDescriptor> for AbilityCatalog {
    fn from_iter<I: IntoIterator<Item = SpawnDescriptor>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for descriptor in iter {
            catalog.insert(descriptor);
        }
        catalog
    }
}

impl AbilityFactory for AbilityCatalog {
    fn resolve(&self, key: &AbilityKey) -> Option<SpawnDescriptor> {
        self.descriptors.get(key).cloned()
    }
}
