/*
 * caching.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Caching provider seam.
//!
//! The compile pipeline runs only on a cache miss; everything else is
//! served from whatever provider the configuration supplies. Providers
//! key entries by the template key's unique key string. Coalescing
//! concurrent compiles of the same key is a provider concern, not a core
//! one; the default provider does not deduplicate in-flight work.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::compiler::CompilationArtifact;
use crate::key::TemplateKey;

/// Stores compiled artifacts between pipeline invocations.
pub trait CachingProvider: Send + Sync {
    /// The cached artifact for a key, if any.
    fn get(&self, key: &TemplateKey) -> Option<Arc<CompilationArtifact>>;

    /// Cache an artifact under a key, replacing any previous entry.
    fn set(&self, key: &TemplateKey, artifact: Arc<CompilationArtifact>);

    /// Drop the entry for a key.
    fn remove(&self, key: &TemplateKey);

    /// Whether an artifact is cached for the key.
    fn is_cached(&self, key: &TemplateKey) -> bool;
}

/// Unbounded in-memory provider; entries live until removed or the
/// provider is dropped.
#[derive(Default)]
pub struct InMemoryCachingProvider {
    entries: RwLock<HashMap<String, Arc<CompilationArtifact>>>,
}

impl InMemoryCachingProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached artifacts.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CachingProvider for InMemoryCachingProvider {
    fn get(&self, key: &TemplateKey) -> Option<Arc<CompilationArtifact>> {
        let entries = self.entries.read().expect("cache poisoned");
        entries.get(key.unique_key()).cloned()
    }

    fn set(&self, key: &TemplateKey, artifact: Arc<CompilationArtifact>) {
        let mut entries = self.entries.write().expect("cache poisoned");
        entries.insert(key.unique_key().to_string(), artifact);
    }

    fn remove(&self, key: &TemplateKey) {
        let mut entries = self.entries.write().expect("cache poisoned");
        entries.remove(key.unique_key());
    }

    fn is_cached(&self, key: &TemplateKey) -> bool {
        let entries = self.entries.read().expect("cache poisoned");
        entries.contains_key(key.unique_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilationData;
    use crate::key::ResolveType;
    use crate::unit::{TemplateType, TemplateUnit};

    fn artifact(name: &str) -> Arc<CompilationArtifact> {
        let unit_name = format!("generated.{name}");
        let ty = TemplateType::new(name, unit_name.clone());
        let unit = Arc::new(TemplateUnit::new(unit_name).with_type(ty.clone()));
        Arc::new(CompilationArtifact::new(
            unit,
            ty,
            CompilationData::new("emit \"x\";", None),
            Vec::new(),
            false,
        ))
    }

    #[test]
    fn test_cache_roundtrip_keyed_by_unique_key() {
        let cache = InMemoryCachingProvider::new();
        let key = TemplateKey::name_only("hello", ResolveType::Global, None);
        assert!(!cache.is_cached(&key));
        assert!(cache.get(&key).is_none());

        cache.set(&key, artifact("hello"));
        assert!(cache.is_cached(&key));

        // An equal key (same unique key string) hits the same entry.
        let alias = TemplateKey::name_only("hello", ResolveType::Include, None);
        assert!(cache.get(&alias).is_some());

        cache.remove(&alias);
        assert!(!cache.is_cached(&key));
        assert!(cache.is_empty());
    }
}
