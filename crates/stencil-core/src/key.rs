/*
 * key.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Template identity model.
 */

//! Template keys.
//!
//! A [`TemplateKey`] identifies one template together with the context it
//! was requested in (a layout resolved from another template carries that
//! template's key as its parent). Keys are immutable and compare by their
//! unique key string, which is computed once at construction and stable
//! for the lifetime of the process. The caching provider uses the unique
//! key string as its cache key, so the equality law here is load-bearing:
//! `a == b ⇔ a.unique_key() == b.unique_key()`.

use std::fmt;
use std::hash::{Hash, Hasher};

/// How a template was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveType {
    /// Requested directly by the caller.
    Global,
    /// Requested as an include from another template.
    Include,
    /// Requested as the layout of another template.
    Layout,
}

impl fmt::Display for ResolveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveType::Global => write!(f, "global"),
            ResolveType::Include => write!(f, "include"),
            ResolveType::Layout => write!(f, "layout"),
        }
    }
}

/// Immutable identity of a template.
///
/// Two flavours exist: name-only keys (the template manager guarantees
/// names are unique, so the name itself is the unique key) and full-path
/// keys (templates loaded from disk, keyed by normalized path).
#[derive(Debug, Clone)]
pub struct TemplateKey {
    name: String,
    resolve_type: ResolveType,
    context: Option<Box<TemplateKey>>,
    unique_key: String,
}

impl TemplateKey {
    /// Create a key whose unique key string is the template name.
    pub fn name_only(
        name: impl Into<String>,
        resolve_type: ResolveType,
        context: Option<TemplateKey>,
    ) -> Self {
        let name = name.into();
        let unique_key = name.clone();
        TemplateKey {
            name,
            resolve_type,
            context: context.map(Box::new),
            unique_key,
        }
    }

    /// Create a key whose unique key string is the normalized full path.
    pub fn full_path(
        name: impl Into<String>,
        full_path: impl AsRef<str>,
        resolve_type: ResolveType,
        context: Option<TemplateKey>,
    ) -> Self {
        TemplateKey {
            name: name.into(),
            resolve_type,
            context: context.map(Box::new),
            unique_key: normalize_path(full_path.as_ref()),
        }
    }

    /// The logical template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How this template was requested.
    pub fn resolve_type(&self) -> ResolveType {
        self.resolve_type
    }

    /// The key of the template this one was requested from, if any.
    pub fn context(&self) -> Option<&TemplateKey> {
        self.context.as_deref()
    }

    /// The canonical string used for cache lookups and equality.
    ///
    /// Pure function of the key's fields; computed at construction.
    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }
}

impl PartialEq for TemplateKey {
    fn eq(&self, other: &Self) -> bool {
        self.unique_key == other.unique_key
    }
}

impl Eq for TemplateKey {}

impl Hash for TemplateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_key.hash(state);
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unique_key)
    }
}

/// Normalize a path for use as a unique key.
///
/// Trailing separators are stripped and, on case-insensitive platforms,
/// the path is lowercased so that two spellings of the same file compare
/// equal.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if cfg!(windows) {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(key: &TemplateKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_name_only_unique_key_is_name() {
        let key = TemplateKey::name_only("hello", ResolveType::Global, None);
        assert_eq!(key.unique_key(), "hello");
        assert_eq!(key.name(), "hello");
    }

    #[test]
    fn test_equality_follows_unique_key() {
        let a = TemplateKey::name_only("hello", ResolveType::Global, None);
        let parent = TemplateKey::name_only("page", ResolveType::Global, None);
        // Same name resolved as an include from a parent: same unique key,
        // therefore equal, even though resolve type and context differ.
        let b = TemplateKey::name_only("hello", ResolveType::Include, Some(parent));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = TemplateKey::name_only("other", ResolveType::Global, None);
        assert_ne!(a, c);
    }

    #[test]
    fn test_full_path_strips_trailing_separator() {
        let a = TemplateKey::full_path("t", "/srv/templates/t.stencil", ResolveType::Global, None);
        let b = TemplateKey::full_path("t", "/srv/templates/t.stencil/", ResolveType::Global, None);
        assert_eq!(a, b);
        assert_eq!(a.unique_key(), "/srv/templates/t.stencil");
    }

    #[test]
    fn test_context_chain() {
        let root = TemplateKey::name_only("page", ResolveType::Global, None);
        let layout = TemplateKey::name_only("layout", ResolveType::Layout, Some(root.clone()));
        assert_eq!(layout.context(), Some(&root));
        assert_eq!(layout.resolve_type(), ResolveType::Layout);
        assert!(root.context().is_none());
    }
}
