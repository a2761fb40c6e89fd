/*
 * template.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Template execution surface and template-source management.
 */

//! The contracts a runnable template satisfies and the seams through which
//! template source text is obtained.
//!
//! A compiled template is handed to callers as a `Box<dyn Template>`:
//! feed it data with [`Template::set_data`], then [`Template::run`] it.
//! Output is produced through a [`TemplateBase`], the write surface the
//! compiled program drives; the configured base-template type decides the
//! concrete implementation (by default [`DefaultTemplateBase`], which
//! buffers output and encodes dynamic values through the configured
//! [`TextEncoding`](crate::encoding::TextEncoding)).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::encoding::TextEncoding;
use crate::error::{Result, StencilError};
use crate::key::{ResolveType, TemplateKey};
use crate::value::{TemplateValue, ViewBag};

/// The source text of a template, plus an optional file for debugging.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
    template_file: Option<PathBuf>,
}

impl TemplateSource {
    /// Create a source from in-memory text.
    pub fn new(template: impl Into<String>) -> Self {
        TemplateSource {
            template: template.into(),
            template_file: None,
        }
    }

    /// Create a source backed by a file on disk.
    pub fn with_file(template: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        TemplateSource {
            template: template.into(),
            template_file: Some(file.into()),
        }
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.template
    }

    /// The backing file, when the template was loaded from disk.
    pub fn file(&self) -> Option<&PathBuf> {
        self.template_file.as_ref()
    }
}

/// Per-run execution state passed to [`Template::run`].
///
/// Carries the view bag visible to the running template in addition to
/// whatever the instance received through `set_data`; lookups consult the
/// instance bag first and fall back to this one.
#[derive(Debug, Default)]
pub struct ExecuteContext {
    view_bag: ViewBag,
}

impl ExecuteContext {
    /// Create an empty execution context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context carrying the given view bag.
    pub fn with_view_bag(view_bag: ViewBag) -> Self {
        ExecuteContext { view_bag }
    }

    /// The context-level view bag.
    pub fn view_bag(&self) -> &ViewBag {
        &self.view_bag
    }

    /// Mutable access to the context-level view bag.
    pub fn view_bag_mut(&mut self) -> &mut ViewBag {
        &mut self.view_bag
    }
}

/// The write surface a compiled template drives.
///
/// `write_literal` is for markup that is part of the template itself and
/// bypasses encoding; `write` is for dynamic values and encodes.
pub trait TemplateBase: Send {
    /// Write literal template text, unencoded.
    fn write_literal(&mut self, literal: &str);

    /// Write a dynamic value, encoded.
    fn write(&mut self, value: &TemplateValue);

    /// Take the accumulated output, leaving the buffer empty.
    fn result(&mut self) -> String;
}

/// Factory producing fresh [`TemplateBase`] instances, one per run.
pub type TemplateBaseFactory = Arc<dyn Fn() -> Box<dyn TemplateBase> + Send + Sync>;

/// Default base: buffers output, encodes values with a [`TextEncoding`].
pub struct DefaultTemplateBase {
    buffer: String,
    encoding: Arc<dyn TextEncoding>,
}

impl DefaultTemplateBase {
    /// Create a base writing through the given encoding.
    pub fn new(encoding: Arc<dyn TextEncoding>) -> Self {
        DefaultTemplateBase {
            buffer: String::new(),
            encoding,
        }
    }
}

impl TemplateBase for DefaultTemplateBase {
    fn write_literal(&mut self, literal: &str) {
        self.buffer.push_str(literal);
    }

    fn write(&mut self, value: &TemplateValue) {
        self.buffer.push_str(&self.encoding.encode(&value.render()));
    }

    fn result(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// A runnable template instance.
pub trait Template: Send {
    /// Set the model and view bag for the next run.
    fn set_data(&mut self, model: TemplateValue, view_bag: ViewBag);

    /// Execute the template and return the rendered output.
    fn run(&mut self, context: &mut ExecuteContext) -> Result<String>;
}

impl std::fmt::Debug for dyn Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<template instance>")
    }
}

/// Source of template text: maps keys to sources and mints keys.
pub trait TemplateManager: Send + Sync {
    /// Resolve the source for a key. Fails with
    /// [`StencilError::TemplateNotFound`] when the key is unknown.
    fn resolve(&self, key: &TemplateKey) -> Result<TemplateSource>;

    /// Build the key for a template name in the given resolution context.
    fn get_key(
        &self,
        name: &str,
        resolve_type: ResolveType,
        context: Option<TemplateKey>,
    ) -> TemplateKey;

    /// Register a template source under a key at runtime.
    fn add_dynamic(&self, key: &TemplateKey, source: TemplateSource);
}

/// In-memory template manager keyed by unique key string.
///
/// Template names are assumed unique, so keys are name-only keys.
#[derive(Default)]
pub struct InMemoryTemplateManager {
    templates: RwLock<HashMap<String, TemplateSource>>,
}

impl InMemoryTemplateManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateManager for InMemoryTemplateManager {
    fn resolve(&self, key: &TemplateKey) -> Result<TemplateSource> {
        let templates = self.templates.read().expect("template store poisoned");
        templates
            .get(key.unique_key())
            .cloned()
            .ok_or_else(|| StencilError::TemplateNotFound {
                key: key.unique_key().to_string(),
            })
    }

    fn get_key(
        &self,
        name: &str,
        resolve_type: ResolveType,
        context: Option<TemplateKey>,
    ) -> TemplateKey {
        TemplateKey::name_only(name, resolve_type, context)
    }

    fn add_dynamic(&self, key: &TemplateKey, source: TemplateSource) {
        let mut templates = self.templates.write().expect("template store poisoned");
        templates.insert(key.unique_key().to_string(), source);
    }
}

/// Legacy single-method template lookup.
#[deprecated(note = "implement TemplateManager instead")]
pub trait TemplateResolver: Send + Sync {
    /// Look up template text by name.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Adapter presenting a legacy [`TemplateResolver`] as a
/// [`TemplateManager`]. Dynamic registrations are stored locally and
/// shadow the wrapped resolver.
#[allow(deprecated)]
pub struct ResolverAdapter {
    inner: Arc<dyn TemplateResolver>,
    dynamic: RwLock<HashMap<String, TemplateSource>>,
}

#[allow(deprecated)]
impl ResolverAdapter {
    /// Wrap a legacy resolver.
    pub fn new(inner: Arc<dyn TemplateResolver>) -> Self {
        ResolverAdapter {
            inner,
            dynamic: RwLock::new(HashMap::new()),
        }
    }
}

#[allow(deprecated)]
impl TemplateManager for ResolverAdapter {
    fn resolve(&self, key: &TemplateKey) -> Result<TemplateSource> {
        {
            let dynamic = self.dynamic.read().expect("dynamic store poisoned");
            if let Some(source) = dynamic.get(key.unique_key()) {
                return Ok(source.clone());
            }
        }
        self.inner
            .resolve(key.name())
            .map(TemplateSource::new)
            .ok_or_else(|| StencilError::TemplateNotFound {
                key: key.unique_key().to_string(),
            })
    }

    fn get_key(
        &self,
        name: &str,
        resolve_type: ResolveType,
        context: Option<TemplateKey>,
    ) -> TemplateKey {
        TemplateKey::name_only(name, resolve_type, context)
    }

    fn add_dynamic(&self, key: &TemplateKey, source: TemplateSource) {
        let mut dynamic = self.dynamic.write().expect("dynamic store poisoned");
        dynamic.insert(key.unique_key().to_string(), source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{HtmlTextEncoding, RawTextEncoding};

    #[test]
    fn test_default_base_encodes_writes_only() {
        let mut base = DefaultTemplateBase::new(Arc::new(HtmlTextEncoding));
        base.write_literal("<p>");
        base.write(&TemplateValue::from("a < b"));
        base.write_literal("</p>");
        assert_eq!(base.result(), "<p>a &lt; b</p>");
        // The buffer is drained by result().
        assert_eq!(base.result(), "");
    }

    #[test]
    fn test_default_base_raw_encoding() {
        let mut base = DefaultTemplateBase::new(Arc::new(RawTextEncoding));
        base.write(&TemplateValue::from("a < b"));
        assert_eq!(base.result(), "a < b");
    }

    #[test]
    fn test_in_memory_manager_roundtrip() {
        let manager = InMemoryTemplateManager::new();
        let key = manager.get_key("hello", ResolveType::Global, None);

        assert!(matches!(
            manager.resolve(&key),
            Err(StencilError::TemplateNotFound { .. })
        ));

        manager.add_dynamic(&key, TemplateSource::new("emit \"hi\";"));
        let source = manager.resolve(&key).unwrap();
        assert_eq!(source.source(), "emit \"hi\";");
    }

    #[allow(deprecated)]
    #[test]
    fn test_resolver_adapter_wraps_legacy_resolver() {
        struct FixedResolver;
        impl TemplateResolver for FixedResolver {
            fn resolve(&self, name: &str) -> Option<String> {
                (name == "legacy").then(|| "emit \"old\";".to_string())
            }
        }

        let manager = ResolverAdapter::new(Arc::new(FixedResolver));
        let key = manager.get_key("legacy", ResolveType::Global, None);
        assert_eq!(manager.resolve(&key).unwrap().source(), "emit \"old\";");

        let missing = manager.get_key("other", ResolveType::Global, None);
        assert!(manager.resolve(&missing).is_err());

        manager.add_dynamic(&missing, TemplateSource::new("emit \"new\";"));
        assert_eq!(manager.resolve(&missing).unwrap().source(), "emit \"new\";");
    }
}
