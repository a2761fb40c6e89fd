/*
 * loader.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Isolation boundary and constructor-cached type loading.
 */

//! Type loading inside an isolation boundary.
//!
//! A [`LoadContext`] is a loading context with its own unit-resolution
//! scope, independently disposable from the host process: compiled units
//! are loaded into it, lookups resolve against it, and [`unload`] tears it
//! down (best effort: future lookups fail, nothing is rewound
//! mid-process).
//!
//! The [`TypeLoader`] bridges compiled types to runnable instances. It is
//! bound to exactly one context and one fixed set of support libraries,
//! registers a single resolution-fallback hook with the context (exact
//! name match over its library set, first match wins), and caches one
//! zero-argument constructor delegate per compiled type. Constructor
//! builds are lazy and may race: concurrent first requests for the same
//! type can each build a delegate, which is wasted but harmless work;
//! delegates are pure and interchangeable, and the last write wins in the
//! cache.
//!
//! [`unload`]: LoadContext::unload

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{Result, StencilError};
use crate::template::Template;
use crate::unit::{ImportMap, TemplateType, TemplateUnit};

/// A resolution-fallback hook consulted when a context cannot resolve a
/// unit by name.
pub type ResolveHook = Arc<dyn Fn(&str) -> Option<Arc<TemplateUnit>> + Send + Sync>;

/// Handle to a registered fallback hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FallbackId(u64);

/// A cached zero-argument constructor for a compiled type.
pub type Constructor = Arc<dyn Fn() -> Result<Box<dyn Template>> + Send + Sync>;

/// An isolation boundary: a loading context with its own resolution
/// policy, independently disposable.
pub trait LoadContext: Send + Sync {
    /// Resolve a unit by exact name; `None` when nothing in the context
    /// or its fallback hooks knows the name.
    fn resolve(&self, name: &str) -> Option<Arc<TemplateUnit>>;

    /// Load a unit into the context, replacing any previous unit of the
    /// same name. Fails after [`unload`](Self::unload).
    fn load(&self, unit: Arc<TemplateUnit>) -> Result<()>;

    /// Register a fallback hook, consulted in registration order after
    /// the context's own units.
    fn register_fallback(&self, hook: ResolveHook) -> FallbackId;

    /// Remove a fallback hook. Returns whether it was still registered.
    fn unregister_fallback(&self, id: FallbackId) -> bool;

    /// Tear the context down: future lookups and loads fail. Best
    /// effort and irreversible.
    fn unload(&self);

    /// Whether the context has been unloaded.
    fn is_unloaded(&self) -> bool;
}

/// Single-process [`LoadContext`] implementation.
///
/// True runtime isolation is not available in-process; this context
/// simulates the boundary with its own unit table and resolution policy,
/// which is all the pipeline relies on.
pub struct IsolatedLoadContext {
    name: String,
    units: RwLock<HashMap<String, Arc<TemplateUnit>>>,
    fallbacks: RwLock<Vec<(FallbackId, ResolveHook)>>,
    next_fallback: AtomicU64,
    unloaded: AtomicBool,
}

impl IsolatedLoadContext {
    /// Create an empty context.
    pub fn new(name: impl Into<String>) -> Self {
        IsolatedLoadContext {
            name: name.into(),
            units: RwLock::new(HashMap::new()),
            fallbacks: RwLock::new(Vec::new()),
            next_fallback: AtomicU64::new(1),
            unloaded: AtomicBool::new(false),
        }
    }

    /// The context name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LoadContext for IsolatedLoadContext {
    fn resolve(&self, name: &str) -> Option<Arc<TemplateUnit>> {
        if self.is_unloaded() {
            return None;
        }

        {
            let units = self.units.read().expect("unit table poisoned");
            if let Some(unit) = units.get(name) {
                return Some(Arc::clone(unit));
            }
        }

        let fallbacks = self.fallbacks.read().expect("fallback table poisoned");
        fallbacks.iter().find_map(|(_, hook)| hook(name))
    }

    fn load(&self, unit: Arc<TemplateUnit>) -> Result<()> {
        if self.is_unloaded() {
            return Err(StencilError::ContextUnloaded);
        }
        tracing::debug!(context = %self.name, unit = unit.name(), "loading unit");
        let mut units = self.units.write().expect("unit table poisoned");
        units.insert(unit.name().to_string(), unit);
        Ok(())
    }

    fn register_fallback(&self, hook: ResolveHook) -> FallbackId {
        let id = FallbackId(self.next_fallback.fetch_add(1, Ordering::Relaxed));
        let mut fallbacks = self.fallbacks.write().expect("fallback table poisoned");
        fallbacks.push((id, hook));
        id
    }

    fn unregister_fallback(&self, id: FallbackId) -> bool {
        let mut fallbacks = self.fallbacks.write().expect("fallback table poisoned");
        let before = fallbacks.len();
        fallbacks.retain(|(fid, _)| *fid != id);
        fallbacks.len() != before
    }

    fn unload(&self) {
        if self.unloaded.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(context = %self.name, "unloading context");
        self.units.write().expect("unit table poisoned").clear();
    }

    fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }
}

/// Bridges compiled types to runnable instances, with constructor caching
/// and resolution fallback over a fixed library set.
pub struct TypeLoader {
    context: Arc<dyn LoadContext>,
    libraries: Vec<Arc<TemplateUnit>>,
    constructors: RwLock<HashMap<u64, Constructor>>,
    fallback: Mutex<Option<FallbackId>>,
    disposed: AtomicBool,
}

impl TypeLoader {
    /// Bind a loader to a context and its support-library set, and
    /// register the resolution fallback with the context.
    pub fn new(context: Arc<dyn LoadContext>, libraries: Vec<Arc<TemplateUnit>>) -> Self {
        let lib_set = libraries.clone();
        let hook: ResolveHook =
            Arc::new(move |name| lib_set.iter().find(|u| u.name() == name).cloned());
        let fallback = context.register_fallback(hook);

        TypeLoader {
            context,
            libraries,
            constructors: RwLock::new(HashMap::new()),
            fallback: Mutex::new(Some(fallback)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Create an instance of the compiled type.
    ///
    /// Uses the cached constructor delegate when one exists; otherwise
    /// builds it first (resolving the type's imports through the load
    /// context). Fails after disposal, on unresolvable imports, and for
    /// types with no parameterless constructor.
    pub fn create_instance(&self, ty: &TemplateType) -> Result<Box<dyn Template>> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(StencilError::Disposed {
                component: "TypeLoader",
            });
        }

        let constructor = self.get_constructor(ty)?;
        constructor()
    }

    /// The support libraries this loader was bound to.
    pub fn libraries(&self) -> &[Arc<TemplateUnit>] {
        &self.libraries
    }

    /// Number of cached constructor delegates.
    pub fn cached_constructor_count(&self) -> usize {
        self.constructors
            .read()
            .expect("constructor cache poisoned")
            .len()
    }

    /// Release the loader: unregister the resolution fallback from the
    /// context exactly once and drop the constructor cache. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.fallback.lock().expect("fallback slot poisoned").take() {
            self.context.unregister_fallback(id);
        }
        self.constructors
            .write()
            .expect("constructor cache poisoned")
            .clear();
        tracing::debug!("type loader disposed");
    }

    fn get_constructor(&self, ty: &TemplateType) -> Result<Constructor> {
        {
            let cache = self.constructors.read().expect("constructor cache poisoned");
            if let Some(constructor) = cache.get(&ty.id()) {
                return Ok(Arc::clone(constructor));
            }
        }

        // Built outside any lock: concurrent first requests may each get
        // here, and the last insert wins. Delegates are pure, so every
        // built delegate is interchangeable.
        let constructor = self.build_constructor(ty)?;

        let mut cache = self.constructors.write().expect("constructor cache poisoned");
        cache.insert(ty.id(), Arc::clone(&constructor));
        Ok(constructor)
    }

    fn build_constructor(&self, ty: &TemplateType) -> Result<Constructor> {
        // The defining unit is authoritative: it must be resolvable
        // through the context (or this loader's fallback libraries), so
        // an unloaded boundary cuts off construction of anything not
        // already cached.
        let unit = self.context.resolve(ty.unit_name()).ok_or_else(|| {
            StencilError::ResolutionFailed {
                name: ty.unit_name().to_string(),
            }
        })?;
        let defined = unit.type_named(ty.name()).ok_or_else(|| {
            StencilError::ResolutionFailed {
                name: format!("{}::{}", ty.unit_name(), ty.name()),
            }
        })?;

        let mut imports = ImportMap::new();
        for name in defined.imports() {
            let resolved = self
                .context
                .resolve(name)
                .ok_or_else(|| StencilError::ResolutionFailed { name: name.clone() })?;
            imports.insert(name.clone(), resolved);
        }

        let factory = defined
            .factory()
            .cloned()
            .ok_or_else(|| StencilError::MissingConstructor {
                type_name: defined.name().to_string(),
            })?;

        tracing::debug!(type_name = ty.name(), "built constructor delegate");
        Ok(Arc::new(move || factory.instantiate(&imports)))
    }
}

impl Drop for TypeLoader {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ExecuteContext, Template};
    use crate::unit::InstanceFactory;
    use crate::value::{TemplateValue, ViewBag};

    struct FixedTemplate {
        output: String,
    }

    impl Template for FixedTemplate {
        fn set_data(&mut self, _model: TemplateValue, _view_bag: ViewBag) {}

        fn run(&mut self, _context: &mut ExecuteContext) -> Result<String> {
            Ok(self.output.clone())
        }
    }

    struct FixedFactory {
        output: String,
    }

    impl InstanceFactory for FixedFactory {
        fn instantiate(&self, imports: &ImportMap) -> Result<Box<dyn Template>> {
            // Touch the imports so resolution failures would surface.
            let _ = imports;
            Ok(Box::new(FixedTemplate {
                output: self.output.clone(),
            }))
        }
    }

    fn constructible_type(name: &str, imports: Vec<String>) -> TemplateType {
        TemplateType::new(name, format!("generated.{name}"))
            .with_imports(imports)
            .with_factory(Arc::new(FixedFactory {
                output: format!("<{name}>"),
            }))
    }

    /// Wrap a type in its defining unit and load it into the context.
    fn load_type(context: &IsolatedLoadContext, ty: &TemplateType) {
        let unit = TemplateUnit::new(ty.unit_name()).with_type(ty.clone());
        context.load(Arc::new(unit)).unwrap();
    }

    #[test]
    fn test_context_resolution_prefers_loaded_units_over_fallbacks() {
        let context = IsolatedLoadContext::new("test");
        let loaded = Arc::new(TemplateUnit::new("shared"));
        context.load(Arc::clone(&loaded)).unwrap();

        let shadow = Arc::new(TemplateUnit::new("shared"));
        let hook_unit = Arc::clone(&shadow);
        context.register_fallback(Arc::new(move |name| {
            (name == "shared").then(|| Arc::clone(&hook_unit))
        }));

        let resolved = context.resolve("shared").unwrap();
        assert!(Arc::ptr_eq(&resolved, &loaded));
    }

    #[test]
    fn test_unloaded_context_fails_lookups_and_loads() {
        let context = IsolatedLoadContext::new("test");
        context.load(Arc::new(TemplateUnit::new("unit"))).unwrap();

        context.unload();
        context.unload(); // idempotent

        assert!(context.is_unloaded());
        assert!(context.resolve("unit").is_none());
        assert!(matches!(
            context.load(Arc::new(TemplateUnit::new("late"))),
            Err(StencilError::ContextUnloaded)
        ));
    }

    #[test]
    fn test_create_instance_caches_one_constructor() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let ty = constructible_type("page", Vec::new());
        load_type(&context, &ty);
        let loader = TypeLoader::new(context, Vec::new());

        let mut first = loader.create_instance(&ty).unwrap();
        let mut second = loader.create_instance(&ty).unwrap();
        let mut ctx = ExecuteContext::new();
        assert_eq!(first.run(&mut ctx).unwrap(), "<page>");
        assert_eq!(second.run(&mut ctx).unwrap(), "<page>");
        assert_eq!(loader.cached_constructor_count(), 1);
    }

    #[test]
    fn test_imports_resolve_through_fallback_libraries() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let library = Arc::new(TemplateUnit::new("stencil.text"));
        let ty = constructible_type("page", vec!["stencil.text".to_string()]);
        load_type(&context, &ty);
        let missing = constructible_type("broken", vec!["stencil.missing".to_string()]);
        load_type(&context, &missing);
        let loader = TypeLoader::new(Arc::clone(&context) as Arc<dyn LoadContext>, vec![library]);

        assert!(loader.create_instance(&ty).is_ok());

        match loader.create_instance(&missing).unwrap_err() {
            StencilError::ResolutionFailed { name } => assert_eq!(name, "stencil.missing"),
            other => panic!("expected ResolutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolvable_unit_is_an_error() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let loader = TypeLoader::new(context, Vec::new());
        let ty = constructible_type("orphan", Vec::new());

        match loader.create_instance(&ty).unwrap_err() {
            StencilError::ResolutionFailed { name } => assert_eq!(name, "generated.orphan"),
            other => panic!("expected ResolutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_constructor_is_an_error() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let ty = TemplateType::new("abstract", "generated.abstract");
        load_type(&context, &ty);
        let loader = TypeLoader::new(context, Vec::new());

        match loader.create_instance(&ty).unwrap_err() {
            StencilError::MissingConstructor { type_name } => assert_eq!(type_name, "abstract"),
            other => panic!("expected MissingConstructor, got {other:?}"),
        }
    }

    #[test]
    fn test_unload_cuts_off_uncached_construction() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let cached = constructible_type("cached", Vec::new());
        load_type(&context, &cached);
        let fresh = constructible_type("fresh", Vec::new());
        load_type(&context, &fresh);
        let loader = TypeLoader::new(Arc::clone(&context) as Arc<dyn LoadContext>, Vec::new());

        assert!(loader.create_instance(&cached).is_ok());
        context.unload();

        // The cached delegate survives; building a new one cannot.
        assert!(loader.create_instance(&cached).is_ok());
        assert!(matches!(
            loader.create_instance(&fresh),
            Err(StencilError::ResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_dispose_is_idempotent_and_unregisters_fallback() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        let library = Arc::new(TemplateUnit::new("stencil.text"));
        let loader = TypeLoader::new(
            Arc::clone(&context) as Arc<dyn LoadContext>,
            vec![Arc::clone(&library)],
        );

        // While the loader lives, the context resolves through its hook.
        assert!(context.resolve("stencil.text").is_some());

        loader.dispose();
        loader.dispose(); // no-op, must not panic

        assert!(context.resolve("stencil.text").is_none());

        let ty = constructible_type("page", Vec::new());
        assert!(matches!(
            loader.create_instance(&ty),
            Err(StencilError::Disposed { .. })
        ));
    }

    #[test]
    fn test_drop_unregisters_fallback() {
        let context = Arc::new(IsolatedLoadContext::new("test"));
        {
            let library = Arc::new(TemplateUnit::new("stencil.text"));
            let _loader =
                TypeLoader::new(Arc::clone(&context) as Arc<dyn LoadContext>, vec![library]);
            assert!(context.resolve("stencil.text").is_some());
        }
        assert!(context.resolve("stencil.text").is_none());
    }
}
