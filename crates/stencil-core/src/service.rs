/*
 * service.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * The compile / cache / instantiate pipeline.
 */

//! The template service.
//!
//! [`TemplateService`] owns one complete pipeline: a validated
//! [`ConfigurationSnapshot`], a [`CompilerRegistry`], an isolation
//! boundary with its [`TypeLoader`], and the caching provider wiring
//! between them. Running a template walks the stages in order:
//!
//! 1. cache lookup by [`TemplateKey`] (hit skips straight to step 4),
//! 2. source resolution through the template manager,
//! 3. compilation through the registry's active backend, loading the
//!    produced unit into the boundary and caching the artifact,
//! 4. activation of a fresh instance,
//! 5. execution with the caller's model and view bag.
//!
//! Services are cheap to share behind an `Arc` and safe to drive from
//! many threads; concurrent compiles of the same key are not coalesced
//! (the last artifact cached wins, and every produced artifact is
//! equivalent).

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::activation::InstanceContext;
use crate::compiler::{CompilationArtifact, CompileContext, CompilerServiceFactory};
use crate::config::{ConfigurationSnapshot, TemplateServiceConfiguration};
use crate::error::{Result, StencilError};
use crate::key::{ResolveType, TemplateKey};
use crate::loader::{IsolatedLoadContext, LoadContext, TypeLoader};
use crate::registry::CompilerRegistry;
use crate::template::{ExecuteContext, Template, TemplateSource};
use crate::value::{TemplateValue, ViewBag};

/// One compile/cache/instantiate pipeline.
pub struct TemplateService {
    config: ConfigurationSnapshot,
    registry: CompilerRegistry,
    context: Arc<IsolatedLoadContext>,
    loader: TypeLoader,
    disposed: AtomicBool,
}

impl TemplateService {
    /// Build a service from a configuration.
    ///
    /// The configuration is snapshotted (validated and frozen) here;
    /// later mutation of the passed-in object has no effect on the
    /// service. A probe backend is created once to collect the support
    /// libraries the type loader falls back to.
    pub fn new(configuration: &TemplateServiceConfiguration) -> Result<Self> {
        let config = ConfigurationSnapshot::new(configuration)?;

        let registry = CompilerRegistry::with_default_language(
            Arc::clone(config.compiler_service_factory()),
            config.language(),
        );
        let libraries = registry.get_default_service()?.support_libraries();

        let context = Arc::new(IsolatedLoadContext::new("stencil-service"));
        let loader = TypeLoader::new(
            Arc::clone(&context) as Arc<dyn LoadContext>,
            libraries,
        );

        tracing::debug!(language = %config.language(), "template service created");
        Ok(TemplateService {
            config,
            registry,
            context,
            loader,
            disposed: AtomicBool::new(false),
        })
    }

    /// The frozen configuration this service runs with.
    pub fn configuration(&self) -> &ConfigurationSnapshot {
        &self.config
    }

    /// Build the key for a template name requested directly.
    ///
    /// Delegates to the configured template manager, which owns the key
    /// flavour (name-only or path-based).
    pub fn get_key(&self, name: &str, resolve_type: ResolveType) -> Result<TemplateKey> {
        if name.trim().is_empty() {
            return Err(StencilError::invalid_argument(
                "name",
                "template name must not be empty",
            ));
        }
        Ok(self.config.template_manager().get_key(name, resolve_type, None))
    }

    /// Register template source under a key at runtime.
    pub fn add_template(&self, key: &TemplateKey, source: TemplateSource) -> Result<()> {
        self.ensure_live()?;
        self.config.template_manager().add_dynamic(key, source);
        Ok(())
    }

    /// Whether a compiled artifact is cached for the key.
    pub fn is_template_cached(&self, key: &TemplateKey) -> bool {
        self.config.caching_provider().is_cached(key)
    }

    /// Swap the compiler backend strategy for subsequent compiles.
    pub fn set_compiler_service_factory(&self, factory: Arc<dyn CompilerServiceFactory>) {
        self.registry.set_factory(factory);
    }

    /// Compile the template behind `key` and cache the artifact,
    /// replacing any previous entry.
    pub fn compile(&self, key: &TemplateKey) -> Result<Arc<CompilationArtifact>> {
        self.ensure_live()?;
        let source = self.config.template_manager().resolve(key)?;
        self.compile_source(key, &source)
    }

    /// Run the template behind `key` with the given model and view bag,
    /// compiling it first when no cached artifact exists.
    pub fn run(
        &self,
        key: &TemplateKey,
        model: TemplateValue,
        view_bag: ViewBag,
    ) -> Result<String> {
        self.ensure_live()?;
        let artifact = match self.config.caching_provider().get(key) {
            Some(artifact) => artifact,
            None => self.compile(key)?,
        };
        self.execute(&artifact, model, view_bag)
    }

    /// Compile and run in-memory source under an anonymous key.
    ///
    /// The key is derived from the source text, so running identical
    /// source twice reuses the cached artifact.
    pub fn run_source(
        &self,
        source: &TemplateSource,
        model: TemplateValue,
        view_bag: ViewBag,
    ) -> Result<String> {
        self.ensure_live()?;
        let key = anonymous_key(source);
        let artifact = match self.config.caching_provider().get(&key) {
            Some(artifact) => artifact,
            None => self.compile_source(&key, source)?,
        };
        self.execute(&artifact, model, view_bag)
    }

    /// Release the pipeline: dispose the type loader and unload the
    /// isolation boundary. Idempotent; every later operation fails with
    /// [`StencilError::Disposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.loader.dispose();
        self.context.unload();
        tracing::info!("template service disposed");
    }

    fn compile_source(
        &self,
        key: &TemplateKey,
        source: &TemplateSource,
    ) -> Result<Arc<CompilationArtifact>> {
        let mut service = self.registry.get_default_service()?;
        service.set_debug(self.config.debug());
        service.set_disable_temp_file_locking(self.config.disable_temp_file_locking());

        let mut references = service.include_assemblies();
        references.extend(self.config.reference_resolver().resolve(key));

        // Without a configured base type, compiled templates write
        // through the default base bound to the configured encoding.
        let base_template = match self.config.base_template_type() {
            Some(base) => base.clone(),
            None => {
                let encoding = Arc::clone(self.config.encoding());
                crate::config::BaseTemplateType::new(
                    "DefaultTemplateBase",
                    Arc::new(move || {
                        Box::new(crate::template::DefaultTemplateBase::new(Arc::clone(
                            &encoding,
                        ))) as Box<dyn crate::template::TemplateBase>
                    }),
                )
            }
        };

        let compile_context = CompileContext::new(key.clone(), source.clone())
            .with_base_template(Some(base_template))
            .with_namespaces(self.config.namespaces().clone())
            .with_references(references);

        tracing::debug!(key = %key, "compiling template");
        let artifact = service.compile_type(&compile_context)?;
        self.context.load(Arc::clone(artifact.unit()))?;

        let artifact = Arc::new(artifact);
        self.config
            .caching_provider()
            .set(key, Arc::clone(&artifact));
        Ok(artifact)
    }

    fn execute(
        &self,
        artifact: &CompilationArtifact,
        model: TemplateValue,
        view_bag: ViewBag,
    ) -> Result<String> {
        let instance_context = InstanceContext {
            loader: &self.loader,
            template_type: artifact.template_type(),
        };
        let mut instance: Box<dyn Template> =
            self.config.activator().create_instance(&instance_context)?;

        instance.set_data(model, view_bag.clone());
        let mut run_context = ExecuteContext::with_view_bag(view_bag);
        instance.run(&mut run_context)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(StencilError::Disposed {
                component: "TemplateService",
            });
        }
        Ok(())
    }
}

impl Drop for TemplateService {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Key for source run without a caller-supplied name, derived from the
/// source text so identical source shares one cache entry.
fn anonymous_key(source: &TemplateSource) -> TemplateKey {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source.source().hash(&mut hasher);
    TemplateKey::name_only(
        format!("anonymous-{:016x}", hasher.finish()),
        ResolveType::Global,
        None,
    )
}
