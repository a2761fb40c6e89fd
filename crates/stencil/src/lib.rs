/*
 * lib.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Batteries-included entry point for the stencil template engine.
//!
//! This crate wires the default collaborators (the stencil compiler
//! backend, in-memory caching and template management, HTML encoding)
//! into a ready-to-run [`TemplateService`], with a fluent
//! [`ConfigurationBuilder`] for the knobs worth turning.
//!
//! # Example
//!
//! ```ignore
//! use stencil::ConfigurationBuilder;
//! use stencil::core::{ResolveType, TemplateSource, TemplateValue, ViewBag};
//!
//! let service = ConfigurationBuilder::new().debug(true).build_service()?;
//! let key = service.get_key("hello", ResolveType::Global)?;
//! service.add_template(&key, TemplateSource::new("emit \"Hello, \" + model.name;"))?;
//!
//! let model = TemplateValue::from(serde_json::json!({ "name": "World" }));
//! println!("{}", service.run(&key, model, ViewBag::new())?);
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use stencil_compiler::DefaultCompilerServiceFactory;
use stencil_core::activation::{Activator, DefaultActivator};
use stencil_core::caching::{CachingProvider, InMemoryCachingProvider};
use stencil_core::compiler::{CompilerServiceFactory, DefaultReferenceResolver, Language, ReferenceResolver};
use stencil_core::config::{BaseTemplateType, TemplateServiceConfiguration};
use stencil_core::encoding::{HtmlTextEncoding, TextEncoding};
use stencil_core::error::Result;
use stencil_core::service::TemplateService;
use stencil_core::template::{InMemoryTemplateManager, TemplateManager};
#[allow(deprecated)]
use stencil_core::template::TemplateResolver;

/// Re-export of the core pipeline types.
pub use stencil_core as core;
/// Re-export of the default backend.
pub use stencil_compiler as compiler;

/// The default configuration: stencil backend, in-memory caching and
/// template management, HTML encoding.
pub fn default_configuration() -> TemplateServiceConfiguration {
    ConfigurationBuilder::new().build()
}

/// Fluent builder over [`TemplateServiceConfiguration`], pre-wired with
/// the default collaborators.
pub struct ConfigurationBuilder {
    config: TemplateServiceConfiguration,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// Start from the default collaborators.
    pub fn new() -> Self {
        let mut config = TemplateServiceConfiguration::new();
        config.activator = Some(Arc::new(DefaultActivator));
        config.caching_provider = Some(Arc::new(InMemoryCachingProvider::new()));
        config.compiler_service_factory = Some(Arc::new(DefaultCompilerServiceFactory));
        config.encoding = Some(Arc::new(HtmlTextEncoding));
        config.reference_resolver = Some(Arc::new(DefaultReferenceResolver));
        config.template_manager = Some(Arc::new(InMemoryTemplateManager::new()));
        ConfigurationBuilder { config }
    }

    /// The language compiled by default.
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    /// Embed debug information in compiled output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Keep compiled output in memory instead of emitting temp files.
    pub fn disable_temp_file_locking(mut self, disable: bool) -> Self {
        self.config.disable_temp_file_locking = disable;
        self
    }

    /// The base-template type compiled templates build on.
    pub fn base_template(mut self, base: BaseTemplateType) -> Self {
        self.config.base_template_type = Some(base);
        self
    }

    /// Open a namespace for every compile.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespaces.insert(namespace.into());
        self
    }

    /// Replace the namespace set.
    pub fn namespaces(mut self, namespaces: BTreeSet<String>) -> Self {
        self.config.namespaces = namespaces;
        self
    }

    /// The encoding dynamic values are written through.
    pub fn encoding(mut self, encoding: Arc<dyn TextEncoding>) -> Self {
        self.config.encoding = Some(encoding);
        self
    }

    /// Replace the template manager.
    pub fn template_manager(mut self, manager: Arc<dyn TemplateManager>) -> Self {
        self.config.template_manager = Some(manager);
        self.config.resolver = None;
        self
    }

    /// Use a legacy resolver instead of a template manager.
    #[allow(deprecated)]
    pub fn resolver(mut self, resolver: Arc<dyn TemplateResolver>) -> Self {
        self.config.resolver = Some(resolver);
        self.config.template_manager = None;
        self
    }

    /// Replace the caching provider.
    pub fn caching_provider(mut self, provider: Arc<dyn CachingProvider>) -> Self {
        self.config.caching_provider = Some(provider);
        self
    }

    /// Replace the compiler backend factory.
    pub fn compiler_service_factory(mut self, factory: Arc<dyn CompilerServiceFactory>) -> Self {
        self.config.compiler_service_factory = Some(factory);
        self
    }

    /// Replace the activator.
    pub fn activator(mut self, activator: Arc<dyn Activator>) -> Self {
        self.config.activator = Some(activator);
        self
    }

    /// Replace the reference resolver.
    pub fn reference_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.config.reference_resolver = Some(resolver);
        self
    }

    /// The built configuration.
    pub fn build(self) -> TemplateServiceConfiguration {
        self.config
    }

    /// Build and snapshot into a running service.
    pub fn build_service(self) -> Result<TemplateService> {
        TemplateService::new(&self.config)
    }
}
