/*
 * config.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Mutable service configuration and its validated snapshot.
 */

//! Service configuration.
//!
//! [`TemplateServiceConfiguration`] is the mutable object callers (or the
//! fluent builder above this crate) populate. The pipeline never reads it
//! directly: at service construction it is copied into an immutable
//! [`ConfigurationSnapshot`], which validates every required collaborator
//! up front. Validation is atomic: the first missing collaborator fails
//! construction, so later pipeline stages can assume every field is
//! present instead of failing mid-compile.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::activation::Activator;
use crate::caching::CachingProvider;
use crate::compiler::{CompilerServiceFactory, Language, ReferenceResolver};
use crate::encoding::TextEncoding;
use crate::error::{Result, StencilError};
use crate::template::{ResolverAdapter, TemplateBase, TemplateBaseFactory, TemplateManager};
#[allow(deprecated)]
use crate::template::TemplateResolver;

/// Marker name of the template-base capability root.
const CAPABILITY_ROOT: &str = "TemplateBase";

/// A registrable base-template type.
///
/// Compiled templates drive their output through an instance of the
/// configured base type. A registrable base must be a concrete
/// implementation: the capability root itself and abstract bases carry no
/// constructor and are rejected at snapshot construction.
#[derive(Clone)]
pub struct BaseTemplateType {
    name: String,
    factory: Option<TemplateBaseFactory>,
    root: bool,
}

impl BaseTemplateType {
    /// A concrete, constructible base type.
    pub fn new(name: impl Into<String>, factory: TemplateBaseFactory) -> Self {
        BaseTemplateType {
            name: name.into(),
            factory: Some(factory),
            root: false,
        }
    }

    /// An abstract base: implements the capability set but cannot be
    /// constructed.
    pub fn abstract_base(name: impl Into<String>) -> Self {
        BaseTemplateType {
            name: name.into(),
            factory: None,
            root: false,
        }
    }

    /// The capability root itself (the abstraction, not an
    /// implementation).
    pub fn capability_root() -> Self {
        BaseTemplateType {
            name: CAPABILITY_ROOT.to_string(),
            factory: None,
            root: true,
        }
    }

    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a parameterless constructor exists.
    pub fn is_constructible(&self) -> bool {
        self.factory.is_some()
    }

    /// Whether this is the capability root rather than an implementation.
    pub fn is_capability_root(&self) -> bool {
        self.root
    }

    /// Construct a fresh base instance, when constructible.
    pub fn instantiate(&self) -> Option<Box<dyn TemplateBase>> {
        self.factory.as_ref().map(|f| f())
    }
}

impl fmt::Debug for BaseTemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseTemplateType")
            .field("name", &self.name)
            .field("constructible", &self.factory.is_some())
            .field("root", &self.root)
            .finish()
    }
}

/// Mutable configuration populated before service construction.
#[derive(Default)]
pub struct TemplateServiceConfiguration {
    pub activator: Option<Arc<dyn Activator>>,
    pub base_template_type: Option<BaseTemplateType>,
    pub caching_provider: Option<Arc<dyn CachingProvider>>,
    pub compiler_service_factory: Option<Arc<dyn CompilerServiceFactory>>,
    pub debug: bool,
    pub disable_temp_file_locking: bool,
    pub encoding: Option<Arc<dyn TextEncoding>>,
    pub language: Language,
    pub namespaces: BTreeSet<String>,
    pub reference_resolver: Option<Arc<dyn ReferenceResolver>>,
    pub template_manager: Option<Arc<dyn TemplateManager>>,
    #[allow(deprecated)]
    pub resolver: Option<Arc<dyn TemplateResolver>>,
}

impl TemplateServiceConfiguration {
    /// Create an empty configuration. Collaborators must be filled in
    /// before a snapshot can be taken.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Validated, immutable copy of a [`TemplateServiceConfiguration`].
///
/// Shared read-only by every pipeline invocation of the owning service.
pub struct ConfigurationSnapshot {
    activator: Arc<dyn Activator>,
    base_template_type: Option<BaseTemplateType>,
    caching_provider: Arc<dyn CachingProvider>,
    compiler_service_factory: Arc<dyn CompilerServiceFactory>,
    debug: bool,
    disable_temp_file_locking: bool,
    encoding: Arc<dyn TextEncoding>,
    language: Language,
    namespaces: BTreeSet<String>,
    reference_resolver: Arc<dyn ReferenceResolver>,
    template_manager: Arc<dyn TemplateManager>,
}

impl ConfigurationSnapshot {
    /// Validate and freeze a configuration.
    ///
    /// Exactly one of `template_manager` and the legacy `resolver` must
    /// be configured; a lone resolver is wrapped in a
    /// [`ResolverAdapter`]. Having both is ambiguous and rejected.
    pub fn new(config: &TemplateServiceConfiguration) -> Result<Self> {
        let activator = config
            .activator
            .clone()
            .ok_or_else(|| StencilError::configuration("the configured activator is missing"))?;

        let base_template_type = config.base_template_type.clone();
        if let Some(base) = &base_template_type {
            if base.is_capability_root() {
                return Err(StencilError::configuration(
                    "the configured base template type is the template-base \
                     abstraction itself; register an implementation",
                ));
            }
            if !base.is_constructible() {
                return Err(StencilError::configuration(format!(
                    "the configured base template type `{}` is not constructible",
                    base.name()
                )));
            }
        }

        let caching_provider = config.caching_provider.clone().ok_or_else(|| {
            StencilError::configuration("the configured caching provider is missing")
        })?;

        let compiler_service_factory = config.compiler_service_factory.clone().ok_or_else(|| {
            StencilError::configuration("the configured compiler service factory is missing")
        })?;

        let encoding = config.encoding.clone().ok_or_else(|| {
            StencilError::configuration("the configured text encoding is missing")
        })?;

        let reference_resolver = config.reference_resolver.clone().ok_or_else(|| {
            StencilError::configuration("the configured reference resolver is missing")
        })?;

        let template_manager: Arc<dyn TemplateManager> =
            match (&config.template_manager, &config.resolver) {
                (Some(manager), None) => Arc::clone(manager),
                (None, Some(resolver)) => Arc::new(ResolverAdapter::new(Arc::clone(resolver))),
                (Some(_), Some(_)) => {
                    return Err(StencilError::configuration(
                        "both a template manager and a legacy resolver are \
                         configured; configure exactly one",
                    ));
                }
                (None, None) => {
                    return Err(StencilError::configuration(
                        "a template manager (or legacy resolver) must be configured",
                    ));
                }
            };

        Ok(ConfigurationSnapshot {
            activator,
            base_template_type,
            caching_provider,
            compiler_service_factory,
            debug: config.debug,
            disable_temp_file_locking: config.disable_temp_file_locking,
            encoding,
            language: config.language,
            namespaces: config.namespaces.clone(),
            reference_resolver,
            template_manager,
        })
    }

    pub fn activator(&self) -> &Arc<dyn Activator> {
        &self.activator
    }

    pub fn base_template_type(&self) -> Option<&BaseTemplateType> {
        self.base_template_type.as_ref()
    }

    pub fn caching_provider(&self) -> &Arc<dyn CachingProvider> {
        &self.caching_provider
    }

    pub fn compiler_service_factory(&self) -> &Arc<dyn CompilerServiceFactory> {
        &self.compiler_service_factory
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn disable_temp_file_locking(&self) -> bool {
        self.disable_temp_file_locking
    }

    pub fn encoding(&self) -> &Arc<dyn TextEncoding> {
        &self.encoding
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    pub fn reference_resolver(&self) -> &Arc<dyn ReferenceResolver> {
        &self.reference_resolver
    }

    pub fn template_manager(&self) -> &Arc<dyn TemplateManager> {
        &self.template_manager
    }
}
