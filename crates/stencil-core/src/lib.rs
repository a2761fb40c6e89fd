/*
 * lib.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Core compile / cache / instantiate pipeline for the stencil template
//! engine.
//!
//! This crate contains the backend-agnostic machinery: it treats a
//! template's generated source as an opaque string, compiles it through a
//! pluggable [`CompilerService`], caches the resulting
//! [`CompilationArtifact`] by [`TemplateKey`], and instantiates runnable
//! templates inside an isolation boundary. The concrete compiler backend
//! (the stencil statement language) lives in `stencil-compiler`; the
//! fluent configuration builder and CLI live in `stencil`.
//!
//! # Architecture
//!
//! The pipeline is organized around these key types:
//!
//! - [`TemplateService`] - One complete pipeline, built from a
//!   [`TemplateServiceConfiguration`]
//! - [`CompilerRegistry`] - Swap-under-lock selection of the active
//!   [`CompilerServiceFactory`]
//! - [`TypeLoader`] / [`LoadContext`] - Constructor-cached instantiation
//!   inside an independently disposable isolation boundary
//! - [`CachingProvider`] - Artifact storage between invocations
//!
//! # Example
//!
//! ```ignore
//! use stencil_core::{ResolveType, TemplateService, TemplateSource};
//! use stencil_core::value::{TemplateValue, ViewBag};
//!
//! let service = TemplateService::new(&configuration)?;
//! let key = service.get_key("hello", ResolveType::Global)?;
//! service.add_template(&key, TemplateSource::new("emit \"Hello, \" + model.name;"))?;
//!
//! let model = TemplateValue::from(serde_json::json!({ "name": "World" }));
//! let output = service.run(&key, model, ViewBag::new())?;
//! assert_eq!(output, "Hello, World");
//! ```

pub mod activation;
pub mod caching;
pub mod compiler;
pub mod config;
pub mod encoding;
pub mod error;
pub mod key;
pub mod loader;
pub mod registry;
pub mod service;
pub mod template;
pub mod unit;
pub mod value;

// Re-export commonly used types
pub use activation::{Activator, DefaultActivator, InstanceContext};
pub use caching::{CachingProvider, InMemoryCachingProvider};
pub use compiler::{
    CompilationArtifact, CompilationData, CompileContext, CompilerService,
    CompilerServiceFactory, DefaultReferenceResolver, Diagnostic, Language, ReferenceResolver,
    Severity,
};
pub use config::{BaseTemplateType, ConfigurationSnapshot, TemplateServiceConfiguration};
pub use encoding::{HtmlTextEncoding, RawTextEncoding, TextEncoding};
pub use error::{Result, StencilError};
pub use key::{ResolveType, TemplateKey};
pub use loader::{
    Constructor, FallbackId, IsolatedLoadContext, LoadContext, ResolveHook, TypeLoader,
};
pub use registry::CompilerRegistry;
pub use service::TemplateService;
pub use template::{
    DefaultTemplateBase, ExecuteContext, InMemoryTemplateManager, ResolverAdapter, Template,
    TemplateBase, TemplateBaseFactory, TemplateManager, TemplateSource,
};
#[allow(deprecated)]
pub use template::TemplateResolver;
pub use unit::{ImportMap, InstanceFactory, LibraryFn, TemplateType, TemplateUnit};
pub use value::{TemplateValue, ViewBag};
