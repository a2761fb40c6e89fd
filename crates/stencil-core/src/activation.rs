/*
 * activation.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Instance activation seam.
//!
//! The activator decides how compiled types become instances. The default
//! goes straight through the [`TypeLoader`]; custom activators can wrap
//! that with dependency injection or pooling.

use crate::error::Result;
use crate::loader::TypeLoader;
use crate::template::Template;
use crate::unit::TemplateType;

/// Everything an activator needs to construct one instance.
pub struct InstanceContext<'a> {
    /// The loader bound to the isolation boundary.
    pub loader: &'a TypeLoader,
    /// The compiled type to instantiate.
    pub template_type: &'a TemplateType,
}

/// Creates template instances from compiled types.
pub trait Activator: Send + Sync {
    /// Construct an instance of the context's type.
    fn create_instance(&self, context: &InstanceContext<'_>) -> Result<Box<dyn Template>>;
}

/// Default activator: delegate to the type loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActivator;

impl Activator for DefaultActivator {
    fn create_instance(&self, context: &InstanceContext<'_>) -> Result<Box<dyn Template>> {
        context.loader.create_instance(context.template_type)
    }
}
