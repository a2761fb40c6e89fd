/*
 * unit.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Loadable units: compiled template types and support libraries.
 */

//! Units loadable into a load context.
//!
//! A [`TemplateUnit`] is a named bundle of compiled template types
//! and/or callable library functions.
//! A compiler backend produces one unit per successful compile (holding
//! one [`TemplateType`]); the backend's support libraries are plain
//! function-only units registered with the
//! [`TypeLoader`](crate::loader::TypeLoader) as its resolution-fallback
//! set.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::template::Template;
use crate::value::TemplateValue;

/// A callable library function usable from compiled templates.
pub type LibraryFn = Arc<dyn Fn(&[TemplateValue]) -> Result<TemplateValue> + Send + Sync>;

/// A named, loadable bundle of template types and library functions.
pub struct TemplateUnit {
    name: String,
    types: Vec<TemplateType>,
    functions: HashMap<String, LibraryFn>,
}

impl TemplateUnit {
    /// Create an empty unit.
    pub fn new(name: impl Into<String>) -> Self {
        TemplateUnit {
            name: name.into(),
            types: Vec::new(),
            functions: HashMap::new(),
        }
    }

    /// Add a compiled template type.
    pub fn with_type(mut self, ty: TemplateType) -> Self {
        self.types.push(ty);
        self
    }

    /// Add a library function.
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: LibraryFn,
    ) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// The unit name, used for resolution inside a load context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The types defined in this unit.
    pub fn types(&self) -> &[TemplateType] {
        &self.types
    }

    /// Look up a type by name.
    pub fn type_named(&self, name: &str) -> Option<&TemplateType> {
        self.types.iter().find(|t| t.name() == name)
    }

    /// Look up a library function by name.
    pub fn function(&self, name: &str) -> Option<&LibraryFn> {
        self.functions.get(name)
    }

    /// Names of the functions this unit exports.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for TemplateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateUnit")
            .field("name", &self.name)
            .field("types", &self.types)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a template instance once its imports have been resolved.
///
/// Implemented by the compiler backend; the factory must be pure so that
/// duplicate concurrent constructor builds stay interchangeable.
pub trait InstanceFactory: Send + Sync {
    /// Construct a fresh, not-yet-populated template instance.
    fn instantiate(&self, imports: &ImportMap) -> Result<Box<dyn Template>>;
}

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one compiled, constructible template type.
///
/// The id is unique per process and serves as the constructor-cache key.
#[derive(Clone)]
pub struct TemplateType {
    id: u64,
    name: String,
    unit_name: String,
    imports: Vec<String>,
    factory: Option<Arc<dyn InstanceFactory>>,
}

impl TemplateType {
    /// Create a type handle. A fresh id is allocated per call.
    pub fn new(name: impl Into<String>, unit_name: impl Into<String>) -> Self {
        TemplateType {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            unit_name: unit_name.into(),
            imports: Vec::new(),
            factory: None,
        }
    }

    /// Declare the units that must be resolvable when instantiating.
    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    /// Attach the parameterless constructor. Types without a factory
    /// cannot be instantiated.
    pub fn with_factory(mut self, factory: Arc<dyn InstanceFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Process-unique id of this type.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit this type is defined in.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Units required at instantiation time.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// The instance factory, if the type is constructible.
    pub fn factory(&self) -> Option<&Arc<dyn InstanceFactory>> {
        self.factory.as_ref()
    }
}

impl fmt::Debug for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("unit_name", &self.unit_name)
            .field("imports", &self.imports)
            .field("constructible", &self.factory.is_some())
            .finish()
    }
}

/// The resolved imports of a type, in declaration order.
///
/// Function lookup walks the units in order; the first unit exporting the
/// name wins.
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    units: Vec<(String, Arc<TemplateUnit>)>,
}

impl ImportMap {
    /// Create an empty import map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolved unit.
    pub fn insert(&mut self, name: impl Into<String>, unit: Arc<TemplateUnit>) {
        self.units.push((name.into(), unit));
    }

    /// Look up a resolved unit by name.
    pub fn unit(&self, name: &str) -> Option<&Arc<TemplateUnit>> {
        self.units
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, unit)| unit)
    }

    /// Look up a function across all resolved units, first match wins.
    pub fn function(&self, name: &str) -> Option<LibraryFn> {
        self.units
            .iter()
            .find_map(|(_, unit)| unit.function(name).cloned())
    }
}
