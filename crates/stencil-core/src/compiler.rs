/*
 * compiler.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * The contract a compiler backend satisfies.
 */

//! Compiler backend contract.
//!
//! A [`CompilerService`] turns one template's generated source into a
//! [`CompilationArtifact`]: a constructible [`TemplateType`] plus the
//! compilation metadata kept for debugging. Backends are created per
//! compile by a [`CompilerServiceFactory`], selected by [`Language`]
//! through the [`CompilerRegistry`](crate::registry::CompilerRegistry).
//!
//! The core treats generated source as an opaque string; what produces it
//! (the markup-to-source generation layer) lives outside this crate.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::BaseTemplateType;
use crate::error::Result;
use crate::key::TemplateKey;
use crate::template::TemplateSource;
use crate::unit::{TemplateType, TemplateUnit};

/// The source language of generated template code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// The stencil statement language. The canonical default.
    Stencil,
    /// A scripted dialect. Declared for configuration compatibility; no
    /// shipped backend supports it.
    Script,
}

impl Default for Language {
    fn default() -> Self {
        Language::Stencil
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Stencil => write!(f, "stencil"),
            Language::Script => write!(f, "script"),
        }
    }
}

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One compiler message, ordered as emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Diagnostic {
    /// Create an error diagnostic without a location.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create an error diagnostic at a source location (1-based).
    pub fn error_at(message: impl Into<String>, line: usize, column: usize) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{tag}: {}", self.message)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {line}, column {column})")?;
        }
        Ok(())
    }
}

/// The compile request handed to a backend.
#[derive(Debug, Clone)]
pub struct CompileContext {
    key: TemplateKey,
    source: TemplateSource,
    base_template: Option<BaseTemplateType>,
    namespaces: BTreeSet<String>,
    references: Vec<String>,
}

impl CompileContext {
    /// Create a context for a key and its generated source.
    pub fn new(key: TemplateKey, source: TemplateSource) -> Self {
        CompileContext {
            key,
            source,
            base_template: None,
            namespaces: BTreeSet::new(),
            references: Vec::new(),
        }
    }

    /// Set the base-template type the compiled type must build on.
    pub fn with_base_template(mut self, base: Option<BaseTemplateType>) -> Self {
        self.base_template = base;
        self
    }

    /// Set the namespaces opened for the compile.
    pub fn with_namespaces(mut self, namespaces: BTreeSet<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set the caller-supplied library references.
    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    /// The template identity being compiled.
    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// The generated source.
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// The base-template type constraint, if configured.
    pub fn base_template(&self) -> Option<&BaseTemplateType> {
        self.base_template.as_ref()
    }

    /// Namespaces opened for the compile.
    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    /// Caller-supplied library references, in order.
    pub fn references(&self) -> &[String] {
        &self.references
    }
}

/// Auxiliary data kept from one compile: the generated source and the
/// temp directory it was emitted to (when temp emission is enabled).
///
/// The temp directory is owned by this value and removed on drop.
#[derive(Debug)]
pub struct CompilationData {
    source_code: String,
    tmp_folder: Option<PathBuf>,
}

impl CompilationData {
    /// Record compile metadata.
    pub fn new(source_code: impl Into<String>, tmp_folder: Option<PathBuf>) -> Self {
        CompilationData {
            source_code: source_code.into(),
            tmp_folder,
        }
    }

    /// The generated source as the backend saw it.
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    /// The temp-emit directory, while it exists.
    pub fn tmp_folder(&self) -> Option<&PathBuf> {
        self.tmp_folder.as_ref()
    }

    /// Remove the temp-emit directory. Safe to call repeatedly.
    pub fn delete_all(&mut self) {
        if let Some(folder) = self.tmp_folder.take() {
            if let Err(err) = fs::remove_dir_all(&folder) {
                tracing::debug!(folder = %folder.display(), %err, "failed to remove temp folder");
            }
        }
    }
}

impl Drop for CompilationData {
    fn drop(&mut self) {
        self.delete_all();
    }
}

/// The result of compiling one template: the unit produced by the
/// backend, the constructible type inside it, and compile metadata.
#[derive(Debug)]
pub struct CompilationArtifact {
    unit: Arc<TemplateUnit>,
    template_type: TemplateType,
    data: CompilationData,
    diagnostics: Vec<Diagnostic>,
    debug_symbols: bool,
}

impl CompilationArtifact {
    /// Create an artifact for a successfully compiled type.
    pub fn new(
        unit: Arc<TemplateUnit>,
        template_type: TemplateType,
        data: CompilationData,
        diagnostics: Vec<Diagnostic>,
        debug_symbols: bool,
    ) -> Self {
        CompilationArtifact {
            unit,
            template_type,
            data,
            diagnostics,
            debug_symbols,
        }
    }

    /// The unit to load into the isolation boundary.
    pub fn unit(&self) -> &Arc<TemplateUnit> {
        &self.unit
    }

    /// The compiled, constructible type.
    pub fn template_type(&self) -> &TemplateType {
        &self.template_type
    }

    /// Compilation metadata.
    pub fn data(&self) -> &CompilationData {
        &self.data
    }

    /// Non-fatal diagnostics emitted by a successful compile, in order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether debug information was embedded.
    pub fn debug_symbols(&self) -> bool {
        self.debug_symbols
    }
}

/// The contract a compiler backend implements.
///
/// A service owns whatever process-level or temp-file resources it
/// allocates while compiling and must release them when dropped,
/// regardless of compile outcome.
pub trait CompilerService: Send {
    /// Compile the type described by `context`.
    ///
    /// Deterministic for identical input: the same source and references
    /// produce a semantically equivalent artifact. Failure carries the
    /// full diagnostic list; no partially valid artifact is ever
    /// returned.
    fn compile_type(&self, context: &CompileContext) -> Result<CompilationArtifact>;

    /// Units the backend requires every compiled template to reference,
    /// merged with caller-supplied references.
    fn include_assemblies(&self) -> Vec<String>;

    /// The loadable units backing [`include_assemblies`], registered
    /// with the type loader as its resolution-fallback set.
    ///
    /// [`include_assemblies`]: Self::include_assemblies
    fn support_libraries(&self) -> Vec<Arc<TemplateUnit>> {
        Vec::new()
    }

    /// Whether debug symbols are embedded in compiled output.
    fn debug(&self) -> bool;

    /// Toggle debug-symbol embedding.
    fn set_debug(&mut self, debug: bool);

    /// Whether compiled output is kept purely in memory instead of being
    /// emitted through the temp directory.
    fn disable_temp_file_locking(&self) -> bool;

    /// Keep compiled output in memory. This trades the inspectable
    /// temp-file emission for freedom from file-lock contention; not a
    /// default.
    fn set_disable_temp_file_locking(&mut self, disable: bool);
}

impl fmt::Debug for dyn CompilerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<compiler service>")
    }
}

/// Process-wide swappable strategy mapping a language to a backend.
pub trait CompilerServiceFactory: Send + Sync {
    /// Create a compiler service for the language, or fail with
    /// [`StencilError::UnsupportedLanguage`](crate::error::StencilError::UnsupportedLanguage).
    fn create_compiler_service(&self, language: Language) -> Result<Box<dyn CompilerService>>;
}

/// Resolves the library references to make available to a compile.
pub trait ReferenceResolver: Send + Sync {
    /// References for the template being compiled, in order.
    fn resolve(&self, key: &TemplateKey) -> Vec<String>;
}

/// Default resolver: no references beyond what the backend includes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReferenceResolver;

impl ReferenceResolver for DefaultReferenceResolver {
    fn resolve(&self, _key: &TemplateKey) -> Vec<String> {
        Vec::new()
    }
}
