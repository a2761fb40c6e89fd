/*
 * service.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * The stencil compiler backend and its default factory.
 */

//! The default compiler backend.
//!
//! [`StencilCompilerService`] compiles generated statement-language source
//! into an executable [`Program`](crate::program::Program) wrapped in a
//! loadable [`TemplateUnit`]. Compilation is deterministic: the same
//! source and references always produce an equivalent artifact. Unless
//! temp-file locking is disabled, the source is emitted to a per-compile
//! temp directory for post-mortem inspection; the directory is owned by
//! the artifact's [`CompilationData`] and removed when the artifact is
//! dropped.

use std::fs;
use std::sync::Arc;

use stencil_core::compiler::{
    CompilationArtifact, CompilationData, CompileContext, CompilerService,
    CompilerServiceFactory, Diagnostic, Language,
};
use stencil_core::config::BaseTemplateType;
use stencil_core::encoding::HtmlTextEncoding;
use stencil_core::error::{Result, StencilError};
use stencil_core::template::{DefaultTemplateBase, TemplateBase};
use stencil_core::unit::{TemplateType, TemplateUnit};

use crate::ast::Stmt;
use crate::modules;
use crate::parser;
use crate::program::{Program, StencilInstanceFactory};

/// Compiler backend for [`Language::Stencil`].
#[derive(Debug, Default)]
pub struct StencilCompilerService {
    debug: bool,
    disable_temp_file_locking: bool,
}

impl StencilCompilerService {
    /// Create a backend with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the library imports of a parsed program: every called
    /// function must be exported by a support library.
    fn resolve_imports(statements: &[Stmt]) -> std::result::Result<Vec<String>, Vec<Diagnostic>> {
        let mut called = Vec::new();
        for stmt in statements {
            if let Stmt::Emit(expr) = stmt {
                expr.called_functions(&mut called);
            }
        }

        let mut imports: Vec<String> = Vec::new();
        let mut diagnostics = Vec::new();
        for name in called {
            match modules::exports_function(&name) {
                Some(library) => {
                    if !imports.iter().any(|i| i == library) {
                        imports.push(library.to_string());
                    }
                }
                None => diagnostics.push(Diagnostic::error(format!(
                    "unknown function `{name}`; no support library exports it"
                ))),
            }
        }

        if diagnostics.is_empty() {
            Ok(imports)
        } else {
            Err(diagnostics)
        }
    }

    fn emit_source(&self, source: &str) -> Result<Option<std::path::PathBuf>> {
        if self.disable_temp_file_locking {
            return Ok(None);
        }
        let dir = tempfile::Builder::new()
            .prefix("stencil-compile-")
            .tempdir()?;
        fs::write(dir.path().join("generated.stencil"), source)?;
        // Ownership of the directory moves to the CompilationData.
        Ok(Some(dir.keep()))
    }
}

/// Base used when a compile carries no base-template constraint:
/// buffered output with HTML encoding.
fn default_base() -> BaseTemplateType {
    BaseTemplateType::new(
        "HtmlTemplateBase",
        Arc::new(|| {
            Box::new(DefaultTemplateBase::new(Arc::new(HtmlTextEncoding))) as Box<dyn TemplateBase>
        }),
    )
}

impl CompilerService for StencilCompilerService {
    /// Compile generated statement-language source.
    ///
    /// The context's caller references and namespaces are accepted but
    /// not consulted: this backend interprets rather than links, so its
    /// imports are derived from the functions the source actually calls
    /// and nothing else influences resolution.
    fn compile_type(&self, context: &CompileContext) -> Result<CompilationArtifact> {
        let source = context.source().source();

        let statements = parser::parse(source)
            .map_err(|diagnostics| StencilError::CompilationFailed { diagnostics })?;
        let imports = Self::resolve_imports(&statements)
            .map_err(|diagnostics| StencilError::CompilationFailed { diagnostics })?;

        let tmp_folder = self.emit_source(source)?;

        let base_template = context
            .base_template()
            .cloned()
            .unwrap_or_else(default_base);

        let program = Arc::new(Program::new(statements));
        let factory = StencilInstanceFactory::new(Arc::clone(&program), base_template);

        let unit_name = format!("stencil.generated.{}", context.key().unique_key());
        let template_type = TemplateType::new(context.key().name(), unit_name.clone())
            .with_imports(imports)
            .with_factory(Arc::new(factory));
        let unit = Arc::new(TemplateUnit::new(unit_name).with_type(template_type.clone()));

        tracing::debug!(
            key = %context.key(),
            statements = program.statements().len(),
            debug = self.debug,
            "compiled template"
        );

        Ok(CompilationArtifact::new(
            unit,
            template_type,
            CompilationData::new(source, tmp_folder),
            Vec::new(),
            self.debug,
        ))
    }

    fn include_assemblies(&self) -> Vec<String> {
        vec![
            modules::TEXT_LIBRARY.to_string(),
            modules::SEQ_LIBRARY.to_string(),
        ]
    }

    fn support_libraries(&self) -> Vec<Arc<TemplateUnit>> {
        modules::support_libraries()
    }

    fn debug(&self) -> bool {
        self.debug
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn disable_temp_file_locking(&self) -> bool {
        self.disable_temp_file_locking
    }

    fn set_disable_temp_file_locking(&mut self, disable: bool) {
        self.disable_temp_file_locking = disable;
    }
}

/// Factory producing the shipped backends: [`Language::Stencil`] is
/// supported, [`Language::Script`] is declared but has no backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCompilerServiceFactory;

impl CompilerServiceFactory for DefaultCompilerServiceFactory {
    fn create_compiler_service(&self, language: Language) -> Result<Box<dyn CompilerService>> {
        match language {
            Language::Stencil => Ok(Box::new(StencilCompilerService::new())),
            Language::Script => Err(StencilError::UnsupportedLanguage { language }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use stencil_core::key::{ResolveType, TemplateKey};
    use stencil_core::template::{ExecuteContext, TemplateSource};
    use stencil_core::unit::ImportMap;
    use stencil_core::value::{TemplateValue, ViewBag};

    fn compile(source: &str) -> Result<CompilationArtifact> {
        let key = TemplateKey::name_only("page", ResolveType::Global, None);
        let context = CompileContext::new(key, TemplateSource::new(source));
        let mut service = StencilCompilerService::new();
        service.set_disable_temp_file_locking(true);
        service.compile_type(&context)
    }

    fn run(artifact: &CompilationArtifact, model: TemplateValue) -> String {
        let mut imports = ImportMap::new();
        for library in modules::support_libraries() {
            imports.insert(library.name().to_string(), library);
        }
        let factory = artifact.template_type().factory().unwrap();
        let mut instance = factory.instantiate(&imports).unwrap();
        instance.set_data(model, ViewBag::new());
        instance.run(&mut ExecuteContext::new()).unwrap()
    }

    #[test]
    fn test_compile_and_run_with_library_calls() {
        let artifact = compile("emit upper(model.name) + \"!\";").unwrap();
        assert_eq!(
            artifact.template_type().imports(),
            &[modules::TEXT_LIBRARY.to_string()]
        );

        let model = TemplateValue::from(serde_json::json!({ "name": "world" }));
        assert_eq!(run(&artifact, model), "WORLD!");
    }

    #[test]
    fn test_missing_base_defaults_to_html_encoding() {
        let artifact = compile("emit model.markup;").unwrap();
        let model = TemplateValue::from(serde_json::json!({ "markup": "<b>x</b>" }));
        assert_eq!(run(&artifact, model), "&lt;b&gt;x&lt;/b&gt;");
    }

    #[test]
    fn test_unit_is_named_after_the_key() {
        let artifact = compile("emit \"x\";").unwrap();
        assert_eq!(artifact.unit().name(), "stencil.generated.page");
        assert!(artifact.unit().type_named("page").is_some());
    }

    #[test]
    fn test_syntax_errors_collect_all_diagnostics() {
        let err = compile("emit ;\nemit +;\n").unwrap_err();
        let diagnostics = err.diagnostics();
        assert!(diagnostics.len() >= 2);
        assert!(diagnostics.iter().all(|d| d.line.is_some()));
    }

    #[test]
    fn test_unknown_function_fails_compilation() {
        let err = compile("emit shout(model.name);").unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        assert!(err.diagnostics()[0].message.contains("shout"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let first = compile("emit \"a\" + model.b;").unwrap();
        let second = compile("emit \"a\" + model.b;").unwrap();
        assert_eq!(first.unit().name(), second.unit().name());
        let model = TemplateValue::from(serde_json::json!({ "b": "c" }));
        assert_eq!(run(&first, model.clone()), run(&second, model));
    }

    #[test]
    fn test_temp_emission_is_cleaned_up_with_the_artifact() {
        let key = TemplateKey::name_only("page", ResolveType::Global, None);
        let context = CompileContext::new(key, TemplateSource::new("emit \"x\";"));
        let service = StencilCompilerService::new();

        let artifact = service.compile_type(&context).unwrap();
        let folder = artifact.data().tmp_folder().cloned().unwrap();
        assert!(folder.join("generated.stencil").exists());

        drop(artifact);
        assert!(!folder.exists());
    }

    #[test]
    fn test_factory_supports_stencil_only() {
        let factory = DefaultCompilerServiceFactory;
        assert!(factory.create_compiler_service(Language::Stencil).is_ok());
        assert!(matches!(
            factory.create_compiler_service(Language::Script),
            Err(StencilError::UnsupportedLanguage {
                language: Language::Script
            })
        ));
    }
}
