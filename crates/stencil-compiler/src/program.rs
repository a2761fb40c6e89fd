/*
 * program.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Compiled program representation and the template instances that
 * execute it.
 */

//! Executable form of a compiled template.
//!
//! Parsing yields a [`Program`], an immutable statement list shared by
//! every instance of the compiled type. Instances are cheap: one
//! [`CompiledTemplate`] per run, holding the shared program, the imports
//! resolved for it at construction time and the caller's data. Library
//! function calls are the one late-bound seam: names are looked up in the
//! resolved imports at execution time, first exporting unit wins.

use std::sync::Arc;

use stencil_core::config::BaseTemplateType;
use stencil_core::error::{Result, StencilError};
use stencil_core::template::{ExecuteContext, Template, TemplateBase};
use stencil_core::unit::{ImportMap, InstanceFactory};
use stencil_core::value::{TemplateValue, ViewBag};

use crate::ast::{Expr, Stmt};

/// The immutable executable form of one compiled template.
#[derive(Debug)]
pub struct Program {
    statements: Vec<Stmt>,
}

impl Program {
    /// Wrap a parsed statement list.
    pub fn new(statements: Vec<Stmt>) -> Self {
        Program { statements }
    }

    /// The statements, in execution order.
    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }
}

/// A runnable instance of a compiled template.
pub struct CompiledTemplate {
    program: Arc<Program>,
    base_template: BaseTemplateType,
    imports: ImportMap,
    model: TemplateValue,
    view_bag: ViewBag,
}

impl CompiledTemplate {
    fn new_base(&self) -> Result<Box<dyn TemplateBase>> {
        self.base_template.instantiate().ok_or_else(|| {
            StencilError::execution(format!(
                "base template `{}` is not constructible",
                self.base_template.name()
            ))
        })
    }

    fn eval(&self, expr: &Expr, context: &ExecuteContext) -> Result<TemplateValue> {
        match expr {
            Expr::String(text) => Ok(TemplateValue::String(text.clone())),
            Expr::Number(n) => Ok(TemplateValue::Number(*n)),
            Expr::ModelPath(path) => {
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                Ok(self.model.get_path(&segments).cloned().unwrap_or_default())
            }
            Expr::ViewBagPath(path) => {
                let (first, rest) = match path.split_first() {
                    Some(split) => split,
                    None => return Ok(TemplateValue::Null),
                };
                // The instance bag shadows the per-run context bag.
                let root = self
                    .view_bag
                    .get(first)
                    .or_else(|| context.view_bag().get(first));
                let segments: Vec<&str> = rest.iter().map(String::as_str).collect();
                Ok(root
                    .and_then(|v| v.get_path(&segments))
                    .cloned()
                    .unwrap_or_default())
            }
            Expr::Concat(left, right) => {
                let left = self.eval(left, context)?;
                let right = self.eval(right, context)?;
                Ok(TemplateValue::String(format!(
                    "{}{}",
                    left.render(),
                    right.render()
                )))
            }
            Expr::Call { name, args } => {
                let function = self.imports.function(name).ok_or_else(|| {
                    StencilError::execution(format!("unknown function `{name}`"))
                })?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, context)?);
                }
                function(&values)
            }
        }
    }
}

impl Template for CompiledTemplate {
    fn set_data(&mut self, model: TemplateValue, view_bag: ViewBag) {
        self.model = model;
        self.view_bag = view_bag;
    }

    fn run(&mut self, context: &mut ExecuteContext) -> Result<String> {
        let mut base = self.new_base()?;
        for stmt in self.program.statements() {
            match stmt {
                Stmt::Literal(text) => base.write_literal(text),
                Stmt::Emit(expr) => {
                    let value = self.eval(expr, context)?;
                    base.write(&value);
                }
            }
        }
        Ok(base.result())
    }
}

/// Factory for [`CompiledTemplate`] instances, attached to the compiled
/// [`TemplateType`](stencil_core::unit::TemplateType).
///
/// The base-template type is required: every instance writes through a
/// base, so the encoding decision is made where the factory is built,
/// never defaulted per run.
pub struct StencilInstanceFactory {
    program: Arc<Program>,
    base_template: BaseTemplateType,
}

impl StencilInstanceFactory {
    /// Bind a factory to a program and the base-template type its
    /// instances write through.
    pub fn new(program: Arc<Program>, base_template: BaseTemplateType) -> Self {
        StencilInstanceFactory {
            program,
            base_template,
        }
    }
}

impl InstanceFactory for StencilInstanceFactory {
    fn instantiate(&self, imports: &ImportMap) -> Result<Box<dyn Template>> {
        Ok(Box::new(CompiledTemplate {
            program: Arc::clone(&self.program),
            base_template: self.base_template.clone(),
            imports: imports.clone(),
            model: TemplateValue::Null,
            view_bag: ViewBag::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use stencil_core::encoding::{HtmlTextEncoding, RawTextEncoding, TextEncoding};
    use stencil_core::template::DefaultTemplateBase;

    use crate::parser::parse;

    fn base_over(encoding: Arc<dyn TextEncoding>) -> BaseTemplateType {
        BaseTemplateType::new(
            "TestBase",
            Arc::new(move || {
                Box::new(DefaultTemplateBase::new(Arc::clone(&encoding))) as Box<dyn TemplateBase>
            }),
        )
    }

    fn instance(source: &str, imports: ImportMap) -> Box<dyn Template> {
        let program = Arc::new(Program::new(parse(source).unwrap()));
        StencilInstanceFactory::new(program, base_over(Arc::new(HtmlTextEncoding)))
            .instantiate(&imports)
            .unwrap()
    }

    #[test]
    fn test_emit_encodes_but_literal_does_not() {
        let mut template = instance("literal \"<p>\"; emit model.text; literal \"</p>\";", ImportMap::new());
        let model = TemplateValue::from(serde_json::json!({ "text": "a < b" }));
        template.set_data(model, ViewBag::new());
        let output = template.run(&mut ExecuteContext::new()).unwrap();
        assert_eq!(output, "<p>a &lt; b</p>");
    }

    #[test]
    fn test_base_template_encoding_is_respected() {
        let program = Arc::new(Program::new(parse("emit model.text;").unwrap()));
        let factory = StencilInstanceFactory::new(program, base_over(Arc::new(RawTextEncoding)));

        let mut template = factory.instantiate(&ImportMap::new()).unwrap();
        template.set_data(
            TemplateValue::from(serde_json::json!({ "text": "a < b" })),
            ViewBag::new(),
        );
        assert_eq!(template.run(&mut ExecuteContext::new()).unwrap(), "a < b");
    }

    #[test]
    fn test_non_constructible_base_fails_at_run() {
        let program = Arc::new(Program::new(parse("emit \"x\";").unwrap()));
        let factory = StencilInstanceFactory::new(
            program,
            BaseTemplateType::abstract_base("AbstractBase"),
        );

        let mut template = factory.instantiate(&ImportMap::new()).unwrap();
        match template.run(&mut ExecuteContext::new()).unwrap_err() {
            StencilError::Execution { message } => assert!(message.contains("AbstractBase")),
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_model_field_renders_empty() {
        let mut template = instance("emit \"[\" + model.missing + \"]\";", ImportMap::new());
        template.set_data(TemplateValue::Null, ViewBag::new());
        assert_eq!(template.run(&mut ExecuteContext::new()).unwrap(), "[]");
    }

    #[test]
    fn test_view_bag_shadows_context_bag() {
        let mut template = instance("emit viewbag.title;", ImportMap::new());

        let mut instance_bag = ViewBag::new();
        instance_bag.set("title", TemplateValue::from("instance"));
        template.set_data(TemplateValue::Null, instance_bag);

        let mut context_bag = ViewBag::new();
        context_bag.set("title", TemplateValue::from("context"));
        let mut context = ExecuteContext::with_view_bag(context_bag);

        assert_eq!(template.run(&mut context).unwrap(), "instance");
    }

    #[test]
    fn test_unknown_function_is_an_execution_error() {
        let mut template = instance("emit shout(model.name);", ImportMap::new());
        template.set_data(TemplateValue::Null, ViewBag::new());
        match template.run(&mut ExecuteContext::new()).unwrap_err() {
            StencilError::Execution { message } => assert!(message.contains("shout")),
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let program = Arc::new(Program::new(parse("emit model.name;").unwrap()));
        let factory = StencilInstanceFactory::new(program, base_over(Arc::new(HtmlTextEncoding)));

        let mut first = factory.instantiate(&ImportMap::new()).unwrap();
        let mut second = factory.instantiate(&ImportMap::new()).unwrap();
        first.set_data(TemplateValue::from(serde_json::json!({ "name": "a" })), ViewBag::new());
        second.set_data(TemplateValue::from(serde_json::json!({ "name": "b" })), ViewBag::new());

        assert_eq!(first.run(&mut ExecuteContext::new()).unwrap(), "a");
        assert_eq!(second.run(&mut ExecuteContext::new()).unwrap(), "b");
    }
}
