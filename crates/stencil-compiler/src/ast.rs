/*
 * ast.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Syntax tree for the generated-source statement language.

/// An expression producing a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string literal.
    String(String),
    /// A numeric literal.
    Number(f64),
    /// A path rooted at the model: `model.employee.name`.
    ModelPath(Vec<String>),
    /// A path rooted at the view bag: `viewbag.title`.
    ViewBagPath(Vec<String>),
    /// String concatenation: `a + b`.
    Concat(Box<Expr>, Box<Expr>),
    /// A library function call: `upper(model.name)`.
    Call { name: String, args: Vec<Expr> },
}

/// One statement of a template program.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `emit <expr>;` writes the value through the encoding base.
    Emit(Expr),
    /// `literal <string>;` writes template markup verbatim.
    Literal(String),
}

impl Expr {
    /// Collect every function name called anywhere in this expression.
    pub fn called_functions(&self, out: &mut Vec<String>) {
        match self {
            Expr::String(_) | Expr::Number(_) | Expr::ModelPath(_) | Expr::ViewBagPath(_) => {}
            Expr::Concat(left, right) => {
                left.called_functions(out);
                right.called_functions(out);
            }
            Expr::Call { name, args } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
                for arg in args {
                    arg.called_functions(out);
                }
            }
        }
    }
}
