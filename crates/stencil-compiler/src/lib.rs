/*
 * lib.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Default compiler backend for the stencil template engine.
//!
//! This crate provides the [`CompilerService`] implementation behind
//! [`Language::Stencil`]: a hand-written parser for the generated
//! statement language, an interpreter-style executable program, and the
//! built-in support libraries (`stencil.text`, `stencil.seq`) compiled
//! templates call into.
//!
//! The statement language is deliberately tiny; it is the target the
//! out-of-scope markup layer generates, not a surface for humans:
//!
//! ```text
//! literal "<h1>";
//! emit upper(model.title);
//! literal "</h1>";
//! ```
//!
//! [`CompilerService`]: stencil_core::compiler::CompilerService
//! [`Language::Stencil`]: stencil_core::compiler::Language

pub mod ast;
pub mod modules;
pub mod parser;
pub mod program;
pub mod service;

pub use modules::{SEQ_LIBRARY, TEXT_LIBRARY, support_libraries};
pub use program::{CompiledTemplate, Program, StencilInstanceFactory};
pub use service::{DefaultCompilerServiceFactory, StencilCompilerService};
