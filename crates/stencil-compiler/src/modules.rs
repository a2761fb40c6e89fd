/*
 * modules.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Built-in support libraries available to every compiled template.
 */

//! Support libraries.
//!
//! Two function-only units ship with the backend: `stencil.text` for
//! string manipulation and `stencil.seq` for list operations. They are
//! registered with the type loader as its resolution-fallback set, so a
//! compiled template's imports resolve even though the units are never
//! explicitly loaded into the context.

use std::sync::Arc;

use once_cell::sync::Lazy;
use stencil_core::error::{Result, StencilError};
use stencil_core::unit::{LibraryFn, TemplateUnit};
use stencil_core::value::TemplateValue;

/// Name of the string-manipulation library.
pub const TEXT_LIBRARY: &str = "stencil.text";

/// Name of the list-operation library.
pub const SEQ_LIBRARY: &str = "stencil.seq";

static LIBRARIES: Lazy<Vec<Arc<TemplateUnit>>> =
    Lazy::new(|| vec![Arc::new(text_library()), Arc::new(seq_library())]);

/// The support libraries, in resolution order.
pub fn support_libraries() -> Vec<Arc<TemplateUnit>> {
    LIBRARIES.clone()
}

/// Whether any support library exports `name`.
pub fn exports_function(name: &str) -> Option<&'static str> {
    for unit in LIBRARIES.iter() {
        if unit.function(name).is_some() {
            return Some(if unit.name() == TEXT_LIBRARY {
                TEXT_LIBRARY
            } else {
                SEQ_LIBRARY
            });
        }
    }
    None
}

fn arg<'a>(args: &'a [TemplateValue], index: usize, function: &str) -> Result<&'a TemplateValue> {
    args.get(index).ok_or_else(|| {
        StencilError::execution(format!(
            "`{function}` expects at least {} argument(s), got {}",
            index + 1,
            args.len()
        ))
    })
}

fn list_arg<'a>(
    args: &'a [TemplateValue],
    index: usize,
    function: &str,
) -> Result<&'a [TemplateValue]> {
    match arg(args, index, function)? {
        TemplateValue::List(items) => Ok(items),
        other => Err(StencilError::execution(format!(
            "`{function}` expects a list, got {other:?}"
        ))),
    }
}

fn text_library() -> TemplateUnit {
    TemplateUnit::new(TEXT_LIBRARY)
        .with_function("upper", Arc::new(|args: &[TemplateValue]| {
            Ok(TemplateValue::String(arg(args, 0, "upper")?.render().to_uppercase()))
        }) as LibraryFn)
        .with_function("lower", Arc::new(|args: &[TemplateValue]| {
            Ok(TemplateValue::String(arg(args, 0, "lower")?.render().to_lowercase()))
        }) as LibraryFn)
        .with_function("trim", Arc::new(|args: &[TemplateValue]| {
            Ok(TemplateValue::String(arg(args, 0, "trim")?.render().trim().to_string()))
        }) as LibraryFn)
        .with_function("replace", Arc::new(|args: &[TemplateValue]| {
            let haystack = arg(args, 0, "replace")?.render();
            let from = arg(args, 1, "replace")?.render();
            let to = arg(args, 2, "replace")?.render();
            Ok(TemplateValue::String(haystack.replace(&from, &to)))
        }) as LibraryFn)
        .with_function("length", Arc::new(|args: &[TemplateValue]| {
            let text = arg(args, 0, "length")?.render();
            Ok(TemplateValue::Number(text.chars().count() as f64))
        }) as LibraryFn)
}

fn seq_library() -> TemplateUnit {
    TemplateUnit::new(SEQ_LIBRARY)
        .with_function("join", Arc::new(|args: &[TemplateValue]| {
            let items = list_arg(args, 0, "join")?;
            let separator = args.get(1).map(|v| v.render()).unwrap_or_default();
            let joined = items
                .iter()
                .map(|v| v.render())
                .collect::<Vec<_>>()
                .join(&separator);
            Ok(TemplateValue::String(joined))
        }) as LibraryFn)
        .with_function("first", Arc::new(|args: &[TemplateValue]| {
            let items = list_arg(args, 0, "first")?;
            Ok(items.first().cloned().unwrap_or_default())
        }) as LibraryFn)
        .with_function("count", Arc::new(|args: &[TemplateValue]| {
            let items = list_arg(args, 0, "count")?;
            Ok(TemplateValue::Number(items.len() as f64))
        }) as LibraryFn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(unit: &TemplateUnit, name: &str, args: &[TemplateValue]) -> TemplateValue {
        unit.function(name).unwrap()(args).unwrap()
    }

    #[test]
    fn test_text_functions() {
        let text = text_library();
        assert_eq!(
            call(&text, "upper", &[TemplateValue::from("abc")]),
            TemplateValue::from("ABC")
        );
        assert_eq!(
            call(&text, "trim", &[TemplateValue::from("  x  ")]),
            TemplateValue::from("x")
        );
        assert_eq!(
            call(
                &text,
                "replace",
                &[
                    TemplateValue::from("a-b"),
                    TemplateValue::from("-"),
                    TemplateValue::from("+")
                ]
            ),
            TemplateValue::from("a+b")
        );
        assert_eq!(
            call(&text, "length", &[TemplateValue::from("héllo")]),
            TemplateValue::Number(5.0)
        );
    }

    #[test]
    fn test_seq_functions() {
        let seq = seq_library();
        let list = TemplateValue::List(vec![
            TemplateValue::from("a"),
            TemplateValue::from("b"),
        ]);
        assert_eq!(
            call(&seq, "join", &[list.clone(), TemplateValue::from(", ")]),
            TemplateValue::from("a, b")
        );
        assert_eq!(call(&seq, "first", &[list.clone()]), TemplateValue::from("a"));
        assert_eq!(call(&seq, "count", &[list]), TemplateValue::Number(2.0));
    }

    #[test]
    fn test_wrong_arity_and_type_fail() {
        let text = text_library();
        assert!(text.function("upper").unwrap()(&[]).is_err());

        let seq = seq_library();
        assert!(seq.function("count").unwrap()(&[TemplateValue::from("not a list")]).is_err());
    }

    #[test]
    fn test_exports_function() {
        assert_eq!(exports_function("upper"), Some(TEXT_LIBRARY));
        assert_eq!(exports_function("join"), Some(SEQ_LIBRARY));
        assert_eq!(exports_function("shout"), None);
    }
}
